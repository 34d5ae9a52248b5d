//! Stowage CLI: save and resolve files through the configured storage engine.
//!
//! Configuration comes from the environment (`STORAGE`, `STORAGE_PATH`, ...), or from
//! `{NAMESPACE}_`-prefixed keys when `--namespace` is given.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use stowage_cli::{init_tracing, stage_upload, OutputSink};
use stowage_core::{RecompressSpec, SaveOptions, StorageConfig, ThumbnailSpec, TransformSpec};
use stowage_storage::{create_engine, BucketManager, ResolveRequest, StorageEngine};

#[derive(Parser)]
#[command(name = "stowage", about = "Multi-backend file storage")]
struct Cli {
    /// Read `{NAMESPACE}_*` configuration keys (e.g. IMAGE)
    #[arg(long, global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file through the configured engine
    Save {
        /// File to store (copied, the source is left in place)
        file: PathBuf,
        #[arg(long)]
        bucket: Option<String>,
        /// Defaults to the current year/month partition
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        region: Option<String>,
        /// Defaults to a guess from the file extension
        #[arg(long)]
        mimetype: Option<String>,
        /// Stored filename, defaults to the source file name
        #[arg(long)]
        filename: Option<String>,
    },
    /// Resolve a stored file or one of its derivatives
    Resolve {
        filename: String,
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        prefix: String,
        /// Thumbnail token, e.g. 100:100 or 100:100:contain
        #[arg(long)]
        thumbnail: Option<ThumbnailSpec>,
        /// Recompress token, e.g. 80:progressive
        #[arg(long)]
        recompress: Option<RecompressSpec>,
        /// Copy the resolved content here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Local bucket operations
    Buckets {
        #[command(subcommand)]
        sub: BucketCommands,
    },
}

#[derive(Subcommand)]
enum BucketCommands {
    /// List buckets
    List,
    /// Create a bucket
    Create { name: String },
    /// Delete an empty bucket
    Delete { name: String },
    /// List files stored in a bucket
    Entities { name: String },
    /// Store a file in a bucket
    Save {
        name: String,
        file: PathBuf,
        #[arg(long)]
        mimetype: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match cli.namespace.as_deref() {
        Some(namespace) => StorageConfig::from_env_namespaced(namespace),
        None => StorageConfig::from_env(),
    }
    .context("Invalid storage configuration")?;
    tracing::debug!(mode = %config.mode, "Storage configuration loaded");

    match cli.command {
        Commands::Save {
            file,
            bucket,
            prefix,
            region,
            mimetype,
            filename,
        } => {
            let engine = create_engine(&config).await?;
            let staged = stage_upload(&file, filename, mimetype).await?;
            let opts = SaveOptions {
                bucket,
                prefix,
                region,
            };
            print_json(&engine.save_entity(&staged.upload, &opts).await?)?;
        }
        Commands::Resolve {
            filename,
            bucket,
            prefix,
            thumbnail,
            recompress,
            out,
        } => {
            let engine = create_engine(&config).await?;
            let transform = TransformSpec {
                thumbnail,
                recompress,
            };
            let mut request = ResolveRequest::new(bucket, prefix, filename);
            if !transform.is_empty() {
                request = request.with_transform(transform);
            }

            let mut sink = OutputSink::new(out);
            engine.resolve_into(&request, &mut sink).await?;
            if let Some(outcome) = sink.outcome() {
                print_json(outcome)?;
            }
        }
        Commands::Buckets { sub } => {
            let manager = BucketManager::new(&config.local.storage_path).await?;
            match sub {
                BucketCommands::List => print_json(&manager.list().await?)?,
                BucketCommands::Create { name } => {
                    manager.create(&name).await?;
                    print_json(&serde_json::json!({ "created": name }))?;
                }
                BucketCommands::Delete { name } => {
                    manager.delete(&name).await?;
                    print_json(&serde_json::json!({ "deleted": name }))?;
                }
                BucketCommands::Entities { name } => {
                    print_json(&manager.list_entities(&name).await?)?
                }
                BucketCommands::Save {
                    name,
                    file,
                    mimetype,
                } => {
                    let staged = stage_upload(&file, None, mimetype).await?;
                    print_json(&manager.save(&name, &staged.upload).await?)?;
                }
            }
        }
    }

    Ok(())
}
