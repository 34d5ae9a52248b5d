//! Transform parameters for image derivatives.
//!
//! Each member of [`TransformSpec`] carries its structured options and renders a short
//! canonical token (`Display`). Tokens are what cache keys are built from, so they are a
//! pure function of the options: structurally equal specs always render the same token.
//! Tokens also parse back (`FromStr`), accepting `/` in place of `:` as the separator.

use crate::constants::MAX_THUMBNAIL_DIMENSION;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecParseError {
    #[error("Invalid thumbnail spec '{0}': expected WIDTH:HEIGHT[:FIT]")]
    Thumbnail(String),

    #[error("Invalid dimension '{0}': expected 1-{max}", max = MAX_THUMBNAIL_DIMENSION)]
    Dimension(String),

    #[error("Invalid fit policy: {0}")]
    FitPolicy(String),

    #[error("Invalid recompress spec '{0}': expected QUALITY[:FORMAT]")]
    Recompress(String),

    #[error("Invalid quality '{0}': expected 1-100")]
    Quality(String),

    #[error("Invalid jpeg format: {0}")]
    JpegFormat(String),
}

/// Resize strategy applied when target and source aspect ratios differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Scale to cover both dimensions, then crop the overflow (centered).
    #[default]
    Cover,
    /// Scale to fit within both dimensions and letterbox the remainder.
    Contain,
    /// Stretch to exactly the target dimensions, ignoring aspect ratio.
    Fill,
    /// Scale to fit within both dimensions; output may be smaller than the target.
    Inside,
    /// Scale to cover both dimensions without cropping; output may be larger.
    Outside,
}

impl FromStr for FitPolicy {
    type Err = SpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cover" => Ok(FitPolicy::Cover),
            "contain" => Ok(FitPolicy::Contain),
            "fill" => Ok(FitPolicy::Fill),
            "inside" => Ok(FitPolicy::Inside),
            "outside" => Ok(FitPolicy::Outside),
            other => Err(SpecParseError::FitPolicy(other.to_string())),
        }
    }
}

impl Display for FitPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FitPolicy::Cover => write!(f, "cover"),
            FitPolicy::Contain => write!(f, "contain"),
            FitPolicy::Fill => write!(f, "fill"),
            FitPolicy::Inside => write!(f, "inside"),
            FitPolicy::Outside => write!(f, "outside"),
        }
    }
}

/// Thumbnail request: target box plus fit policy.
///
/// Token: `{width}:{height}`, with `:{fit}` appended when the fit is not `cover`.
/// Parsing, `new` and deserialization keep both dimensions within `1..=MAX_THUMBNAIL_DIMENSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawThumbnailSpec")]
pub struct ThumbnailSpec {
    pub width: u32,
    pub height: u32,
    pub fit: FitPolicy,
}

#[derive(Deserialize)]
struct RawThumbnailSpec {
    width: u32,
    height: u32,
    #[serde(default)]
    fit: FitPolicy,
}

impl TryFrom<RawThumbnailSpec> for ThumbnailSpec {
    type Error = SpecParseError;

    fn try_from(raw: RawThumbnailSpec) -> Result<Self, Self::Error> {
        ThumbnailSpec::new(raw.width, raw.height, raw.fit)
    }
}

impl ThumbnailSpec {
    pub fn new(width: u32, height: u32, fit: FitPolicy) -> Result<Self, SpecParseError> {
        let spec = Self { width, height, fit };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the bounds again, for values assembled field by field.
    pub fn validate(&self) -> Result<(), SpecParseError> {
        check_dimension(self.width)?;
        check_dimension(self.height)
    }

    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl Display for ThumbnailSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.width, self.height)?;
        if self.fit != FitPolicy::Cover {
            write!(f, ":{}", self.fit)?;
        }
        Ok(())
    }
}

impl FromStr for ThumbnailSpec {
    type Err = SpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([':', '/']).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(SpecParseError::Thumbnail(s.to_string()));
        }

        let width = parse_dimension(parts[0])?;
        let height = parse_dimension(parts[1])?;
        let fit = match parts.get(2) {
            Some(fit) => fit.parse()?,
            None => FitPolicy::default(),
        };

        ThumbnailSpec::new(width, height, fit)
    }
}

fn parse_dimension(s: &str) -> Result<u32, SpecParseError> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| SpecParseError::Dimension(s.to_string()))
}

fn check_dimension(value: u32) -> Result<(), SpecParseError> {
    if value == 0 || value > MAX_THUMBNAIL_DIMENSION {
        return Err(SpecParseError::Dimension(value.to_string()));
    }
    Ok(())
}

/// JPEG encoding variant used when recompressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JpegFormat {
    #[default]
    Baseline,
    Progressive,
}

impl FromStr for JpegFormat {
    type Err = SpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Ok(JpegFormat::Baseline),
            "progressive" => Ok(JpegFormat::Progressive),
            other => Err(SpecParseError::JpegFormat(other.to_string())),
        }
    }
}

impl Display for JpegFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JpegFormat::Baseline => write!(f, "baseline"),
            JpegFormat::Progressive => write!(f, "progressive"),
        }
    }
}

/// Recompression request. Only applied to JPEG-family sources; the derivative keeps
/// the source extension, so `format` selects the JPEG encoding variant.
///
/// Token: `{quality}:{format}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRecompressSpec")]
pub struct RecompressSpec {
    pub quality: u8,
    pub format: JpegFormat,
}

#[derive(Deserialize)]
struct RawRecompressSpec {
    quality: u8,
    #[serde(default)]
    format: JpegFormat,
}

impl TryFrom<RawRecompressSpec> for RecompressSpec {
    type Error = SpecParseError;

    fn try_from(raw: RawRecompressSpec) -> Result<Self, Self::Error> {
        RecompressSpec::new(raw.quality, raw.format)
    }
}

impl RecompressSpec {
    pub fn new(quality: u8, format: JpegFormat) -> Result<Self, SpecParseError> {
        let spec = Self { quality, format };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), SpecParseError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(SpecParseError::Quality(self.quality.to_string()));
        }
        Ok(())
    }

    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl Display for RecompressSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.quality, self.format)
    }
}

impl FromStr for RecompressSpec {
    type Err = SpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([':', '/']).collect();
        if parts.is_empty() || parts.len() > 2 {
            return Err(SpecParseError::Recompress(s.to_string()));
        }

        let quality = parts[0]
            .trim()
            .parse::<u8>()
            .map_err(|_| SpecParseError::Quality(parts[0].to_string()))?;
        let format = match parts.get(1) {
            Some(format) => format.parse()?,
            None => JpegFormat::default(),
        };

        RecompressSpec::new(quality, format)
    }
}

/// Optional transforms requested on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ThumbnailSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recompress: Option<RecompressSpec>,
}

impl TransformSpec {
    pub fn thumbnail(thumbnail: ThumbnailSpec) -> Self {
        Self {
            thumbnail: Some(thumbnail),
            recompress: None,
        }
    }

    pub fn with_recompress(mut self, recompress: RecompressSpec) -> Self {
        self.recompress = Some(recompress);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.thumbnail.is_none() && self.recompress.is_none()
    }

    pub fn validate(&self) -> Result<(), SpecParseError> {
        if let Some(thumbnail) = &self.thumbnail {
            thumbnail.validate()?;
        }
        if let Some(recompress) = &self.recompress {
            recompress.validate()?;
        }
        Ok(())
    }
}
