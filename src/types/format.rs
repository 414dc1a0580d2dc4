//! Output-format descriptors for media requests.

use std::fmt;
use std::str::FromStr;

use crate::error::ShowreelError;

/// Aspect ratio for generated images.
///
/// The variants are the ratios the remote service accepts; [`as_str()`](Self::as_str)
/// yields the wire form (`"16:9"` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    /// 1:1
    Square,
    /// 3:4
    Portrait,
    /// 4:3
    Landscape,
    /// 16:9 — the default for cinematic stills.
    #[default]
    Widescreen,
    /// 9:16
    Vertical,
}

impl AspectRatio {
    /// The wire form sent to the remote service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Landscape => "4:3",
            Self::Widescreen => "16:9",
            Self::Vertical => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ShowreelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1:1" => Ok(Self::Square),
            "3:4" => Ok(Self::Portrait),
            "4:3" => Ok(Self::Landscape),
            "16:9" => Ok(Self::Widescreen),
            "9:16" => Ok(Self::Vertical),
            other => Err(ShowreelError::Configuration(format!(
                "unknown aspect ratio: {other}"
            ))),
        }
    }
}

/// Requested output format — the second half of a cache key.
///
/// Audio has no aspect-ratio dimension; two voiceover requests for the
/// same text always collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Image(AspectRatio),
    Audio,
}

impl OutputFormat {
    /// Stable descriptor folded into the cache digest.
    pub fn descriptor(&self) -> &'static str {
        match self {
            Self::Image(ratio) => ratio.as_str(),
            Self::Audio => "audio",
        }
    }
}
