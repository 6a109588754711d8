//! Error type for the failures the pipeline cannot recover from.
//!
//! Numeric degeneracy (too few points, singular fits, collinear bases) is not
//! an error: those paths return `None` or an invalid model instead.

/// Errors surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SectorError {
    /// Pixel data length does not match `width * height * channels`.
    InvalidBuffer {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Declared channel count.
        channels: usize,
        /// Actual data length in bytes.
        len: usize,
    },
    /// Only 3 (RGB) and 4 (RGBA) channel buffers are supported.
    UnsupportedChannels(usize),
    /// A grid basis referenced an id that is not in the ellipse set.
    UnknownEllipseId(u32),
    /// A grid basis used the same id twice.
    DuplicateEllipseId(u32),
    /// The calibration model cannot drive a remap.
    InvalidModel {
        /// Human-readable reason.
        reason: String,
    },
    /// The sector canvas would exceed the configured pixel budget.
    CanvasTooLarge {
        /// Requested canvas width.
        width: u64,
        /// Requested canvas height.
        height: u64,
        /// Configured maximum pixel count.
        max_pixels: u64,
    },
    /// Configuration could not be read or parsed.
    Config(String),
}

impl std::fmt::Display for SectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBuffer {
                width,
                height,
                channels,
                len,
            } => write!(
                f,
                "pixel buffer {}x{}x{} needs {} bytes, got {}",
                width,
                height,
                channels,
                *width as usize * *height as usize * channels,
                len
            ),
            Self::UnsupportedChannels(n) => {
                write!(f, "unsupported channel count {} (expected 3 or 4)", n)
            }
            Self::UnknownEllipseId(id) => write!(f, "no ellipse with id {}", id),
            Self::DuplicateEllipseId(id) => {
                write!(f, "ellipse id {} used more than once in grid basis", id)
            }
            Self::InvalidModel { reason } => write!(f, "invalid calibration model: {}", reason),
            Self::CanvasTooLarge {
                width,
                height,
                max_pixels,
            } => write!(
                f,
                "sector canvas {}x{} exceeds the {} pixel limit",
                width, height, max_pixels
            ),
            Self::Config(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for SectorError {}
