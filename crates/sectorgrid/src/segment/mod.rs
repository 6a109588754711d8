//! Threshold segmentation of fiducial spots.
//!
//! Pixels on the spot side of a brightness threshold are grouped into
//! 4-connected components. Each component's moments become an ellipse,
//! which is then gated by pixel count, radius range and axis ratio.

mod flood;
mod order;

pub use flood::{connected_components, Component};
pub use order::sort_reading_order;

use serde::{Deserialize, Serialize};

use crate::pixel::{PixelBuffer, Polarity};
use crate::region::{EllipseEstimate, Region};

/// Segmentation controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Dark spots on a light background, or the reverse.
    pub polarity: Polarity,
    /// Luminance threshold (0–255).
    pub threshold: u8,
    /// Minimum accepted semi-axis (pixels).
    pub min_radius: f64,
    /// Maximum accepted semi-axis (pixels).
    pub max_radius: f64,
    /// Components with fewer pixels are noise.
    pub min_pixels: usize,
    /// Components covering more than this fraction of the image are background.
    pub max_area_fraction: f64,
    /// Maximum major/minor axis ratio; thinner components are streaks.
    pub max_axis_ratio: f64,
    /// Scale of generated regions relative to the fitted axes.
    pub region_scale: f64,
    /// Row tolerance for reading order, in units of the row leader's `ry`.
    pub row_tolerance_scale: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::Dark,
            threshold: 128,
            min_radius: 3.0,
            max_radius: 50.0,
            min_pixels: 8,
            max_area_fraction: 0.4,
            max_axis_ratio: 5.0,
            region_scale: 1.3,
            row_tolerance_scale: 1.5,
        }
    }
}

/// Accepted spots and the regions generated around them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Segmentation {
    /// Ellipses in reading order, ids `1..=n`.
    pub ellipses: Vec<EllipseEstimate>,
    /// One region per ellipse, same id, axes scaled by `region_scale`.
    pub regions: Vec<Region>,
}

/// Per-reason rejection counts.
#[derive(Debug, Clone, Copy, Default)]
struct Rejections {
    too_small: usize,
    background: usize,
    radius: usize,
    streak: usize,
}

/// Segment spots from a pixel buffer.
pub fn segment_blobs(buffer: &PixelBuffer, config: &SegmentConfig) -> Segmentation {
    let (w, h) = (buffer.width() as usize, buffer.height() as usize);
    if w == 0 || h == 0 {
        return Segmentation::default();
    }
    let threshold = config.threshold as f64;
    let mask: Vec<bool> = buffer
        .luminance_plane()
        .into_iter()
        .map(|l| config.polarity.is_target(l, threshold))
        .collect();

    let components = connected_components(&mask, w, h);
    let max_pixels = (config.max_area_fraction * (w * h) as f64) as usize;
    let mut rejected = Rejections::default();
    let mut accepted = Vec::new();

    for comp in &components {
        let count = comp.moments.count;
        if count < config.min_pixels {
            rejected.too_small += 1;
            continue;
        }
        if count > max_pixels {
            rejected.background += 1;
            continue;
        }
        let Some(e) = comp.moments.to_ellipse() else {
            continue;
        };
        let in_range = |r: f64| r >= config.min_radius && r <= config.max_radius;
        if !in_range(e.rx) || !in_range(e.ry) {
            rejected.radius += 1;
            continue;
        }
        if e.axis_ratio() > config.max_axis_ratio {
            rejected.streak += 1;
            continue;
        }
        accepted.push(e.into_estimate(0));
    }

    tracing::debug!(
        "segmentation rejected {} small, {} background, {} out-of-range, {} streaks",
        rejected.too_small,
        rejected.background,
        rejected.radius,
        rejected.streak
    );

    let ellipses: Vec<EllipseEstimate> = sort_reading_order(&accepted, config.row_tolerance_scale)
        .into_iter()
        .zip(1u32..)
        .map(|(e, id)| EllipseEstimate { id, ..e })
        .collect();
    let regions = ellipses
        .iter()
        .map(|e| e.to_region(config.region_scale))
        .collect();

    tracing::info!(
        "{} spots segmented from {} components",
        ellipses.len(),
        components.len()
    );
    Segmentation { ellipses, regions }
}
