//! Intensity-weighted moment refinement inside a caller-supplied region.

use serde::{Deserialize, Serialize};

use super::RawMoments;
use crate::pixel::{PixelBuffer, Polarity};
use crate::region::{EllipseEstimate, Region};

/// Controls for region refinement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Which side of the threshold is the spot.
    pub polarity: Polarity,
    /// Fixed signal threshold; when unset the midpoint of the region's
    /// min/max signal is used.
    pub threshold_override: Option<u8>,
    /// Minimum number of above-threshold pixels before falling back to
    /// raw-intensity weighting of every pixel.
    pub min_weighted_pixels: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::Dark,
            threshold_override: None,
            min_weighted_pixels: 3,
        }
    }
}

/// Re-estimate the ellipse inside `region` from thresholded pixel intensities.
///
/// Signal is polarity-adjusted luminance (spots bright). Pixels at or above
/// the threshold get weight `signal − threshold + 1`. A region with no
/// usable pixels returns its own geometry unchanged.
pub fn refine_region(
    buffer: &PixelBuffer,
    region: &Region,
    config: &RefineConfig,
) -> EllipseEstimate {
    let fallback = EllipseEstimate::from_region(region);
    let Some(bounds) = region.bounding_box(buffer.width(), buffer.height()) else {
        return fallback;
    };

    // (x, y, signal) of every pixel inside the boundary.
    let mut samples: Vec<[f64; 3]> = Vec::new();
    for y in bounds.y0..=bounds.y1 {
        for x in bounds.x0..=bounds.x1 {
            if region.contains(x as f64, y as f64) {
                let s = config.polarity.signal(buffer.luminance(x, y));
                samples.push([x as f64, y as f64, s]);
            }
        }
    }
    if samples.is_empty() {
        return fallback;
    }

    let threshold = match config.threshold_override {
        Some(t) => t as f64,
        None => {
            let (lo, hi) = samples
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                    (lo.min(s[2]), hi.max(s[2]))
                });
            0.5 * (lo + hi)
        }
    };

    let mut moments = RawMoments::new();
    for &[x, y, s] in &samples {
        if s >= threshold {
            moments.add(x, y, s - threshold + 1.0);
        }
    }
    if moments.count < config.min_weighted_pixels {
        tracing::debug!(
            "region {}: {} pixels above threshold {:.1}, using raw intensities",
            region.id,
            moments.count,
            threshold
        );
        moments = RawMoments::from_weighted(&samples);
    }

    match moments.to_ellipse() {
        Some(e) => e.into_estimate(region.id),
        None => fallback,
    }
}

/// Refine every region, preserving region ids and order.
pub fn extract_ellipses(
    buffer: &PixelBuffer,
    regions: &[Region],
    config: &RefineConfig,
) -> Vec<EllipseEstimate> {
    let out: Vec<EllipseEstimate> = regions
        .iter()
        .map(|r| refine_region(buffer, r, config))
        .collect();
    tracing::debug!("refined {} regions", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{blurred, draw_disks};

    #[test]
    fn refines_offset_region_onto_soft_spot() {
        let img = blurred(&draw_disks(80, 80, &[[40.0, 38.0]], 8.0, 30, 220), 1.0);
        let buf = PixelBuffer::from(&img);
        let region = Region::circle(5, [43.0, 41.0], 14.0);
        let e = refine_region(&buf, &region, &RefineConfig::default());
        assert_eq!(e.id, 5);
        assert!((e.cx - 40.0).abs() < 0.5, "cx={}", e.cx);
        assert!((e.cy - 38.0).abs() < 0.5, "cy={}", e.cy);
        assert!((e.mean_radius() - 8.0).abs() / 8.0 < 0.15, "r={}", e.mean_radius());
    }

    #[test]
    fn light_polarity_with_threshold_override() {
        let img = draw_disks(60, 60, &[[30.0, 30.0]], 6.0, 240, 10);
        let buf = PixelBuffer::from(&img);
        let config = RefineConfig {
            polarity: Polarity::Light,
            threshold_override: Some(128),
            ..Default::default()
        };
        let e = refine_region(&buf, &Region::circle(1, [31.0, 29.0], 12.0), &config);
        assert!((e.cx - 30.0).abs() < 0.5);
        assert!((e.cy - 30.0).abs() < 0.5);
    }

    #[test]
    fn region_outside_image_is_unchanged() {
        let buf = PixelBuffer::filled(20, 20, [255, 255, 255]);
        let region = Region::ellipse(9, [-40.0, 5.0], 4.0, 3.0, 0.5);
        let e = refine_region(&buf, &region, &RefineConfig::default());
        assert_eq!(e, EllipseEstimate::from_region(&region));
    }

    #[test]
    fn uniform_region_zero_weight_is_unchanged() {
        // Black pixels under light polarity: every signal is 0, so the
        // raw-intensity fallback has zero total weight.
        let buf = PixelBuffer::filled(20, 20, [0, 0, 0]);
        let region = Region::circle(2, [10.0, 10.0], 1.5);
        let config = RefineConfig {
            polarity: Polarity::Light,
            threshold_override: Some(200),
            ..Default::default()
        };
        let e = refine_region(&buf, &region, &config);
        assert_eq!(e, EllipseEstimate::from_region(&region));
    }

    #[test]
    fn extract_preserves_order_and_ids() {
        let img = draw_disks(100, 40, &[[20.0, 20.0], [70.0, 20.0]], 5.0, 0, 255);
        let buf = PixelBuffer::from(&img);
        let regions = [
            Region::circle(11, [70.0, 20.0], 9.0),
            Region::circle(4, [20.0, 20.0], 9.0),
        ];
        let out = extract_ellipses(&buf, &regions, &RefineConfig::default());
        assert_eq!(out.iter().map(|e| e.id).collect::<Vec<_>>(), vec![11, 4]);
        assert!((out[0].cx - 70.0).abs() < 0.5);
        assert!((out[1].cx - 20.0).abs() < 0.5);
    }
}
