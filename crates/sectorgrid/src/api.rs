//! High-level pipeline API.
//!
//! [`SectorCalibrator`] wraps a [`PipelineConfig`] and exposes each stage on
//! its own as well as the full detect → calibrate → grid → remap → score run.

use serde::{Deserialize, Serialize};

use crate::calib::{self, CalibrationModel, CalibrationOutcome};
use crate::config::PipelineConfig;
use crate::error::SectorError;
use crate::grid::{self, GridAssignment, GridBasis};
use crate::metrics::{compute_metrics, CorrectionMetrics};
use crate::moments::extract_ellipses;
use crate::pixel::{PixelBuffer, Polarity};
use crate::region::{EllipseEstimate, Region};
use crate::remap::{remap_sector, SectorGeometry, SectorImage};
use crate::segment::{segment_blobs, Segmentation};

/// Serializable summary of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub image_size: [u32; 2],
    /// Segmented ellipses with calibration statuses.
    pub ellipses: Vec<EllipseEstimate>,
    pub regions: Vec<Region>,
    pub grid: Option<GridAssignment>,
    pub model: CalibrationModel,
    /// Metrics of the raw ellipse set.
    pub metrics: CorrectionMetrics,
    /// Geometry of the corrected image, when the model allowed a remap.
    pub corrected: Option<SectorGeometry>,
    /// Metrics re-detected on the corrected image.
    pub corrected_metrics: Option<CorrectionMetrics>,
}

/// Result of [`SectorCalibrator::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub report: PipelineReport,
    pub corrected: Option<SectorImage>,
}

/// Primary pipeline interface.
///
/// Create once with a configuration, then run on many images.
///
/// # Examples
///
/// ```no_run
/// use sectorgrid::{PixelBuffer, SectorCalibrator};
///
/// let calibrator = SectorCalibrator::new();
/// let image = PixelBuffer::filled(640, 480, [255, 255, 255]);
/// let run = calibrator.run(&image).unwrap();
/// println!("{} spots, score {}", run.report.ellipses.len(), run.report.metrics.final_score);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SectorCalibrator {
    config: PipelineConfig,
}

impl SectorCalibrator {
    /// Calibrator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mutable access for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// Segment spots automatically.
    pub fn detect(&self, buffer: &PixelBuffer) -> Segmentation {
        segment_blobs(buffer, &self.config.segment)
    }

    /// Refine ellipses inside caller-supplied regions.
    pub fn extract(&self, buffer: &PixelBuffer, regions: &[Region]) -> Vec<EllipseEstimate> {
        extract_ellipses(buffer, regions, &self.config.refine)
    }

    /// Resolve grid rows and columns, by `basis` when given.
    pub fn resolve_grid(
        &self,
        ellipses: &[EllipseEstimate],
        basis: Option<&GridBasis>,
    ) -> Result<Option<GridAssignment>, SectorError> {
        grid::resolve_grid(ellipses, basis, &self.config.grid)
    }

    /// Fit the calibration model with the configured method.
    pub fn calibrate(&self, ellipses: &[EllipseEstimate]) -> CalibrationOutcome {
        calib::calibrate(ellipses, &self.config.calibration)
    }

    /// Remap into sector space.
    pub fn remap(
        &self,
        buffer: &PixelBuffer,
        model: &CalibrationModel,
    ) -> Result<SectorImage, SectorError> {
        remap_sector(buffer, model, &self.config.remap)
    }

    /// Score an ellipse set.
    pub fn score(
        &self,
        ellipses: &[EllipseEstimate],
        grid: Option<&GridAssignment>,
    ) -> CorrectionMetrics {
        compute_metrics(ellipses, grid, &self.config.metrics)
    }

    /// Re-detect spots on a corrected image and score them.
    ///
    /// Transparent pixels are flattened onto the background side of the
    /// threshold; `metrics.detect_threshold` overrides the segmentation threshold.
    pub fn score_corrected(&self, image: &SectorImage) -> CorrectionMetrics {
        let mut segment = self.config.segment.clone();
        if let Some(t) = self.config.metrics.detect_threshold {
            segment.threshold = t;
        }
        let background = match segment.polarity {
            Polarity::Dark => [255; 3],
            Polarity::Light => [0; 3],
        };
        let seg = segment_blobs(&image.buffer.flatten(background), &segment);
        let grid = grid::search_grid(&seg.ellipses, &self.config.grid);
        compute_metrics(&seg.ellipses, grid.as_ref(), &self.config.metrics)
    }

    /// Full run with the grid found by exhaustive search.
    pub fn run(&self, buffer: &PixelBuffer) -> Result<PipelineRun, SectorError> {
        self.run_with_basis(buffer, None)
    }

    /// Full run: detect, calibrate, resolve the grid, remap when the model is
    /// valid, and score both the raw and the corrected spots.
    ///
    /// A failed remap is logged and leaves `corrected` empty; only grid basis
    /// errors are returned.
    pub fn run_with_basis(
        &self,
        buffer: &PixelBuffer,
        basis: Option<&GridBasis>,
    ) -> Result<PipelineRun, SectorError> {
        let seg = self.detect(buffer);
        let outcome = self.calibrate(&seg.ellipses);
        let grid = self.resolve_grid(&outcome.ellipses, basis)?;
        let metrics = self.score(&outcome.ellipses, grid.as_ref());

        let corrected = if outcome.model.is_valid {
            match self.remap(buffer, &outcome.model) {
                Ok(img) => Some(img),
                Err(e) => {
                    tracing::warn!("sector remap failed: {}", e);
                    None
                }
            }
        } else {
            tracing::warn!("skipping sector remap: calibration model is not valid");
            None
        };
        let corrected_metrics = corrected.as_ref().map(|img| self.score_corrected(img));

        tracing::info!(
            "run: {} spots, model valid {}, score {}",
            outcome.ellipses.len(),
            outcome.model.is_valid,
            metrics.final_score
        );
        let report = PipelineReport {
            image_size: [buffer.width(), buffer.height()],
            ellipses: outcome.ellipses,
            regions: seg.regions,
            grid,
            model: outcome.model,
            metrics,
            corrected: corrected.as_ref().map(|img| img.geometry),
            corrected_metrics,
        };
        Ok(PipelineRun { report, corrected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::{CalibrationMethod, LinearParams};
    use crate::test_utils::{draw_disks, grid_centers};

    #[test]
    fn config_mut_applies() {
        let mut cal = SectorCalibrator::new();
        cal.config_mut().segment.threshold = 77;
        cal.config_mut().calibration = CalibrationMethod::Linear(LinearParams::default());
        assert_eq!(cal.config().segment.threshold, 77);
        assert_eq!(cal.config().calibration.kind(), calib::MethodKind::Linear);
    }

    #[test]
    fn blank_image_runs_softly() {
        let run = SectorCalibrator::new()
            .run(&PixelBuffer::filled(120, 80, [255, 255, 255]))
            .unwrap();
        assert!(run.report.ellipses.is_empty());
        assert!(run.report.grid.is_none());
        assert!(!run.report.model.is_valid);
        assert!(run.corrected.is_none());
        assert!(run.report.corrected_metrics.is_none());
        assert_eq!(run.report.metrics, CorrectionMetrics::default());
        assert_eq!(run.report.image_size, [120, 80]);
    }

    #[test]
    fn round_spots_give_flat_model() {
        // Circles everywhere: the aspect ratio does not vary, so no remap.
        let img = draw_disks(240, 160, &grid_centers(3, 4, [40.0, 40.0], 50.0), 9.0, 0, 255);
        let run = SectorCalibrator::new().run(&PixelBuffer::from(&img)).unwrap();
        assert_eq!(run.report.ellipses.len(), 12);
        let grid = run.report.grid.as_ref().unwrap();
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.cols.len(), 4);
        assert!(run.report.model.slope.abs() < 1e-3);
        assert!(run.report.metrics.final_score > 90);
    }

    #[test]
    fn extract_uses_refine_config() {
        let img = draw_disks(80, 80, &[[40.0, 40.0]], 7.0, 0, 255);
        let cal = SectorCalibrator::new();
        let e = cal.extract(&PixelBuffer::from(&img), &[Region::circle(3, [42.0, 38.0], 12.0)]);
        assert_eq!(e.len(), 1);
        assert!((e[0].cx - 40.0).abs() < 0.5);
    }

    #[test]
    fn basis_errors_propagate_from_run() {
        let img = draw_disks(200, 100, &grid_centers(2, 3, [40.0, 30.0], 50.0), 8.0, 0, 255);
        let basis = GridBasis {
            origin: 1,
            x_ref: 2,
            y_ref: 99,
        };
        assert_eq!(
            SectorCalibrator::new().run_with_basis(&PixelBuffer::from(&img), Some(&basis)),
            Err(SectorError::UnknownEllipseId(99))
        );
    }
}
