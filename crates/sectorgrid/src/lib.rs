//! sectorgrid: fiducial-grid calibration and correction for sector-scan images.
//!
//! A sector scan maps each image column to a radius and each row to an angle
//! about a rotation center, so circular fiducials appear as ellipses whose
//! aspect ratio grows with distance from that center. The pipeline stages are:
//!
//! 1. **Segment** – threshold, 4-connected flood fill, moment ellipses, reading order.
//! 2. **Moments** – intensity-weighted ellipse refinement inside caller regions.
//! 3. **Grid** – rows and columns by exhaustive-angle search or a 3-point basis.
//! 4. **Calib** – robust line fit of aspect ratio vs. column (least squares,
//!    RANSAC, iterative trim) giving the rotation center and angular rate.
//! 5. **Remap** – inverse polar mapping of the raw image into the corrected fan.
//! 6. **Metrics** – roundness, size/spacing consistency and row linearity scores.
//!
//! # Public API
//! - [`SectorCalibrator`] as the primary entry point
//! - [`PipelineConfig`] and the per-stage config structs for tuning
//! - stage functions for callers that drive the pipeline themselves
//!
//! The crate never decodes or writes image files; callers hand it a
//! [`PixelBuffer`] (convertible from `image` buffers).

mod api;
pub mod calib;
mod config;
mod error;
pub mod grid;
mod metrics;
pub mod moments;
mod pixel;
mod region;
mod remap;
pub mod segment;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::{PipelineReport, PipelineRun, SectorCalibrator};
pub use calib::{
    calibrate, calibrate_with_rng, fit_points, fit_points_with_rng, CalibrationMethod,
    CalibrationModel, CalibrationOutcome, LinearParams, MethodKind, PointFit, RansacLineConfig,
    TrimParams,
};
pub use config::PipelineConfig;
pub use error::SectorError;
pub use grid::{resolve_grid, GridAssignment, GridBasis, GridLine, GridSearchConfig};
pub use metrics::{compute_metrics, CorrectionMetrics, MetricsConfig};
pub use moments::{extract_ellipses, refine_region, RefineConfig};
pub use pixel::{luminance, PixelBuffer, Polarity};
pub use region::{
    bounding_half_extents, EllipseEstimate, EllipseStatus, PixelBounds, Region, RegionShape,
};
pub use remap::{remap_sector, RemapConfig, SectorGeometry, SectorImage};
pub use segment::{segment_blobs, sort_reading_order, SegmentConfig, Segmentation};
