//! Aggregate pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calib::CalibrationMethod;
use crate::error::SectorError;
use crate::grid::GridSearchConfig;
use crate::metrics::MetricsConfig;
use crate::moments::RefineConfig;
use crate::remap::RemapConfig;
use crate::segment::SegmentConfig;

/// Every tunable of the pipeline. Missing JSON fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segment: SegmentConfig,
    pub refine: RefineConfig,
    pub grid: GridSearchConfig,
    pub calibration: CalibrationMethod,
    pub remap: RemapConfig,
    pub metrics: MetricsConfig,
}

impl PipelineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, SectorError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SectorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, SectorError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| SectorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&data)
    }

    /// Reject settings no stage can run with.
    pub fn validate(&self) -> Result<(), SectorError> {
        let bad = |msg: String| Err(SectorError::Config(msg));
        let s = &self.segment;
        if !(s.min_radius > 0.0 && s.min_radius <= s.max_radius) {
            return bad(format!(
                "segment radius range [{}, {}] is empty",
                s.min_radius, s.max_radius
            ));
        }
        if !(s.max_area_fraction > 0.0 && s.max_area_fraction <= 1.0) {
            return bad(format!(
                "segment.max_area_fraction {} outside (0, 1]",
                s.max_area_fraction
            ));
        }
        if !(s.max_axis_ratio >= 1.0) {
            return bad(format!("segment.max_axis_ratio {} < 1", s.max_axis_ratio));
        }
        if !(s.region_scale > 0.0) {
            return bad(format!("segment.region_scale {} must be positive", s.region_scale));
        }
        if !(self.grid.gap_scale > 0.0 && self.grid.basis_tolerance > 0.0) {
            return bad("grid gap_scale and basis_tolerance must be positive".to_string());
        }
        match &self.calibration {
            CalibrationMethod::Linear(p) if !(p.sigma_scale > 0.0 && p.min_threshold >= 0.0) => {
                return bad("linear sigma_scale must be positive".to_string());
            }
            CalibrationMethod::Ransac(c) if !(c.inlier_threshold > 0.0) => {
                return bad(format!(
                    "ransac inlier_threshold {} must be positive",
                    c.inlier_threshold
                ));
            }
            CalibrationMethod::IterativeTrim(p)
                if !(p.trim_percent >= 0.0 && p.trim_percent < 100.0) =>
            {
                return bad(format!(
                    "trim_percent {} outside [0, 100)",
                    p.trim_percent
                ));
            }
            _ => {}
        }
        if !(self.remap.padding_px >= 0.0) {
            return bad(format!("remap.padding_px {} is negative", self.remap.padding_px));
        }
        if !(self.metrics.row_break_scale > 0.0) {
            return bad(format!(
                "metrics.row_break_scale {} must be positive",
                self.metrics.row_break_scale
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::{RansacLineConfig, TrimParams};
    use crate::pixel::Polarity;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
        let json = serde_json::to_string(&PipelineConfig::default()).unwrap();
        assert!(PipelineConfig::from_json_str(&json).is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = PipelineConfig::from_json_str(
            r#"{
                "segment": { "polarity": "light", "threshold": 90 },
                "calibration": { "method": "iterative_trim", "iterations": 5 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.segment.polarity, Polarity::Light);
        assert_eq!(cfg.segment.threshold, 90);
        assert_eq!(cfg.segment.max_radius, 50.0);
        assert_eq!(
            cfg.calibration,
            CalibrationMethod::IterativeTrim(TrimParams {
                iterations: 5,
                trim_percent: 10.0,
            })
        );
        assert_eq!(cfg.remap.padding_px, 10.0);
    }

    #[test]
    fn ransac_tag_without_params() {
        let cfg = PipelineConfig::from_json_str(r#"{ "calibration": { "method": "ransac" } }"#)
            .unwrap();
        assert_eq!(
            cfg.calibration,
            CalibrationMethod::Ransac(RansacLineConfig::default())
        );
    }

    #[test]
    fn malformed_and_invalid_configs_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(SectorError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(
                r#"{ "segment": { "min_radius": 20, "max_radius": 5 } }"#
            ),
            Err(SectorError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(
                r#"{ "calibration": { "method": "iterative_trim", "trim_percent": 100 } }"#
            ),
            Err(SectorError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = PipelineConfig::from_json_file(Path::new("/nonexistent/sectorgrid.json"))
            .unwrap_err();
        assert!(
            matches!(err, SectorError::Config(msg) if msg.contains("/nonexistent/sectorgrid.json"))
        );
    }
}
