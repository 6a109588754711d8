//! End-to-end runs on synthetic sector-scan images.

use image::{Rgb, RgbImage};
use sectorgrid::{
    CalibrationMethod, EllipseStatus, GridBasis, PipelineConfig, PixelBuffer, SectorCalibrator,
    TrimParams,
};

const W: u32 = 260;
const H: u32 = 180;
const CENTER_X: f64 = -300.0;
const SLOPE: f64 = 0.002;
const SPOT_RADIUS: f64 = 6.0;
const COLS: [f64; 5] = [50.0, 90.0, 130.0, 170.0, 210.0];
const ROWS: [f64; 4] = [40.0, 70.0, 100.0, 130.0];

/// Circular spots of a physical grid as a sector scan records them: the
/// tangential axis is stretched by `1 / (slope · r)`.
fn render_scan() -> RgbImage {
    let mut img = RgbImage::from_pixel(W, H, Rgb([255, 255, 255]));
    for &sy in &ROWS {
        for &sx in &COLS {
            let rx = SPOT_RADIUS;
            let ry = SPOT_RADIUS / (SLOPE * (sx - CENTER_X));
            for y in 0..H {
                for x in 0..W {
                    let u = (x as f64 - sx) / rx;
                    let v = (y as f64 - sy) / ry;
                    if u * u + v * v <= 1.0 {
                        img.put_pixel(x, y, Rgb([0, 0, 0]));
                    }
                }
            }
        }
    }
    img
}

/// A horizontal bar below the grid: elongated enough to be a calibration
/// outlier, not enough to be rejected as a streak.
fn add_bar(img: &mut RgbImage) {
    for y in 155..161 {
        for x in 225..246 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
}

#[test]
fn full_run_recovers_scan_geometry() {
    let buffer = PixelBuffer::from(&render_scan());
    let run = SectorCalibrator::new().run(&buffer).unwrap();
    let report = &run.report;

    assert_eq!(report.ellipses.len(), 20);
    assert_eq!(report.regions.len(), 20);
    assert!(report.ellipses.iter().all(|e| e.status == EllipseStatus::Active));

    let model = report.model;
    assert!(model.is_valid);
    assert!(model.r_squared > 0.9, "r2={}", model.r_squared);
    assert!((model.slope - SLOPE).abs() / SLOPE < 0.15, "slope={}", model.slope);
    assert!(
        (model.rotation_center_x - CENTER_X).abs() < 60.0,
        "center={}",
        model.rotation_center_x
    );

    let grid = report.grid.as_ref().unwrap();
    assert_eq!(grid.cols.len(), 5);
    assert_eq!(grid.rows.len(), 4);

    let corrected = run.corrected.as_ref().unwrap();
    assert_eq!(report.corrected, Some(corrected.geometry));
    assert_eq!(corrected.buffer.channels(), 4);
    assert_eq!(corrected.buffer.rgba(0, 0), [0, 0, 0, 0]);

    // The fan undoes the tangential stretch.
    let after = report.corrected_metrics.unwrap();
    assert_eq!(after.sample_count, 20);
    assert!(after.mean_roundness > 0.9, "roundness={}", after.mean_roundness);
    assert!(after.mean_roundness > report.metrics.mean_roundness);
    assert!(after.score_roundness > report.metrics.score_roundness);
}

#[test]
fn robust_methods_flag_the_bar() {
    let mut img = render_scan();
    add_bar(&mut img);
    let buffer = PixelBuffer::from(&img);

    for method in [
        CalibrationMethod::default(),
        CalibrationMethod::IterativeTrim(TrimParams::default()),
    ] {
        let mut config = PipelineConfig::default();
        config.calibration = method;
        let cal = SectorCalibrator::with_config(config);
        let seg = cal.detect(&buffer);
        assert_eq!(seg.ellipses.len(), 21);

        let outcome = cal.calibrate(&seg.ellipses);
        let bar = outcome.ellipses.iter().find(|e| e.cy > 150.0).unwrap();
        assert_eq!(bar.status, EllipseStatus::Outlier, "{:?}", method);
        assert!(outcome.model.is_valid);
        assert!((outcome.model.slope - SLOPE).abs() / SLOPE < 0.15);

        // Outliers stay out of the raw metrics.
        let metrics = cal.score(&outcome.ellipses, None);
        assert!(metrics.sample_count <= 20);
    }
}

#[test]
fn basis_mode_indexes_the_lattice() {
    let buffer = PixelBuffer::from(&render_scan());
    let cal = SectorCalibrator::new();
    let seg = cal.detect(&buffer);
    // Reading order: ids 1..=5 on the first row, 6..=10 on the second.
    let basis = GridBasis {
        origin: 1,
        x_ref: 2,
        y_ref: 6,
    };
    let grid = cal.resolve_grid(&seg.ellipses, Some(&basis)).unwrap().unwrap();
    assert_eq!(
        grid.rows.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert_eq!(grid.cols.len(), 5);
    assert!(grid.rows.iter().all(|r| r.members.len() == 5));
}

#[test]
fn report_serializes_to_json() {
    let buffer = PixelBuffer::from(&render_scan());
    let run = SectorCalibrator::new().run(&buffer).unwrap();
    let json = serde_json::to_string(&run.report).unwrap();
    let back: sectorgrid::PipelineReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ellipses.len(), run.report.ellipses.len());
    assert_eq!(back.model.method, run.report.model.method);
}
