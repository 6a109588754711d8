use sectorgrid::{PipelineConfig, PixelBuffer, SectorCalibrator};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <image.png> [config.json] [corrected.png]",
            args[0]
        );
        std::process::exit(2);
    }

    let image = image::open(&args[1])?;
    let config = match args.get(2) {
        Some(path) => PipelineConfig::from_json_file(Path::new(path))?,
        None => PipelineConfig::default(),
    };

    let calibrator = SectorCalibrator::with_config(config);
    let run = calibrator.run(&PixelBuffer::from(&image))?;
    let report = &run.report;

    let outliers = report.ellipses.iter().filter(|e| !e.is_active()).count();
    println!(
        "Detected {} spots ({} outliers).",
        report.ellipses.len(),
        outliers
    );
    println!(
        "Model: slope {:.6}, center x {:.1}, R² {:.3}, valid {}",
        report.model.slope,
        report.model.rotation_center_x,
        report.model.r_squared,
        report.model.is_valid
    );
    println!("Raw score: {}", report.metrics.final_score);
    if let Some(after) = report.corrected_metrics {
        println!("Corrected score: {}", after.final_score);
    }

    if let (Some(out_path), Some(corrected)) = (args.get(3), run.corrected.as_ref()) {
        corrected.buffer.to_rgba_image().save(out_path)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
