use log::info;
use mudbrick_pca::{analyze, write_artifacts, AnalysisConfig, BiplotError, XrfDataset};

fn run() -> Result<(), BiplotError> {
    let config = AnalysisConfig::default();
    let dataset = XrfDataset::embedded()?;
    let outcome = analyze(&dataset, &config)?;
    let paths = write_artifacts(&outcome, &config)?;

    print!("{}", outcome.console_report()?);
    println!("\nBiplot saved to {}", paths.image.display());
    if let (Some(summary), Some(results)) = (&paths.summary_statistics, &paths.pca_results) {
        println!("Statistics saved to {} and {}", summary.display(), results.display());
    }
    info!("Analysis completed successfully");
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
