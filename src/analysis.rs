// End-to-end pipeline: summary statistics, standardization, PCA, ellipse, artifacts.

use crate::dataset::XrfDataset;
use crate::ellipse::{confidence_ellipse, ConfidenceEllipse, DEFAULT_CONFIDENCE};
use crate::error::BiplotError;
use crate::pca::PCA;
use crate::render::{render_biplot, BiplotData, PlotStyle};
use crate::report::{format_console_report, write_results};
use crate::scaling::StandardScaler;
use crate::stats::{summarize_columns, write_summary_csv, FeatureSummary};
use log::{debug, info};
use ndarray::{s, Array2};
use std::fs;
use std::path::PathBuf;

pub const SUMMARY_STATISTICS_FILE: &str = "summary_statistics.csv";
pub const PCA_RESULTS_FILE: &str = "pca_results.txt";

/// Parameters of one analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Probability mass of the confidence ellipse, in (0, 1).
    pub confidence: f64,
    /// Components to keep; `None` keeps one per feature. At least 2 are needed for the biplot.
    pub n_components: Option<usize>,
    /// Where the biplot PNG is written (overwritten on every run).
    pub image_path: PathBuf,
    /// Directory for the summary statistics and results text; `None` skips them.
    pub stats_dir: Option<PathBuf>,
    pub plot_style: PlotStyle,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            confidence: DEFAULT_CONFIDENCE,
            n_components: None,
            image_path: PathBuf::from("pca_analysis_enhanced.png"),
            stats_dir: Some(PathBuf::from("results").join("stats")),
            plot_style: PlotStyle::default(),
        }
    }
}

/// Numeric results of a run. Nothing in here has touched the filesystem.
#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    pub sample_ids: Vec<String>,
    pub feature_names: Vec<String>,
    pub summary: Vec<FeatureSummary>,
    pub scaler: StandardScaler,
    pub standardized: Array2<f64>,
    pub pca: PCA,
    /// Sample scores, shape (n_samples, k_components).
    pub scores: Array2<f64>,
    /// Confidence ellipse of the PC1/PC2 scores.
    pub ellipse: ConfidenceEllipse,
}

impl AnalysisOutcome {
    /// Read-only view of the first two components for the renderer.
    pub fn biplot_data(&self) -> Result<BiplotData<'_>, BiplotError> {
        let rotation = self.pca.rotation().ok_or_else(|| {
            BiplotError::InvalidParameter("PCA model has not been fitted".to_string())
        })?;
        let ratio = self.pca.explained_variance_ratio().ok_or_else(|| {
            BiplotError::InvalidParameter("PCA model has not been fitted".to_string())
        })?;
        if rotation.ncols() < 2 || self.scores.ncols() < 2 {
            return Err(BiplotError::InvalidParameter(
                "a biplot needs at least two components".to_string(),
            ));
        }
        Ok(BiplotData {
            sample_ids: &self.sample_ids,
            scores: self.scores.slice(s![.., ..2]),
            feature_names: &self.feature_names,
            loadings: rotation.slice(s![.., ..2]),
            ellipse: &self.ellipse,
            variance_ratio: (ratio[0], ratio[1]),
        })
    }

    pub fn console_report(&self) -> Result<String, BiplotError> {
        format_console_report(&self.pca, &self.feature_names, Some(&self.ellipse))
    }
}

/// Paths written by [`write_artifacts`].
#[derive(Clone, Debug, PartialEq)]
pub struct ArtifactPaths {
    pub image: PathBuf,
    pub summary_statistics: Option<PathBuf>,
    pub pca_results: Option<PathBuf>,
}

/// Runs the numeric part of the pipeline. Performs no I/O, so a failure leaves no output behind.
pub fn analyze(dataset: &XrfDataset, config: &AnalysisConfig) -> Result<AnalysisOutcome, BiplotError> {
    let raw = dataset.feature_matrix();
    let n_components = config.n_components.unwrap_or(raw.ncols());
    if n_components < 2 {
        return Err(BiplotError::InvalidParameter(format!(
            "a biplot needs at least two components, got {}",
            n_components
        )));
    }

    info!(
        "Starting PCA analysis: {} samples, {} features, confidence {}",
        raw.nrows(),
        raw.ncols(),
        config.confidence
    );
    let overall_start_time = std::time::Instant::now();

    let feature_names = dataset.feature_names();
    let summary = summarize_columns(raw.view(), &feature_names)?;

    let mut scaler = StandardScaler::new();
    let standardized = scaler.fit_transform(raw.view())?;

    let mut pca = PCA::new();
    let scores = pca.fit_transform(standardized.view(), Some(n_components))?;

    let ellipse = confidence_ellipse(scores.column(0), scores.column(1), config.confidence)?;

    info!("Analysis finished in {:?}", overall_start_time.elapsed());
    Ok(AnalysisOutcome {
        sample_ids: dataset.sample_ids(),
        feature_names,
        summary,
        scaler,
        standardized,
        pca,
        scores,
        ellipse,
    })
}

/// Writes the biplot and, if `config.stats_dir` is set, the text artifacts.
///
/// Every destination is prepared and the text is formatted before anything is
/// written. The image is rendered to a temporary file next to its destination and
/// moved into place last, so a failure leaves no new image behind.
pub fn write_artifacts(outcome: &AnalysisOutcome, config: &AnalysisConfig) -> Result<ArtifactPaths, BiplotError> {
    let data = outcome.biplot_data()?;

    let text_artifacts = match &config.stats_dir {
        Some(dir) => {
            let mut summary_bytes = Vec::new();
            write_summary_csv(&mut summary_bytes, &outcome.summary)?;
            let mut results_bytes = Vec::new();
            write_results(&mut results_bytes, &outcome.pca, &outcome.feature_names)?;
            Some((dir, summary_bytes, results_bytes))
        }
        None => None,
    };

    let image_dir = match config.image_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };
    fs::create_dir_all(&image_dir)?;
    if let Some((dir, _, _)) = &text_artifacts {
        fs::create_dir_all(dir)?;
    }

    let staged_image = tempfile::Builder::new()
        .prefix(".biplot-")
        .suffix(".png")
        .tempfile_in(&image_dir)?;
    render_biplot(staged_image.path(), &data, &config.plot_style)?;

    let (summary_statistics, pca_results) = match text_artifacts {
        Some((dir, summary_bytes, results_bytes)) => {
            let summary_path = dir.join(SUMMARY_STATISTICS_FILE);
            fs::write(&summary_path, summary_bytes)?;
            let results_path = dir.join(PCA_RESULTS_FILE);
            fs::write(&results_path, results_bytes)?;
            info!("Wrote {} and {}", summary_path.display(), results_path.display());
            (Some(summary_path), Some(results_path))
        }
        None => (None, None),
    };

    staged_image
        .persist(&config.image_path)
        .map_err(|e| BiplotError::Io(e.error))?;
    debug!("Moved staged biplot into {}", config.image_path.display());

    Ok(ArtifactPaths {
        image: config.image_path.clone(),
        summary_statistics,
        pca_results,
    })
}
