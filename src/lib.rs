// PCA biplot of mudbrick XRF oxide compositions

//! Principal component analysis of X-ray fluorescence oxide measurements
//! (SiO2, Al2O3, Fe2O3, MgO, CaO, Na2O, K2O) from archaeological mudbrick
//! samples, with a confidence-ellipse biplot.
//!
//! The pipeline is linear: load and validate the table ([`XrfDataset`]),
//! standardize it ([`StandardScaler`]), decompose it ([`PCA`]), compute the
//! confidence ellipse of the first two score columns ([`confidence_ellipse`]),
//! then render ([`render_biplot`]) and report.
//!
//! ```no_run
//! use mudbrick_pca::{analyze, write_artifacts, AnalysisConfig, XrfDataset};
//!
//! let dataset = XrfDataset::embedded()?;
//! let config = AnalysisConfig::default();
//! let outcome = analyze(&dataset, &config)?;
//! write_artifacts(&outcome, &config)?;
//! print!("{}", outcome.console_report()?);
//! # Ok::<(), mudbrick_pca::BiplotError>(())
//! ```

pub mod analysis;
pub mod dataset;
pub mod ellipse;
pub mod error;
pub mod linalg_backends;
pub mod pca;
pub mod render;
pub mod report;
pub mod scaling;
pub mod stats;

pub use analysis::{analyze, write_artifacts, AnalysisConfig, AnalysisOutcome, ArtifactPaths};
pub use dataset::{Oxide, SampleRecord, XrfDataset};
pub use ellipse::{confidence_ellipse, ConfidenceEllipse, DEFAULT_CONFIDENCE};
pub use error::BiplotError;
pub use pca::PCA;
pub use render::{render_biplot, BiplotData, PlotStyle};
pub use scaling::StandardScaler;
