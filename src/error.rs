use thiserror::Error;

/// Errors raised anywhere in the load → standardize → decompose → plot pipeline.
#[derive(Error, Debug)]
pub enum BiplotError {
    /// Too few observations for the requested computation.
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// A caller-supplied parameter is outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The input table is malformed. `line` is 1-based and counts the header.
    #[error("data validation failed at line {line}: {message}")]
    DataValidation { line: usize, message: String },

    #[error("eigendecomposition failed: {0}")]
    Decomposition(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BiplotError {
    pub(crate) fn validation(line: usize, message: impl Into<String>) -> Self {
        BiplotError::DataValidation {
            line,
            message: message.into(),
        }
    }
}
