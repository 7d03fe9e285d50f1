// Column standardization: zero mean, unit (population) variance.

use crate::error::BiplotError;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Per-column standardizer.
///
/// Uses the population standard deviation (ddof = 0), so every non-constant
/// column of the transformed training matrix has variance exactly 1.
/// Columns with a standard deviation below `1e-9` get a scale of `1.0`
/// and therefore become all zeros after centering.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Sanitized scale vector; all entries are positive.
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn fit(&mut self, data: ArrayView2<f64>) -> Result<&mut Self, BiplotError> {
        let n_samples = data.nrows();
        if n_samples < 2 {
            return Err(BiplotError::InsufficientData {
                required: 2,
                actual: n_samples,
            });
        }
        if data.ncols() == 0 {
            return Err(BiplotError::InvalidParameter(
                "cannot standardize a matrix with zero columns".to_string(),
            ));
        }
        if let Some(((row, col), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(BiplotError::InvalidParameter(format!(
                "non-finite value at row {}, column {}",
                row, col
            )));
        }

        let mean_vector = data
            .mean_axis(Axis(0))
            .ok_or_else(|| BiplotError::InvalidParameter("empty matrix".to_string()))?;
        let std_dev_vector = data.std_axis(Axis(0), 0.0);

        let sanitized_scale_vector = std_dev_vector.mapv(|val| if val.abs() < 1e-9 { 1.0 } else { val });
        for (col, &std_dev) in std_dev_vector.iter().enumerate() {
            if std_dev.abs() < 1e-9 {
                warn!("Column {} has zero variance; it will standardize to all zeros.", col);
            }
        }
        debug!("Scaler means: {:?}", mean_vector);
        debug!("Scaler standard deviations: {:?}", std_dev_vector);

        self.mean = Some(mean_vector);
        self.scale = Some(sanitized_scale_vector);
        Ok(self)
    }

    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>, BiplotError> {
        let (mean, scale) = match (self.mean.as_ref(), self.scale.as_ref()) {
            (Some(m), Some(s)) => (m, s),
            _ => {
                return Err(BiplotError::InvalidParameter(
                    "StandardScaler has not been fitted".to_string(),
                ))
            }
        };
        if data.ncols() != mean.len() {
            return Err(BiplotError::InvalidParameter(format!(
                "expected {} columns, got {}",
                mean.len(),
                data.ncols()
            )));
        }
        let mut scaled = data.to_owned();
        scaled -= mean;
        scaled /= scale;
        Ok(scaled)
    }

    pub fn fit_transform(&mut self, data: ArrayView2<f64>) -> Result<Array2<f64>, BiplotError> {
        self.fit(data)?;
        self.transform(data)
    }
}
