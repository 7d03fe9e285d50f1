// Principal component analysis (PCA) over an already standardized matrix

use crate::error::BiplotError;
use crate::linalg_backends::{sorted_eigenpairs_descending, LinAlgBackendProvider};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Principal component analysis (PCA) structure.
///
/// Fitting centers the input (it does not rescale it: standardize first with
/// [`StandardScaler`](crate::scaling::StandardScaler) to get a correlation-matrix
/// PCA) and eigendecomposes the covariance matrix. Components are ordered by
/// descending explained variance, are unit-norm and mutually orthogonal, and
/// follow a deterministic sign convention: the largest-magnitude coefficient
/// of each loading vector is positive.
#[derive(Clone, Debug, Default)]
pub struct PCA {
    /// The rotation matrix (loading vectors as columns).
    /// Shape: (n_features, k_components)
    rotation: Option<Array2<f64>>,
    /// Mean vector of the training data.
    /// Shape: (n_features)
    mean: Option<Array1<f64>>,
    /// Eigenvalues of the covariance matrix for the kept components.
    /// Shape: (k_components)
    explained_variance: Option<Array1<f64>>,
    /// Fraction of the total variance (covariance trace) captured per kept component.
    /// Shape: (k_components)
    explained_variance_ratio: Option<Array1<f64>>,
}

impl PCA {
    /// Creates a new, unfitted PCA.
    ///
    /// # Examples
    ///
    /// ```
    /// use mudbrick_pca::PCA;
    /// let pca = PCA::new();
    /// assert!(pca.rotation().is_none());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the rotation matrix (n_features, k_components), if fitted.
    pub fn rotation(&self) -> Option<&Array2<f64>> {
        self.rotation.as_ref()
    }

    /// Returns a reference to the mean vector of the training data, if fitted.
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Covariance eigenvalues of the kept components, largest first.
    pub fn explained_variance(&self) -> Option<&Array1<f64>> {
        self.explained_variance.as_ref()
    }

    /// Explained-variance fractions of the kept components, largest first.
    /// They sum to 1 when every component is kept.
    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.explained_variance_ratio.as_ref()
    }

    pub fn n_components(&self) -> usize {
        self.rotation.as_ref().map_or(0, |r| r.ncols())
    }

    /// Loading vector of `component` (0-based): one coefficient per original feature.
    pub fn loading(&self, component: usize) -> Option<ArrayView1<'_, f64>> {
        self.rotation
            .as_ref()
            .filter(|r| component < r.ncols())
            .map(|r| r.column(component))
    }

    /// Fits the principal axes by eigendecomposition of the covariance matrix.
    ///
    /// * `data_matrix` - Input data, shape (n_samples, n_features).
    /// * `n_components` - Number of components to keep. `None` keeps all features.
    ///
    /// # Errors
    /// Returns an error if the matrix has fewer than 2 samples, fewer samples than
    /// requested components, non-finite values, an out-of-range component count,
    /// or if the eigendecomposition fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use mudbrick_pca::PCA;
    ///
    /// let data = array![[1.0, 2.0], [3.0, 4.1], [5.0, 5.9]];
    /// let mut pca = PCA::new();
    /// pca.fit(data.view(), None).unwrap();
    /// assert_eq!(pca.n_components(), 2);
    /// ```
    pub fn fit(&mut self, data_matrix: ArrayView2<f64>, n_components: Option<usize>) -> Result<(), BiplotError> {
        let n_samples = data_matrix.nrows();
        let n_features = data_matrix.ncols();
        let requested = n_components.unwrap_or(n_features);

        if n_features == 0 {
            return Err(BiplotError::InvalidParameter(
                "input matrix has zero features".to_string(),
            ));
        }
        if requested == 0 || requested > n_features {
            return Err(BiplotError::InvalidParameter(format!(
                "n_components must be in 1..={}, got {}",
                n_features, requested
            )));
        }
        let required_samples = requested.max(2);
        if n_samples < required_samples {
            return Err(BiplotError::InsufficientData {
                required: required_samples,
                actual: n_samples,
            });
        }
        if let Some(((row, col), _)) = data_matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(BiplotError::InvalidParameter(format!(
                "non-finite value at row {}, column {}",
                row, col
            )));
        }

        let fit_start_time = std::time::Instant::now();
        let mean_vector = data_matrix
            .mean_axis(Axis(0))
            .ok_or_else(|| BiplotError::InvalidParameter("empty matrix".to_string()))?;
        let mut centered = data_matrix.to_owned();
        centered -= &mean_vector;

        let mut cov_matrix = centered.t().dot(&centered);
        cov_matrix /= (n_samples - 1) as f64;
        let total_variance = cov_matrix.diag().sum();
        debug!("Covariance matrix ({}x{}), trace {:.6}", n_features, n_features, total_variance);

        let eig_pairs = sorted_eigenpairs_descending(&LinAlgBackendProvider::new(), &cov_matrix)
            .map_err(|e| BiplotError::Decomposition(e.to_string()))?;

        let mut rotation = Array2::<f64>::zeros((n_features, requested));
        let mut sorted_eigenvalues = Array1::<f64>::zeros(requested);
        for (i, (eig_val, eig_vec)) in eig_pairs.into_iter().take(requested).enumerate() {
            sorted_eigenvalues[i] = eig_val.max(0.0);

            let mut eig_vec = eig_vec;
            let norm = eig_vec.dot(&eig_vec).sqrt();
            if norm > 1e-12 {
                eig_vec.mapv_inplace(|x| x / norm);
            }
            let dominant = eig_vec
                .iter()
                .copied()
                .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
            if dominant < 0.0 {
                eig_vec.mapv_inplace(|x| -x);
            }
            rotation.column_mut(i).assign(&eig_vec);
        }

        let ratio = if total_variance > 1e-12 {
            sorted_eigenvalues.mapv(|v| v / total_variance)
        } else {
            Array1::zeros(requested)
        };

        info!(
            "Fitted PCA on {} samples x {} features, kept {} components in {:?}",
            n_samples,
            n_features,
            requested,
            fit_start_time.elapsed()
        );
        debug!("Explained variance ratio: {:?}", ratio);

        self.mean = Some(mean_vector);
        self.rotation = Some(rotation);
        self.explained_variance = Some(sorted_eigenvalues);
        self.explained_variance_ratio = Some(ratio);
        Ok(())
    }

    /// Projects `x` (n_samples, n_features) onto the fitted components.
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, BiplotError> {
        let (rotation, mean) = match (self.rotation.as_ref(), self.mean.as_ref()) {
            (Some(r), Some(m)) => (r, m),
            _ => {
                return Err(BiplotError::InvalidParameter(
                    "PCA model has not been fitted".to_string(),
                ))
            }
        };
        if x.ncols() != mean.len() {
            return Err(BiplotError::InvalidParameter(format!(
                "expected {} features, got {}",
                mean.len(),
                x.ncols()
            )));
        }
        let mut centered = x.to_owned();
        centered -= mean;
        Ok(centered.dot(rotation))
    }

    /// Fits the model and returns the sample scores, shape (n_samples, k_components).
    pub fn fit_transform(
        &mut self,
        data_matrix: ArrayView2<f64>,
        n_components: Option<usize>,
    ) -> Result<Array2<f64>, BiplotError> {
        self.fit(data_matrix, n_components)?;
        self.transform(data_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::StandardScaler;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    /// Correlated synthetic data: two latent factors spread over `n_features` columns plus noise.
    fn generate_correlated_data(n_samples: usize, n_features: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut data = Array2::<f64>::zeros((n_samples, n_features));
        for mut row in data.rows_mut() {
            let f1 = normal.sample(&mut rng) * 3.0;
            let f2 = normal.sample(&mut rng);
            for (j, value) in row.iter_mut().enumerate() {
                let w = (j as f64 + 1.0) / n_features as f64;
                *value = w * f1 + (1.0 - w) * f2 + 0.1 * normal.sample(&mut rng);
            }
        }
        data
    }

    #[test]
    fn test_loadings_are_orthonormal() {
        let data = generate_correlated_data(50, 6, 7);
        let scaled = StandardScaler::new().fit_transform(data.view()).unwrap();
        let mut pca = PCA::new();
        pca.fit(scaled.view(), None).unwrap();
        let rotation = pca.rotation().unwrap();
        let gram = rotation.t().dot(rotation);
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_explained_variance_sorted_and_sums_to_one() {
        let data = generate_correlated_data(60, 5, 11);
        let scaled = StandardScaler::new().fit_transform(data.view()).unwrap();
        let mut pca = PCA::new();
        pca.fit(scaled.view(), None).unwrap();
        let ratio = pca.explained_variance_ratio().unwrap();
        assert_abs_diff_eq!(ratio.sum(), 1.0, epsilon = 1e-9);
        for pair in ratio.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        // Standardized input: total variance is n_features * n / (n - 1).
        let ev = pca.explained_variance().unwrap();
        assert_abs_diff_eq!(ev.sum(), 5.0 * 60.0 / 59.0, epsilon = 1e-9);
    }

    #[test]
    fn test_score_variance_matches_eigenvalues() {
        let data = generate_correlated_data(40, 4, 3);
        let mut pca = PCA::new();
        let scores = pca.fit_transform(data.view(), None).unwrap();
        let ev = pca.explained_variance().unwrap();
        for (k, column) in scores.axis_iter(Axis(1)).enumerate() {
            assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(column.var(1.0), ev[k], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sign_convention_is_deterministic() {
        let data = generate_correlated_data(30, 4, 5);
        let mut pca = PCA::new();
        pca.fit(data.view(), None).unwrap();
        for loading in pca.rotation().unwrap().columns() {
            let dominant = loading
                .iter()
                .copied()
                .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
            assert!(dominant > 0.0);
        }

        let mut again = PCA::new();
        again.fit(data.view(), None).unwrap();
        assert_eq!(pca.rotation(), again.rotation());
        assert_eq!(pca.explained_variance_ratio(), again.explained_variance_ratio());
    }

    #[test]
    fn test_truncated_components() {
        let data = generate_correlated_data(20, 5, 9);
        let mut pca = PCA::new();
        let scores = pca.fit_transform(data.view(), Some(2)).unwrap();
        assert_eq!(scores.dim(), (20, 2));
        assert_eq!(pca.rotation().unwrap().dim(), (5, 2));
        assert!(pca.explained_variance_ratio().unwrap().sum() < 1.0);
        assert!(pca.loading(1).is_some());
        assert!(pca.loading(2).is_none());
    }

    #[test]
    fn test_rank_one_data() {
        // Perfectly collinear columns: one non-zero component.
        let data = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let mut pca = PCA::new();
        pca.fit(data.view(), None).unwrap();
        let ratio = pca.explained_variance_ratio().unwrap();
        assert_abs_diff_eq!(ratio[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ratio[1], 0.0, epsilon = 1e-9);
        let first = pca.loading(0).unwrap();
        assert_abs_diff_eq!(first[0], 1.0 / 5.0f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(first[1], 2.0 / 5.0f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_fit_errors() {
        let mut pca = PCA::new();
        assert!(matches!(
            pca.fit(array![[1.0, 2.0]].view(), None),
            Err(BiplotError::InsufficientData { .. })
        ));
        // Three samples cannot support four components.
        let wide = Array2::from_shape_fn((3, 4), |(i, j)| (i * 4 + j) as f64);
        assert!(matches!(
            pca.fit(wide.view(), None),
            Err(BiplotError::InsufficientData { required: 4, actual: 3 })
        ));
        assert!(matches!(
            pca.fit(wide.view(), Some(0)),
            Err(BiplotError::InvalidParameter(_))
        ));
        assert!(matches!(
            pca.fit(array![[1.0, 2.0], [f64::INFINITY, 1.0]].view(), None),
            Err(BiplotError::InvalidParameter(ref message)) if message.contains("row 1, column 0")
        ));
        assert!(pca.transform(array![[1.0, 2.0]].view()).is_err());
    }
}
