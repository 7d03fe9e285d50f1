// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::error::Error;

/// A thread-safe wrapper for standard dynamic errors,
/// so they implement `Send` and `Sync`.
pub type ThreadSafeStdError = Box<dyn Error + Send + Sync + 'static>;

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput {
    /// Eigenvalues in the order produced by the backend (ascending for LAPACK and faer).
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Symmetric eigendecomposition of a real covariance-like matrix.
/// Implementers read only the upper triangle of `matrix`.
pub trait BackendEigh {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError>;
}

fn check_square(matrix: &Array2<f64>) -> Result<(), ThreadSafeStdError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(format!(
            "Matrix must be square for eigendecomposition, got {}x{}.",
            matrix.nrows(),
            matrix.ncols()
        )
        .into());
    }
    Ok(())
}

// --- ndarray-linalg (LAPACK) backend ---

use ndarray_linalg::{Eigh as NdLinalgEigh, UPLO};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

impl BackendEigh for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
        check_square(matrix)?;
        if matrix.is_empty() {
            return Ok(EighOutput {
                eigenvalues: Array1::zeros(0),
                eigenvectors: Array2::zeros((0, 0)),
            });
        }
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper)?;
        Ok(EighOutput {
            eigenvalues,
            eigenvectors,
        })
    }
}

// --- faer backend ---

#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{check_square, BackendEigh, EighOutput, ThreadSafeStdError};
    use ndarray::{Array1, Array2};

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    impl BackendEigh for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
            check_square(matrix)?;
            let n = matrix.nrows();
            if n == 0 {
                return Ok(EighOutput {
                    eigenvalues: Array1::zeros(0),
                    eigenvectors: Array2::zeros((0, 0)),
                });
            }

            // faer views need contiguous memory; covariance matrices here are tiny, so copy.
            let faer_mat = faer::Mat::<f64>::from_fn(n, n, |i, j| matrix[[i, j]]);
            let eig = faer_mat
                .as_ref()
                .self_adjoint_eigen(faer::Side::Upper)
                .map_err(|e| format!("faer self-adjoint eigendecomposition failed: {:?}", e))?;

            let values = eig.S().column_vector();
            let vectors = eig.U();
            Ok(EighOutput {
                eigenvalues: Array1::from_shape_fn(n, |i| values[i]),
                eigenvectors: Array2::from_shape_fn((n, n), |(i, j)| vectors[(i, j)]),
            })
        }
    }
}

/// A provider struct that dispatches to the selected linear algebra backend
/// based on compile-time feature flags.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider;

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendEigh for LinAlgBackendProvider {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}

/// Decomposes `matrix` and returns its eigenpairs sorted by descending eigenvalue,
/// carrying each eigenvector along with its value.
pub fn sorted_eigenpairs_descending<B: BackendEigh>(
    backend: &B,
    matrix: &Array2<f64>,
) -> Result<Vec<(f64, Array1<f64>)>, ThreadSafeStdError> {
    let EighOutput {
        eigenvalues,
        eigenvectors,
    } = backend.eigh_upper(matrix)?;

    let mut eig_pairs: Vec<(f64, Array1<f64>)> = eigenvalues
        .into_iter()
        .zip(eigenvectors.columns().into_iter().map(|col| col.to_owned()))
        .collect();
    eig_pairs.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    Ok(eig_pairs)
}
