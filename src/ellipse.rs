//! Confidence ellipse for a 2D point cloud.
//!
//! Under a bivariate-normal assumption, the region
//! `(p - μ)ᵀ Σ⁻¹ (p - μ) ≤ χ²₂(c)` holds probability mass `c`. Its semi-axes are
//! `sqrt(χ²₂(c) · λᵢ)` along the eigenvectors of the sample covariance `Σ`.

use crate::error::BiplotError;
use crate::linalg_backends::{sorted_eigenpairs_descending, LinAlgBackendProvider};
use log::{debug, warn};
use ndarray::{array, ArrayView1};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::f64::consts::PI;

/// Default coverage. Conventionally labelled "2σ" on plots, although for two
/// degrees of freedom that is only an approximation.
pub const DEFAULT_CONFIDENCE: f64 = 0.955;

/// Geometry of a confidence ellipse.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfidenceEllipse {
    /// Mean of the x and y coordinates.
    pub center: (f64, f64),
    /// Full length of the major axis.
    pub width: f64,
    /// Full length of the minor axis.
    pub height: f64,
    /// Direction of the major axis, degrees in (-180, 180].
    pub angle_degrees: f64,
    /// Probability mass the ellipse was built for.
    pub confidence: f64,
}

impl ConfidenceEllipse {
    pub fn area(&self) -> f64 {
        PI * 0.25 * self.width * self.height
    }

    /// True when one of the axes has collapsed (a line segment or a point).
    pub fn is_degenerate(&self) -> bool {
        self.width <= f64::EPSILON || self.height <= f64::EPSILON
    }

    /// `n_points` points along the boundary, plus the first point repeated to close the path.
    pub fn boundary(&self, n_points: usize) -> Vec<(f64, f64)> {
        let n_points = n_points.max(3);
        let (a, b) = (0.5 * self.width, 0.5 * self.height);
        let (sin_t, cos_t) = self.angle_degrees.to_radians().sin_cos();
        (0..=n_points)
            .map(|i| {
                let phi = 2.0 * PI * (i % n_points) as f64 / n_points as f64;
                let (u, v) = (a * phi.cos(), b * phi.sin());
                (
                    self.center.0 + u * cos_t - v * sin_t,
                    self.center.1 + u * sin_t + v * cos_t,
                )
            })
            .collect()
    }

    /// Whether `point` lies inside or on the ellipse. A degenerate ellipse contains nothing.
    pub fn contains(&self, point: (f64, f64)) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let (a, b) = (0.5 * self.width, 0.5 * self.height);
        let (sin_t, cos_t) = self.angle_degrees.to_radians().sin_cos();
        let (dx, dy) = (point.0 - self.center.0, point.1 - self.center.1);
        let u = dx * cos_t + dy * sin_t;
        let v = -dx * sin_t + dy * cos_t;
        (u / a).powi(2) + (v / b).powi(2) <= 1.0
    }
}

/// Chi-squared quantile with two degrees of freedom.
pub fn chi_squared_quantile_2df(confidence: f64) -> Result<f64, BiplotError> {
    validate_confidence(confidence)?;
    let chi2 = ChiSquared::new(2.0).map_err(|e| BiplotError::InvalidParameter(e.to_string()))?;
    Ok(chi2.inverse_cdf(confidence))
}

fn validate_confidence(confidence: f64) -> Result<(), BiplotError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(BiplotError::InvalidParameter(format!(
            "confidence level must be in (0, 1), got {}",
            confidence
        )));
    }
    Ok(())
}

/// Computes the confidence ellipse of the points `(x[i], y[i])`.
///
/// # Errors
/// * `InsufficientData` if fewer than two points are supplied or the sequences
///   differ in length (`actual` is the shorter length).
/// * `InvalidParameter` if a coordinate is non-finite or `confidence` is outside (0, 1).
///
/// Zero variance along an axis is not an error: the result has zero width or height.
pub fn confidence_ellipse(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    confidence: f64,
) -> Result<ConfidenceEllipse, BiplotError> {
    if x.len() != y.len() {
        // Every x needs a matching y.
        return Err(BiplotError::InsufficientData {
            required: x.len().max(y.len()).max(2),
            actual: x.len().min(y.len()),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(BiplotError::InsufficientData {
            required: 2,
            actual: n,
        });
    }
    validate_confidence(confidence)?;
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(BiplotError::InvalidParameter(
            "coordinates must be finite".to_string(),
        ));
    }

    let mean_x = x.sum() / n as f64;
    let mean_y = y.sum() / n as f64;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let (dx, dy) = (xi - mean_x, yi - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let denom = (n - 1) as f64;
    let covariance = array![[sxx / denom, sxy / denom], [sxy / denom, syy / denom]];
    debug!("Ellipse covariance: {:?}", covariance);

    let eig_pairs = sorted_eigenpairs_descending(&LinAlgBackendProvider::new(), &covariance)
        .map_err(|e| BiplotError::Decomposition(e.to_string()))?;
    let (lambda_major, major_axis) = &eig_pairs[0];
    let (lambda_minor, _) = &eig_pairs[1];
    // Round-off in the mean of identical points leaves a variance far below the center's magnitude.
    let round_off_floor = 1e-24 * (mean_x * mean_x + mean_y * mean_y);
    let lambda_major = if *lambda_major <= round_off_floor {
        0.0
    } else {
        *lambda_major
    };
    // Round-off on a singular covariance leaves a tiny positive minor eigenvalue.
    let lambda_minor = if *lambda_minor <= 1e-12 * lambda_major || *lambda_minor <= round_off_floor {
        0.0
    } else {
        *lambda_minor
    };

    let quantile = chi_squared_quantile_2df(confidence)?;
    let width = 2.0 * (quantile * lambda_major).sqrt();
    let height = 2.0 * (quantile * lambda_minor).sqrt();

    let mut angle_degrees = if lambda_major > 0.0 {
        major_axis[1].atan2(major_axis[0]).to_degrees()
    } else {
        0.0
    };
    if angle_degrees <= -180.0 {
        angle_degrees += 360.0;
    }

    let ellipse = ConfidenceEllipse {
        center: (mean_x, mean_y),
        width,
        height,
        angle_degrees,
        confidence,
    };
    if ellipse.is_degenerate() {
        warn!(
            "Confidence ellipse is degenerate (width {:.3e}, height {:.3e}); covariance is singular.",
            width, height
        );
    }
    Ok(ellipse)
}
