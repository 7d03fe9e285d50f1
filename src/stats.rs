// Per-oxide descriptive statistics of the raw (unscaled) measurements.

use crate::error::BiplotError;
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use std::io::Write;

/// Descriptive statistics for one feature column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureSummary {
    #[serde(rename = "Oxide")]
    pub feature: String,
    #[serde(rename = "Mean")]
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    #[serde(rename = "Std")]
    pub std: f64,
    #[serde(rename = "Min")]
    pub min: f64,
    #[serde(rename = "Max")]
    pub max: f64,
    #[serde(rename = "Median")]
    pub median: f64,
}

fn median(column: ArrayView1<f64>) -> f64 {
    let mut sorted: Vec<f64> = column.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Summarizes each column of `data` (shape: samples x features).
pub fn summarize_columns(
    data: ArrayView2<f64>,
    feature_names: &[String],
) -> Result<Vec<FeatureSummary>, BiplotError> {
    if feature_names.len() != data.ncols() {
        return Err(BiplotError::InvalidParameter(format!(
            "{} feature names for {} columns",
            feature_names.len(),
            data.ncols()
        )));
    }
    if data.nrows() < 2 {
        return Err(BiplotError::InsufficientData {
            required: 2,
            actual: data.nrows(),
        });
    }

    Ok(data
        .axis_iter(Axis(1))
        .zip(feature_names)
        .map(|(column, name)| FeatureSummary {
            feature: name.clone(),
            mean: column.mean().unwrap_or(f64::NAN),
            std: column.std(1.0),
            min: column.fold(f64::INFINITY, |acc, &v| acc.min(v)),
            max: column.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)),
            median: median(column),
        })
        .collect())
}

/// Writes summaries as CSV with columns `Oxide,Mean,Std,Min,Max,Median`.
pub fn write_summary_csv<W: Write>(writer: W, summaries: &[FeatureSummary]) -> Result<(), BiplotError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for summary in summaries {
        csv_writer.serialize(summary)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_summary_values() {
        let data = array![[1.0, 10.0], [2.0, 30.0], [4.0, 20.0], [9.0, 40.0]];
        let summaries = summarize_columns(data.view(), &names(2)).unwrap();
        assert_eq!(summaries.len(), 2);

        let first = &summaries[0];
        assert_abs_diff_eq!(first.mean, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(first.median, 3.0, epsilon = 1e-12);
        assert_eq!(first.min, 1.0);
        assert_eq!(first.max, 9.0);
        // deviations: -3, -2, 0, 5 -> 38 / 3
        assert_abs_diff_eq!(first.std, (38.0f64 / 3.0).sqrt(), epsilon = 1e-12);

        assert_abs_diff_eq!(summaries[1].median, 25.0, epsilon = 1e-12);
    }

    #[test]
    fn test_odd_length_median() {
        let data = array![[5.0], [1.0], [3.0]];
        let summaries = summarize_columns(data.view(), &names(1)).unwrap();
        assert_eq!(summaries[0].median, 3.0);
    }

    #[test]
    fn test_name_count_mismatch() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(matches!(
            summarize_columns(data.view(), &names(3)),
            Err(BiplotError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_csv_output_header_and_rows() {
        let data = array![[1.0], [3.0]];
        let summaries = summarize_columns(data.view(), &["SiO2".to_string()]).unwrap();
        let mut buffer = Vec::new();
        write_summary_csv(&mut buffer, &summaries).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Oxide,Mean,Std,Min,Max,Median"));
        assert!(lines.next().unwrap().starts_with("SiO2,2.0,"));
        assert_eq!(lines.next(), None);
    }
}
