// Text summaries of a fitted PCA: console table and the results file.

use crate::ellipse::ConfidenceEllipse;
use crate::error::BiplotError;
use crate::pca::PCA;
use std::io::Write;

fn fitted_parts(pca: &PCA) -> Result<(&ndarray::Array2<f64>, &ndarray::Array1<f64>), BiplotError> {
    match (pca.rotation(), pca.explained_variance_ratio()) {
        (Some(rotation), Some(ratio)) => Ok((rotation, ratio)),
        _ => Err(BiplotError::InvalidParameter(
            "PCA model has not been fitted".to_string(),
        )),
    }
}

/// Console report: explained variance per component, the full loading table
/// (features as rows, components as columns) and, if given, the ellipse geometry.
pub fn format_console_report(
    pca: &PCA,
    feature_names: &[String],
    ellipse: Option<&ConfidenceEllipse>,
) -> Result<String, BiplotError> {
    let (rotation, ratio) = fitted_parts(pca)?;
    if feature_names.len() != rotation.nrows() {
        return Err(BiplotError::InvalidParameter(format!(
            "{} feature names for {} loading rows",
            feature_names.len(),
            rotation.nrows()
        )));
    }

    let mut out = String::new();
    write_console_report(&mut out, rotation, ratio, feature_names, ellipse)?;
    Ok(out)
}

fn write_console_report<W: std::fmt::Write>(
    out: &mut W,
    rotation: &ndarray::Array2<f64>,
    ratio: &ndarray::Array1<f64>,
    feature_names: &[String],
    ellipse: Option<&ConfidenceEllipse>,
) -> std::fmt::Result {
    writeln!(out, "Explained variance ratio:")?;
    for (i, r) in ratio.iter().enumerate() {
        writeln!(out, "PC{}: {:.2}%", i + 1, r * 100.0)?;
    }
    writeln!(out, "Cumulative (PC1-PC{}): {:.2}%", ratio.len(), ratio.sum() * 100.0)?;

    let name_width = feature_names.iter().map(|n| n.len()).max().unwrap_or(0).max(7);
    writeln!(out, "\nLoadings:")?;
    write!(out, "{:<width$}", "", width = name_width)?;
    for k in 0..rotation.ncols() {
        write!(out, "{:>9}", format!("PC{}", k + 1))?;
    }
    writeln!(out)?;
    for (name, row) in feature_names.iter().zip(rotation.rows()) {
        write!(out, "{:<width$}", name, width = name_width)?;
        for value in row.iter() {
            write!(out, "{:>9.3}", value)?;
        }
        writeln!(out)?;
    }

    if let Some(e) = ellipse {
        writeln!(
            out,
            "\n{:.1}% confidence ellipse: center ({:.3}, {:.3}), width {:.3}, height {:.3}, angle {:.2} deg",
            e.confidence * 100.0,
            e.center.0,
            e.center.1,
            e.width,
            e.height,
            e.angle_degrees
        )?;
    }
    Ok(())
}

/// Writes the plain-text results file: every component's variance ratio, then the
/// loadings of the first two components per feature.
pub fn write_results<W: Write>(mut writer: W, pca: &PCA, feature_names: &[String]) -> Result<(), BiplotError> {
    let (rotation, ratio) = fitted_parts(pca)?;
    if feature_names.len() != rotation.nrows() {
        return Err(BiplotError::InvalidParameter(format!(
            "{} feature names for {} loading rows",
            feature_names.len(),
            rotation.nrows()
        )));
    }

    writeln!(writer, "Explained variance ratios:")?;
    for (i, r) in ratio.iter().enumerate() {
        writeln!(writer, "PC{}: {:.3}", i + 1, r)?;
    }

    writeln!(writer, "\nLoadings:")?;
    let shown = rotation.ncols().min(2);
    for (name, row) in feature_names.iter().zip(rotation.rows()) {
        write!(writer, "{}:", name)?;
        for k in 0..shown {
            write!(writer, " PC{}={:.3}", k + 1, row[k])?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fitted() -> (PCA, Vec<String>) {
        let data = array![[1.0, 2.0, 0.5], [2.0, 4.5, 0.1], [3.0, 5.5, 0.9], [4.0, 8.2, 0.3]];
        let mut pca = PCA::new();
        pca.fit(data.view(), None).unwrap();
        (pca, vec!["SiO2".into(), "CaO".into(), "K2O".into()])
    }

    #[test]
    fn test_console_report_layout() {
        let (pca, names) = fitted();
        let text = format_console_report(&pca, &names, None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Explained variance ratio:");
        assert!(lines[1].starts_with("PC1: ") && lines[1].ends_with('%'));
        assert!(lines[4].starts_with("Cumulative (PC1-PC3): 100.00%"));
        assert!(text.contains("Loadings:"));
        let header = lines.iter().find(|l| l.contains("PC1") && l.contains("PC3") && !l.contains(':')).unwrap();
        assert!(header.contains("PC2"));
        assert!(lines.iter().any(|l| l.starts_with("SiO2")));
        assert!(!text.contains("confidence ellipse"));
    }

    #[test]
    fn test_console_report_includes_ellipse() {
        let (pca, names) = fitted();
        let ellipse = ConfidenceEllipse {
            center: (0.0, 0.0),
            width: 4.0,
            height: 1.0,
            angle_degrees: 12.5,
            confidence: 0.955,
        };
        let text = format_console_report(&pca, &names, Some(&ellipse)).unwrap();
        assert!(text.contains("95.5% confidence ellipse"));
        assert!(text.contains("angle 12.50 deg"));
    }

    #[test]
    fn test_results_file_format() {
        let (pca, names) = fitted();
        let mut buffer = Vec::new();
        write_results(&mut buffer, &pca, &names).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Explained variance ratios:");
        assert!(lines[1].starts_with("PC1: 0."));
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Loadings:");
        assert!(lines[6].starts_with("SiO2: PC1="));
        assert!(lines[6].contains(" PC2="));
        assert!(!lines[6].contains("PC3"));
        assert_eq!(lines.len(), 9);
    }

    /// Accepts `limit` bytes, then fails.
    struct BoundedSink {
        limit: usize,
        written: String,
    }

    impl std::fmt::Write for BoundedSink {
        fn write_str(&mut self, s: &str) -> std::fmt::Result {
            if self.written.len() + s.len() > self.limit {
                return Err(std::fmt::Error);
            }
            self.written.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_console_writer_errors_propagate() {
        let (pca, names) = fitted();
        let (rotation, ratio) = fitted_parts(&pca).unwrap();
        let mut sink = BoundedSink {
            limit: 40,
            written: String::new(),
        };
        assert!(write_console_report(&mut sink, rotation, ratio, &names, None).is_err());
        assert!(sink.written.starts_with("Explained variance ratio:\n"));
        assert!(!sink.written.contains("Loadings"));
    }

    #[test]
    fn test_unfitted_model_is_rejected() {
        let pca = PCA::new();
        assert!(format_console_report(&pca, &[], None).is_err());
        assert!(write_results(Vec::new(), &pca, &[]).is_err());
    }
}
