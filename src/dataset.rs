//! XRF oxide measurements of mudbrick samples.
//!
//! The dataset is a CSV table with one row per sample: a `Sample` identifier
//! followed by seven oxide concentrations in weight percent. Every row is
//! validated on load, so the numeric core downstream can assume a complete,
//! finite, non-negative matrix.

use crate::error::BiplotError;
use log::{debug, info};
use ndarray::Array2;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// The 30-sample table shipped with the crate.
const EMBEDDED_XRF_CSV: &str = include_str!("../data/xrf_data.csv");

const SAMPLE_COLUMN: &str = "Sample";

/// Oxides measured for every sample, in column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Oxide {
    SiO2,
    Al2O3,
    Fe2O3,
    MgO,
    CaO,
    Na2O,
    K2O,
}

impl Oxide {
    pub const COUNT: usize = 7;

    pub const ALL: [Oxide; Oxide::COUNT] = [
        Oxide::SiO2,
        Oxide::Al2O3,
        Oxide::Fe2O3,
        Oxide::MgO,
        Oxide::CaO,
        Oxide::Na2O,
        Oxide::K2O,
    ];

    /// Chemical formula as it appears in the CSV header and on plots.
    pub fn label(self) -> &'static str {
        match self {
            Oxide::SiO2 => "SiO2",
            Oxide::Al2O3 => "Al2O3",
            Oxide::Fe2O3 => "Fe2O3",
            Oxide::MgO => "MgO",
            Oxide::CaO => "CaO",
            Oxide::Na2O => "Na2O",
            Oxide::K2O => "K2O",
        }
    }
}

impl fmt::Display for Oxide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One measured sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRecord {
    pub id: String,
    /// Concentrations (wt%) indexed like `Oxide::ALL`.
    pub oxides: [f64; Oxide::COUNT],
}

impl SampleRecord {
    pub fn new(id: impl Into<String>, oxides: [f64; Oxide::COUNT]) -> Self {
        Self {
            id: id.into(),
            oxides,
        }
    }

    pub fn value(&self, oxide: Oxide) -> f64 {
        self.oxides[oxide as usize]
    }
}

/// A validated, immutable table of samples.
#[derive(Clone, Debug)]
pub struct XrfDataset {
    records: Vec<SampleRecord>,
}

impl XrfDataset {
    /// Builds a dataset from already-parsed records, applying the same checks as CSV loading.
    /// Line numbers in errors assume a header line precedes the records.
    pub fn from_records(records: Vec<SampleRecord>) -> Result<Self, BiplotError> {
        if records.is_empty() {
            return Err(BiplotError::validation(1, "dataset contains no samples"));
        }
        let mut seen_ids = HashSet::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let line = index + 2;
            if record.id.trim().is_empty() {
                return Err(BiplotError::validation(line, "empty sample identifier"));
            }
            if !seen_ids.insert(record.id.as_str()) {
                return Err(BiplotError::validation(
                    line,
                    format!("duplicate sample identifier '{}'", record.id),
                ));
            }
            for (oxide, &value) in Oxide::ALL.iter().zip(record.oxides.iter()) {
                if !value.is_finite() {
                    return Err(BiplotError::validation(
                        line,
                        format!("{} of sample '{}' is not finite", oxide, record.id),
                    ));
                }
                if value < 0.0 {
                    return Err(BiplotError::validation(
                        line,
                        format!("{} of sample '{}' is negative ({})", oxide, record.id, value),
                    ));
                }
            }
        }
        Ok(Self { records })
    }

    /// Parses a CSV table with header `Sample,SiO2,Al2O3,Fe2O3,MgO,CaO,Na2O,K2O`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BiplotError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let expected: Vec<&str> = std::iter::once(SAMPLE_COLUMN)
            .chain(Oxide::ALL.iter().map(|o| o.label()))
            .collect();
        if headers.iter().ne(expected.iter().copied()) {
            return Err(BiplotError::validation(
                1,
                format!(
                    "unexpected header [{}], expected [{}]",
                    headers.iter().collect::<Vec<_>>().join(","),
                    expected.join(",")
                ),
            ));
        }

        let mut records = Vec::new();
        for (index, row) in csv_reader.records().enumerate() {
            let row = row?;
            let line = row
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 2);
            if row.len() != expected.len() {
                return Err(BiplotError::validation(
                    line,
                    format!("expected {} fields, found {}", expected.len(), row.len()),
                ));
            }
            let mut oxides = [0.0; Oxide::COUNT];
            for (slot, (oxide, field)) in oxides
                .iter_mut()
                .zip(Oxide::ALL.iter().zip(row.iter().skip(1)))
            {
                *slot = field.parse::<f64>().map_err(|_| {
                    BiplotError::validation(
                        line,
                        format!("{} value '{}' is not numeric", oxide, field),
                    )
                })?;
            }
            records.push(SampleRecord::new(&row[0], oxides));
        }
        debug!("Parsed {} XRF rows", records.len());
        Self::from_records(records)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BiplotError> {
        let path = path.as_ref();
        info!("Loading XRF data from {}", path.display());
        Self::from_reader(File::open(path)?)
    }

    /// The mudbrick table compiled into the crate.
    pub fn embedded() -> Result<Self, BiplotError> {
        Self::from_reader(EMBEDDED_XRF_CSV.as_bytes())
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sample_ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn feature_names(&self) -> Vec<String> {
        Oxide::ALL.iter().map(|o| o.label().to_string()).collect()
    }

    /// Raw concentrations, shape (n_samples, 7).
    pub fn feature_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.records.len(), Oxide::COUNT), |(i, j)| {
            self.records[i].oxides[j]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Sample,SiO2,Al2O3,Fe2O3,MgO,CaO,Na2O,K2O\n";

    fn parse(body: &str) -> Result<XrfDataset, BiplotError> {
        XrfDataset::from_reader(format!("{HEADER}{body}").as_bytes())
    }

    fn expect_validation_line(result: Result<XrfDataset, BiplotError>, expected_line: usize) {
        match result {
            Err(BiplotError::DataValidation { line, .. }) => assert_eq!(line, expected_line),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_embedded_dataset_shape() {
        let dataset = XrfDataset::embedded().unwrap();
        assert_eq!(dataset.len(), 30);
        let matrix = dataset.feature_matrix();
        assert_eq!(matrix.dim(), (30, 7));
        assert!(matrix.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert_eq!(dataset.records()[0].id, "MB-01");
        assert_eq!(dataset.feature_names()[4], "CaO");
    }

    #[test]
    fn test_parse_valid_rows() {
        let dataset = parse("A,60.1,12.0,5.0,2.5,8.0,1.1,2.0\nB, 55.0 ,11.5,4.8,3.1,11.2,0.9,2.2\n").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[1].value(Oxide::SiO2), 55.0);
        assert_eq!(dataset.records()[0].value(Oxide::K2O), 2.0);
    }

    #[test]
    fn test_rejects_short_row() {
        expect_validation_line(parse("A,60.1,12.0,5.0,2.5,8.0,1.1,2.0\nB,55.0,11.5\n"), 3);
    }

    #[test]
    fn test_rejects_non_numeric_value() {
        expect_validation_line(parse("A,60.1,n/a,5.0,2.5,8.0,1.1,2.0\n"), 2);
    }

    #[test]
    fn test_rejects_negative_value() {
        expect_validation_line(parse("A,60.1,12.0,-5.0,2.5,8.0,1.1,2.0\n"), 2);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        expect_validation_line(
            parse("A,60.1,12.0,5.0,2.5,8.0,1.1,2.0\nA,60.1,12.0,5.0,2.5,8.0,1.1,2.0\n"),
            3,
        );
    }

    #[test]
    fn test_rejects_wrong_header() {
        let result = XrfDataset::from_reader("Sample,SiO2,Al2O3\nA,1,2\n".as_bytes());
        expect_validation_line(result, 1);
    }

    #[test]
    fn test_rejects_empty_table() {
        expect_validation_line(parse(""), 1);
    }

    #[test]
    fn test_from_records_rejects_nan() {
        let record = SampleRecord::new("X", [1.0, 2.0, f64::NAN, 1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(
            XrfDataset::from_records(vec![record]),
            Err(BiplotError::DataValidation { line: 2, .. })
        ));
    }
}
