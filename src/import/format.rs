use std::path::Path;

use crate::error::{Error, Result};

/// File formats accepted by the importer, detected from the declared
/// content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    /// `{"questions": [ ... ]}`
    Json,
    Csv,
    Spreadsheet,
}

/// How a format lays out question fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStyle {
    /// Native field shapes: arrays, booleans, nested objects.
    Structured,
    /// One flat string cell per column, e.g. `option1`, `isCorrect1`.
    Tabular,
}

const JSON_TYPES: &[&str] = &["application/json", "text/json"];
const CSV_TYPES: &[&str] = &["text/csv", "application/csv", "text/comma-separated-values"];
const SPREADSHEET_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.oasis.opendocument.spreadsheet",
];

impl UploadFormat {
    pub fn from_content_type(content_type: &str) -> Result<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if JSON_TYPES.contains(&essence.as_str()) {
            Ok(Self::Json)
        } else if CSV_TYPES.contains(&essence.as_str()) {
            Ok(Self::Csv)
        } else if SPREADSHEET_TYPES.contains(&essence.as_str()) {
            Ok(Self::Spreadsheet)
        } else {
            Err(Error::validation(format!(
                "unsupported file type '{content_type}', only JSON, CSV and spreadsheet files are allowed"
            )))
        }
    }

    /// Best guess from a file extension, for callers without a declared type.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(Error::validation(format!(
                "cannot infer file type of '{}'",
                path.display()
            ))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => JSON_TYPES[0],
            Self::Csv => CSV_TYPES[0],
            Self::Spreadsheet => SPREADSHEET_TYPES[0],
        }
    }

    pub fn record_style(self) -> RecordStyle {
        match self {
            Self::Json => RecordStyle::Structured,
            Self::Csv | Self::Spreadsheet => RecordStyle::Tabular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            UploadFormat::from_content_type("text/csv; charset=utf-8").unwrap(),
            UploadFormat::Csv
        );
        assert_eq!(
            UploadFormat::from_content_type("Application/JSON").unwrap(),
            UploadFormat::Json
        );
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        let err = UploadFormat::from_content_type("image/png").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn extension_guess() {
        assert_eq!(
            UploadFormat::from_path(Path::new("q/questions.XLSX")).unwrap(),
            UploadFormat::Spreadsheet
        );
        assert!(UploadFormat::from_path(Path::new("questions")).is_err());
    }
}
