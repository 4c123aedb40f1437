//! Error types for workbook and price-book I/O.
//!
//! The transform itself never fails; only the file boundaries do.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing spreadsheets.
#[derive(Debug, Error)]
pub enum ExcelError {
    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to open workbook {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("workbook has no worksheet")]
    NoSheet,

    #[error("failed to read sheet {name}: {source}")]
    Sheet {
        name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures loading or saving a price book.
#[derive(Debug, Error)]
pub enum PriceBookError {
    #[error("failed to read price book {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid price book {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("failed to serialize price book: {0}")]
    Serialize(#[source] serde_yaml_ng::Error),

    #[error("failed to write price book {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file() {
        let err = ExcelError::NotFound(PathBuf::from("/tmp/carnet.xlsx"));
        assert_eq!(err.to_string(), "input file not found: /tmp/carnet.xlsx");

        let err = ExcelError::SheetNotFound("Câbles".to_string());
        assert_eq!(err.to_string(), "sheet not found: Câbles");
    }
}
