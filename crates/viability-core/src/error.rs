use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the viability report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No JSON value could be recovered from an export file.
    #[error("Failed to parse JSON in {path}: {diagnostic}")]
    JsonParse { path: PathBuf, diagnostic: String },

    /// No usable transaction was recovered from the data directory.
    #[error("No transaction data found in {0}")]
    NoData(PathBuf),

    /// The requested year has no transactions.
    #[error("No transactions for year {year}; available: {available}")]
    YearNotFound { year: i32, available: String },

    /// The terminal could not be set up, drawn to or read from.
    #[error("Terminal error: {0}")]
    Terminal(String),
}

/// Convenience alias used throughout the viability crates.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ReportError::FileRead {
            path: PathBuf::from("/data/transacoes_01.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/transacoes_01.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_json_parse() {
        let err = ReportError::JsonParse {
            path: PathBuf::from("dados_api/transacoes_1.json"),
            diagnostic: "no JSON value found in text".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse JSON in dados_api/transacoes_1.json: no JSON value found in text"
        );
    }

    #[test]
    fn test_error_display_no_data() {
        let err = ReportError::NoData(PathBuf::from("dados_api"));
        assert_eq!(err.to_string(), "No transaction data found in dados_api");
    }

    #[test]
    fn test_error_display_year_not_found() {
        let err = ReportError::YearNotFound {
            year: 2019,
            available: "2023, 2024".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No transactions for year 2019; available: 2023, 2024"
        );
    }

    #[test]
    fn test_error_display_terminal() {
        let err = ReportError::Terminal("raw mode unavailable".to_string());
        assert_eq!(err.to_string(), "Terminal error: raw mode unavailable");
    }
}
