use std::path::PathBuf;

use thiserror::Error;

/// Top-level error carried out of `app::run`.
///
/// `main` prints the message and exits with `exit_code`:
/// - `2`: bad input (flags, file format, unknown product)
/// - `3`: no usable result (e.g. the forecast model could not be fit)
/// - `4`: external/runtime failures (network, terminal, I/O)
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Domain errors raised while loading, normalizing, forecasting, or exporting.
#[derive(Debug, Error)]
pub enum SalesError {
    #[error("Unsupported file format '{name}': expected a .csv or .xlsx file.")]
    UnsupportedFormat { name: String },

    #[error("No sales data source is available ({})", .attempts.join("; "))]
    SourceUnavailable { attempts: Vec<String> },

    #[error("Forecast model could not be fit for '{product}': {reason}")]
    ForecastFitFailure { product: String, reason: String },

    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to parse {origin}: {reason}")]
    Parse { origin: String, reason: String },

    #[error("Failed to export forecast to '{}': {reason}", .path.display())]
    Export { path: PathBuf, reason: String },

    #[error("Unknown product '{0}'.")]
    UnknownProduct(String),
}

impl SalesError {
    /// Whether this error ends the session (as opposed to being shown inline).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SalesError::UnsupportedFormat { .. } | SalesError::SourceUnavailable { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SalesError::UnsupportedFormat { .. } | SalesError::Parse { .. } | SalesError::UnknownProduct(_) => 2,
            SalesError::ForecastFitFailure { .. } => 3,
            SalesError::SourceUnavailable { .. }
            | SalesError::Fetch { .. }
            | SalesError::Read { .. }
            | SalesError::Export { .. } => 4,
        }
    }
}

impl From<SalesError> for AppError {
    fn from(err: SalesError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_map_to_their_exit_codes() {
        let err = SalesError::UnsupportedFormat {
            name: "sales.json".to_string(),
        };
        assert!(err.is_fatal());
        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("sales.json"));

        let err = SalesError::SourceUnavailable {
            attempts: vec!["remote: timed out".to_string()],
        };
        assert!(err.is_fatal());
        assert_eq!(AppError::from(err).exit_code(), 4);
    }

    #[test]
    fn forecast_failure_is_recoverable() {
        let err = SalesError::ForecastFitFailure {
            product: "Product-1".to_string(),
            reason: "too short".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), 3);
    }
}
