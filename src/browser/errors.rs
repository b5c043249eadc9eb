//! Browser error types

use thiserror::Error;

/// Browser-related errors
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Timed out: {0}")]
    WaitTimeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Script failed: {0}")]
    ScriptFailed(String),

    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BrowserError> for String {
    fn from(err: BrowserError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::WaitTimeout("element img never became visible".into());
        assert_eq!(err.to_string(), "Timed out: element img never became visible");
    }

    #[test]
    fn test_error_into_string_matches_display() {
        let err = BrowserError::LaunchFailed("no chrome binary".into());
        let display = err.to_string();
        let converted: String = err.into();
        assert_eq!(converted, display);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BrowserError = io.into();
        assert!(matches!(err, BrowserError::Io(_)));
    }
}
