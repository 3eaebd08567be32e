use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimbadError>;

#[derive(Debug, Error)]
pub enum SimbadError {
    #[error("Network request failed: {message}")]
    Transport { message: String },

    #[error("HTTP request failed with status: {status}")]
    Http { status: u16 },

    #[error("SIMBAD reported an error: {message}")]
    Service { message: String },

    #[error("Invalid table payload: {message}")]
    Table { message: String },

    #[error("Invalid table row: {message}")]
    Row { message: String },

    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimbadError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    pub fn table(message: impl Into<String>) -> Self {
        Self::Table {
            message: message.into(),
        }
    }

    pub fn row(message: impl Into<String>) -> Self {
        Self::Row {
            message: message.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for SimbadError {
    fn from(err: quick_xml::Error) -> Self {
        Self::table(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn transport_error_display() {
        let error = SimbadError::transport("connection refused");
        assert_eq!(
            error.to_string(),
            "Network request failed: connection refused"
        );
    }

    #[test]
    fn http_error_display() {
        let error = SimbadError::Http { status: 503 };
        assert_eq!(error.to_string(), "HTTP request failed with status: 503");
    }

    #[test]
    fn service_error_display() {
        let error = SimbadError::service("Identifier not found");
        assert!(error.to_string().contains("Identifier not found"));
    }

    #[test]
    fn row_error_display() {
        let error = SimbadError::row("column 'oid' is not an integer: 'abc'");
        assert_eq!(
            error.to_string(),
            "Invalid table row: column 'oid' is not an integer: 'abc'"
        );
    }

    #[test]
    fn invalid_url_error_display() {
        let error = SimbadError::invalid_url("nope", "relative URL without a base");
        assert!(error.to_string().contains("'nope'"));
        assert!(error.to_string().contains("relative URL"));
    }

    #[test]
    fn io_error_conversion() {
        let io_error = Error::new(ErrorKind::UnexpectedEof, "stream closed");
        let error: SimbadError = io_error.into();
        assert!(matches!(error, SimbadError::Io(_)));
        assert!(error.to_string().starts_with("I/O error:"));
    }
}
