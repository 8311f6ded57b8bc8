//! Error types for Unimock Core

/// Result type alias for Unimock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Unimock
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("conflict: id '{id}' already exists")]
    Conflict { id: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("unsupported media type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a not-found error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a conflict error for a duplicate external ID
    pub fn conflict<S: Into<String>>(id: S) -> Self {
        Self::Conflict { id: id.into() }
    }

    /// Create an invalid-request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an unsupported-media-type error
    pub fn unsupported_media_type<S: Into<String>>(content_type: S) -> Self {
        Self::UnsupportedMediaType {
            content_type: content_type.into(),
        }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::conflict("tok-1");
        assert_eq!(err.to_string(), "conflict: id 'tok-1' already exists");

        let err = Error::not_found("/products/p1");
        assert!(err.to_string().contains("/products/p1"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
