//! Error handling for module discovery and lookup resolution
//!
//! Only `InvalidContext` is a programmer error. Every other kind is
//! recovered locally; a lookup that exhausts the discovered modules and
//! the fallback loader surfaces `NotFound`.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum FacesError {
    #[error("Invalid execution context: {shape}")]
    InvalidContext { shape: String },

    #[error("Not found: {kind} - {name}")]
    NotFound { kind: String, name: String },

    #[error("Malformed module metadata: module {module} - {header}")]
    MalformedMetadata { module: u64, header: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context} - {message}")]
    Serialization { context: String, message: String },
}

/// Result alias used across the crate
pub type FacesResult<T> = Result<T, FacesError>;

impl FacesError {
    /// Create an invalid-context error
    pub fn invalid_context(shape: impl Into<String>) -> Self {
        Self::InvalidContext {
            shape: shape.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn malformed_metadata(module: u64, header: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            module,
            header: header.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn serialization(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            context: context.into(),
            message: message.into(),
        }
    }

    /// True for the not-found kind, which callers treat as absence
    pub fn is_not_found(&self) -> bool {
        matches!(self, FacesError::NotFound { .. })
    }
}

/// Convert from std::io errors
impl From<std::io::Error> for FacesError {
    fn from(err: std::io::Error) -> Self {
        FacesError::io("io_operation", err)
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for FacesError {
    fn from(err: serde_json::Error) -> Self {
        FacesError::serialization("json", err.to_string())
    }
}

/// Convert from toml errors
impl From<toml::de::Error> for FacesError {
    fn from(err: toml::de::Error) -> Self {
        FacesError::serialization("toml", err.to_string())
    }
}

/// Convert from figment errors
impl From<figment::Error> for FacesError {
    fn from(err: figment::Error) -> Self {
        FacesError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FacesError::not_found("type", "com.example.Missing");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("com.example.Missing"));

        let ctx_err = FacesError::invalid_context("portlet request");
        assert!(!ctx_err.is_not_found());
        assert!(ctx_err.to_string().contains("Invalid execution context"));
    }

    #[test]
    fn test_error_chaining() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing document");
        let err = FacesError::io("reading config document", io_err);

        assert!(err.source().is_some());
        assert!(err.to_string().contains("I/O operation failed"));
    }
}
