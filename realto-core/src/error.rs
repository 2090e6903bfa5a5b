//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type RealtoResult<T> = Result<T, RealtoError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the Realto client
#[derive(Error, Debug)]
pub enum RealtoError {
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RealtoError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            RealtoError::Storage { context, .. } => Some(context),
            RealtoError::Network { context, .. } => Some(context),
            RealtoError::Authentication { context, .. } => Some(context),
            RealtoError::Config { context, .. } => Some(context),
            RealtoError::Validation { context, .. } => Some(context),
            RealtoError::NotFound { context, .. } => Some(context),
            _ => None,
        }
    }

    /// HTTP status code carried by the error, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            RealtoError::Network { status, .. } => *status,
            RealtoError::Authentication { .. } => Some(401),
            _ => None,
        }
    }

    /// Whether this error is the forced-logout 401 case
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RealtoError::Authentication { .. })
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            RealtoError::Network { .. } => true,
            RealtoError::Storage { .. } => true,
            RealtoError::Authentication { .. } => false,
            RealtoError::Config { .. } => false,
            RealtoError::Validation { .. } => false,
            RealtoError::NotFound { .. } => false,
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            RealtoError::Config { .. } | RealtoError::Validation { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            RealtoError::Network { .. } | RealtoError::Storage { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Network or storage error (may be recoverable)"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::error::RealtoError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::error::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::error::RealtoError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::error::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::error::RealtoError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::error::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'realto config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::error::RealtoError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::error::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_builder() {
        let context = ErrorContext::new("token_vault")
            .with_operation("load")
            .with_suggestion("Log in again");

        assert_eq!(context.component, "token_vault");
        assert_eq!(context.operation, Some("load".to_string()));
        assert_eq!(context.recovery_suggestions.len(), 1);
        assert!(!context.error_id.is_empty());
    }

    #[test]
    fn test_status_and_unauthorized() {
        let unauthorized = RealtoError::Authentication {
            message: "token rejected".to_string(),
            context: ErrorContext::new("interceptor"),
        };
        assert!(unauthorized.is_unauthorized());
        assert_eq!(unauthorized.status(), Some(401));
        assert!(!unauthorized.is_recoverable());

        let server_error = RealtoError::Network {
            message: "bad gateway".to_string(),
            status: Some(502),
            source: None,
            context: ErrorContext::new("api_client"),
        };
        assert!(!server_error.is_unauthorized());
        assert_eq!(server_error.status(), Some(502));
        assert!(server_error.is_recoverable());
    }

    #[test]
    fn test_storage_error_macro() {
        let error = storage_error!("write failed", "file_store");
        assert!(matches!(error, RealtoError::Storage { .. }));
        assert_eq!(error.status(), None);
    }
}
