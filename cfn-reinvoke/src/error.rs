//! Error types for reinvocation scheduling.
//!
//! Two families of failure surface from this crate:
//!
//! - [`ReinvokeError`] is what callers of the scheduler see. It separates
//!   bad requests (never worth retrying as-is) from failures reported by the
//!   backing scheduling service.
//! - [`ServiceError`] is what a [`SchedulingService`](crate::SchedulingService)
//!   implementation returns from a single capability call. The scheduler wraps
//!   it together with the name of the call that failed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type returned by the reinvocation scheduler.
#[derive(Debug, Error)]
pub enum ReinvokeError {
    /// A required request field was missing or malformed.
    ///
    /// Raised before any call reaches the scheduling service.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the validation failure
        message: String,
    },

    /// One of the scheduling service capability calls failed.
    #[error("Service error during {operation}: {source}")]
    Service {
        /// The capability call that failed
        operation: ServiceOperation,
        /// The failure reported by the service
        #[source]
        source: ServiceError,
    },

    /// The identifier source could not produce an identifier.
    ///
    /// This points at a broken process environment and is never retriable.
    #[error("Identifier error: {message}")]
    Identifier {
        /// Description of the failure
        message: String,
    },

    /// The scheduler or service client was misconfigured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the misconfiguration
        message: String,
    },
}

impl ReinvokeError {
    /// Creates a new Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wraps a service failure with the call that produced it.
    pub fn service(operation: ServiceOperation, source: ServiceError) -> Self {
        Self::Service { operation, source }
    }

    /// Creates a new Identifier error.
    pub fn identifier(message: impl Into<String>) -> Self {
        Self::Identifier {
            message: message.into(),
        }
    }

    /// Creates a new Configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if this is a Validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true if this is a Service error.
    pub fn is_service(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    /// Returns true if the caller may reasonably retry the same request.
    ///
    /// Only service failures flagged retriable by the service qualify.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Service { source, .. } if source.is_retriable)
    }

    /// Returns the failed capability call, if this is a Service error.
    pub fn operation(&self) -> Option<ServiceOperation> {
        match self {
            Self::Service { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// The scheduling service capability call that was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceOperation {
    /// Create or replace a rule
    PutRule,
    /// Attach a target to a rule
    PutTargets,
    /// Detach a target from a rule
    RemoveTargets,
    /// Delete a rule
    DeleteRule,
}

impl ServiceOperation {
    /// Returns the vendor API action name for this call.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PutRule => "PutRule",
            Self::PutTargets => "PutTargets",
            Self::RemoveTargets => "RemoveTargets",
            Self::DeleteRule => "DeleteRule",
        }
    }
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure returned by a single scheduling service call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    /// Error message describing what went wrong
    pub message: String,
    /// Whether the service considers this failure transient
    pub is_retriable: bool,
    /// Optional underlying AWS error details
    pub aws_error: Option<AwsError>,
}

impl ServiceError {
    /// Creates a new retriable service error.
    pub fn retriable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retriable: true,
            aws_error: None,
        }
    }

    /// Creates a new non-retriable service error.
    pub fn non_retriable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retriable: false,
            aws_error: None,
        }
    }

    /// Attaches AWS error details.
    pub fn with_aws_error(mut self, aws_error: AwsError) -> Self {
        self.aws_error = Some(aws_error);
        self
    }

    /// Returns the AWS error code, if known.
    pub fn code(&self) -> Option<&str> {
        self.aws_error.as_ref().map(|e| e.code.as_str())
    }

    /// Returns true if the service rejected the call due to rate limiting.
    pub fn is_throttling(&self) -> bool {
        matches!(
            self.code(),
            Some("ThrottlingException") | Some("TooManyRequestsException")
        )
    }

    /// Returns true if the named rule or target does not exist.
    pub fn is_resource_not_found(&self) -> bool {
        self.code() == Some("ResourceNotFoundException")
    }
}

/// AWS error details for service failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsError {
    /// The AWS error code
    pub code: String,
    /// The AWS error message
    pub message: String,
    /// The request ID if available
    pub request_id: Option<String>,
}

impl AwsError {
    /// Creates new AWS error details without a request ID.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }
}

/// Error object for handing failures back to the invocation runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    /// The error type/name
    #[serde(rename = "ErrorType")]
    pub error_type: String,
    /// The error message
    #[serde(rename = "ErrorMessage")]
    pub error_message: String,
}

impl ErrorObject {
    /// Creates a new ErrorObject.
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }
}

impl From<&ReinvokeError> for ErrorObject {
    fn from(error: &ReinvokeError) -> Self {
        match error {
            ReinvokeError::Validation { message } => ErrorObject::new("ValidationError", message),
            ReinvokeError::Service { .. } => ErrorObject::new("ServiceError", error.to_string()),
            ReinvokeError::Identifier { message } => ErrorObject::new("IdentifierError", message),
            ReinvokeError::Configuration { message } => {
                ErrorObject::new("ConfigurationError", message)
            }
        }
    }
}
