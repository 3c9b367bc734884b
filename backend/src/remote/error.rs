//! Error types for remote imagery service operations.
//!
//! Every call against the remote service can fail for reasons the relay does
//! not control (network, authentication, query rejection, timeouts). Errors
//! carry an [`ErrorContext`] so the HTTP boundary can log where a failure
//! happened without parsing messages.

use std::fmt;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Where a remote call failed.
///
/// Rendered as `[operation target details retryable]`, omitting unset parts,
/// e.g. `[find_region region=Nairobi status=503 retryable]`.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Service method that issued the call
    pub operation: Option<String>,
    /// Kind of remote object addressed: region, collection, table, map
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    /// Transport detail such as the HTTP status or a response excerpt
    pub details: Option<String>,
    /// Whether the same call may succeed if repeated
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    fn target(&self) -> Option<String> {
        match (&self.entity, &self.entity_id) {
            (Some(entity), Some(id)) => Some(format!("{}={}", entity, id)),
            (Some(entity), None) => Some(entity.clone()),
            (None, Some(id)) => Some(id.clone()),
            (None, None) => None,
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.target();
        let parts: Vec<&str> = [
            self.operation.as_deref(),
            target.as_deref(),
            self.details.as_deref(),
            self.retryable.then_some("retryable"),
        ]
        .into_iter()
        .flatten()
        .collect();
        write!(f, "[{}]", parts.join(" "))
    }
}

/// Error type for remote imagery service operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Credential loading or token exchange failed.
    #[error("Authentication error: {message} {context}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    /// Transport-level failure reaching the service.
    #[error("Connection error: {message} {context}")]
    Connection {
        message: String,
        context: ErrorContext,
    },

    /// The service rejected or failed to evaluate a query.
    #[error("Query error: {message} {context}")]
    Query {
        message: String,
        context: ErrorContext,
    },

    /// The service answered with a payload the relay could not decode.
    #[error("Invalid response: {message} {context}")]
    InvalidResponse {
        message: String,
        context: ErrorContext,
    },

    /// Client configuration or initialization error.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The remote call did not finish within the configured bound.
    #[error("Timeout error: {message} {context}")]
    Timeout {
        message: String,
        context: ErrorContext,
    },
}

impl RemoteError {
    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a connection error. Connection errors are retryable.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a query error with context.
    pub fn query_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Query {
            message: message.into(),
            context,
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a timeout error. Timeouts are retryable.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Authentication { context, .. }
            | Self::Connection { context, .. }
            | Self::Query { context, .. }
            | Self::InvalidResponse { context, .. }
            | Self::Configuration { context, .. }
            | Self::Timeout { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Authentication { context, .. }
            | Self::Connection { context, .. }
            | Self::Query { context, .. }
            | Self::InvalidResponse { context, .. }
            | Self::Configuration { context, .. }
            | Self::Timeout { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add or update the entity in the error context.
    pub fn with_entity(mut self, entity: impl Into<String>, id: impl ToString) -> Self {
        let context = self.context_mut();
        context.entity = Some(entity.into());
        context.entity_id = Some(id.to_string());
        self
    }
}

#[cfg(feature = "remote-service")]
impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            RemoteError::connection(err.to_string())
        } else if err.is_decode() {
            RemoteError::invalid_response(err.to_string())
        } else {
            RemoteError::query(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::invalid_response(format!("Malformed JSON: {}", err))
    }
}
