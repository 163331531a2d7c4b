//! Error types
//!
//! Every failure in the resource graph surfaces immediately as one of these
//! variants. Nothing in the crate retries.

use serde_json::Value;
use thiserror::Error;

/// Crate result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the transport and the resource graph
#[derive(Error, Debug)]
pub enum Error {
    /// The service answered with a non-success status code
    #[error("{method} {url} -> {status} {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        /// Truncated, sanitized response body
        body: String,
    },

    /// The request never produced a response (connect, TLS, timeout)
    #[error("{method} {url} failed: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built (TLS backend, bad options)
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The response body was not the JSON shape we needed
    #[error("{method} {url} returned {reason}")]
    Malformed {
        method: &'static str,
        url: String,
        reason: String,
    },

    /// Session login was rejected or impossible
    #[error("Login failed: {0}")]
    Login(String),

    /// Action arguments rejected before any network call
    #[error("Invalid arguments for action '{action}': {source}")]
    Validation {
        action: String,
        #[source]
        source: ValidationError,
    },

    /// Attribute or raw field absent after materialization
    #[error("{resource} has no attribute '{name}'")]
    NotFound { resource: String, name: String },

    /// No action of that name is bound on the resource
    #[error("{resource} has no action '{name}'")]
    ActionNotFound { resource: String, name: String },

    /// The action declaration carries no target address
    #[error("Action '{0}' has no target")]
    MissingTarget(String),

    /// Iteration, length or create() on a non-collection resource
    #[error("{operation} requires a collection, but {resource} is not one")]
    NotACollection {
        resource: String,
        operation: &'static str,
    },

    /// An operation that needs an address was called on a pure embedded object
    #[error("{0} requires a resource address")]
    MissingAddress(&'static str),
}

/// Reasons an action's arguments fail ActionInfo validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required parameter(s): {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("unknown parameter(s): {}", .0.join(", "))]
    Unknown(Vec<String>),

    #[error("parameter '{name}' expects {expected}, got {actual}")]
    WrongType {
        name: String,
        expected: String,
        actual: &'static str,
    },

    #[error("parameter '{name}' must be one of {allowed:?}; got {value}")]
    NotAllowed {
        name: String,
        allowed: Vec<Value>,
        value: Value,
    },
}

impl ValidationError {
    /// Parameter names this error is about
    pub fn parameters(&self) -> Vec<&str> {
        match self {
            Self::Missing(names) | Self::Unknown(names) => {
                names.iter().map(String::as_str).collect()
            },
            Self::WrongType { name, .. } | Self::NotAllowed { name, .. } => vec![name.as_str()],
        }
    }
}

impl Error {
    /// HTTP status for `Status` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures that came from the wire rather than the graph
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Request { .. } | Self::Malformed { .. } | Self::Login(_)
        )
    }
}
