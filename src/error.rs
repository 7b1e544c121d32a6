//! Error taxonomy for route operations.

use std::fmt;

/// External routing provider failure. Never retried by the core.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider could not be reached or returned a transport error.
    Unreachable(reqwest::Error),
    /// The provider throttled the request.
    RateLimited,
    /// The provider answered, but the body was not a usable solution.
    InvalidResponse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unreachable(err) => write!(f, "routing provider unreachable: {err}"),
            ProviderError::RateLimited => write!(f, "routing provider rate limited the request"),
            ProviderError::InvalidResponse(msg) => {
                write!(f, "invalid routing provider response: {msg}")
            }
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Unreachable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Unreachable(err)
    }
}

/// Store read/write failure. The computed result is discarded; the caller
/// must retry the whole operation.
#[derive(Debug)]
pub struct PersistenceError {
    pub message: String,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "persistence failure: {}", self.message)
    }
}

impl std::error::Error for PersistenceError {}

/// Notification dispatch failure. Recorded, never rolled back.
#[derive(Debug)]
pub struct NotificationError {
    pub message: String,
}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification failure: {}", self.message)
    }
}

impl std::error::Error for NotificationError {}

/// Top-level error for state machine and service operations.
#[derive(Debug)]
pub enum RouteError {
    /// `create` on an already existing ginc.
    DuplicateRoute(String),
    /// Operation on an unknown ginc.
    RouteNotFound(String),
    /// The gsin is not part of the route, pending or delivered.
    StopNotFound { ginc: String, gsin: String },
    /// A route needs at least two stops (start and end).
    TooFewStops(usize),
    /// Reordering is forbidden once any stop has been delivered.
    ReorderAfterDelivery(String),
    Provider(ProviderError),
    Persistence(PersistenceError),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::DuplicateRoute(ginc) => write!(f, "route {ginc} already exists"),
            RouteError::RouteNotFound(ginc) => write!(f, "route {ginc} not found"),
            RouteError::StopNotFound { ginc, gsin } => {
                write!(f, "stop {gsin} is not part of route {ginc}")
            }
            RouteError::TooFewStops(count) => {
                write!(f, "a route needs at least 2 stops, got {count}")
            }
            RouteError::ReorderAfterDelivery(ginc) => {
                write!(f, "route {ginc} has delivered stops, reordering is forbidden")
            }
            RouteError::Provider(err) => write!(f, "{err}"),
            RouteError::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Provider(err) => Some(err),
            RouteError::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderError> for RouteError {
    fn from(err: ProviderError) -> Self {
        RouteError::Provider(err)
    }
}

impl From<PersistenceError> for RouteError {
    fn from(err: PersistenceError) -> Self {
        RouteError::Persistence(err)
    }
}
