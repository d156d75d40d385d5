//! Client error type.

use crate::jwt::DecodeError;

/// Errors surfaced by the session store and the backend gateway.
#[derive(Debug)]
pub enum ClientError {
    /// The credential could not be decoded (or failed verification)
    Credential(DecodeError),
    /// 401 from the backend
    Unauthorized(String),
    /// 403 from the backend
    Forbidden(String),
    /// 404 from the backend
    NotFound(String),
    /// Backend rejected the input (400, 409, 422)
    ValidationFailure(String),
    /// Any other non-success status
    Server { status: u16, message: String },
    /// The request never completed
    NetworkFailure(String),
    /// The backend answered with a body we could not read
    InvalidResponse(String),
    /// Reading or writing the persisted credential failed
    Storage(std::io::Error),
    /// The same action is already in flight
    Busy,
    /// The view that issued the request was dismissed
    Cancelled,
    /// Invalid client configuration
    Config(String),
}

impl ClientError {
    /// Map a non-success HTTP status and backend message to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 409 | 422 => ClientError::ValidationFailure(message),
            401 => ClientError::Unauthorized(message),
            403 => ClientError::Forbidden(message),
            404 => ClientError::NotFound(message),
            _ => ClientError::Server { status, message },
        }
    }

    /// Message provided by the backend, if the error carries one.
    pub fn backend_message(&self) -> Option<&str> {
        let message = match self {
            ClientError::Unauthorized(m)
            | ClientError::Forbidden(m)
            | ClientError::NotFound(m)
            | ClientError::ValidationFailure(m)
            | ClientError::Server { message: m, .. } => m,
            _ => return None,
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Credential(e) => write!(f, "{}", e),
            ClientError::Unauthorized(m) => write!(f, "Unauthorized: {}", m),
            ClientError::Forbidden(m) => write!(f, "Forbidden: {}", m),
            ClientError::NotFound(m) => write!(f, "Not found: {}", m),
            ClientError::ValidationFailure(m) => write!(f, "Rejected by backend: {}", m),
            ClientError::Server { status, message } => {
                write!(f, "Backend error {}: {}", status, message)
            }
            ClientError::NetworkFailure(m) => write!(f, "Network failure: {}", m),
            ClientError::InvalidResponse(m) => write!(f, "Invalid response: {}", m),
            ClientError::Storage(e) => write!(f, "Credential storage error: {}", e),
            ClientError::Busy => write!(f, "Request already in progress"),
            ClientError::Cancelled => write!(f, "Request cancelled"),
            ClientError::Config(m) => write!(f, "Invalid configuration: {}", m),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Credential(e) => Some(e),
            ClientError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for ClientError {
    fn from(e: DecodeError) -> Self {
        ClientError::Credential(e)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e)
    }
}
