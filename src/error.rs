use thiserror::Error;

/// Where a failure came from. Only `Network` means the backend was unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend answered with an error status or an undecodable body.
    Http,
    /// The request never reached the server.
    Network,
    /// Rejected on this side: bad configuration, an unencodable body, a
    /// failed local write, or a conflicting request already running.
    Local,
}

/// Structured rejection returned by every backend call.
///
/// `status` carries the HTTP status code, or `0` when no response was
/// involved (DNS failure, refused connection, timeout, local failure).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub kind: ErrorKind,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub const NETWORK_STATUS: u16 = 0;
    pub const UNAUTHORIZED_STATUS: u16 = 401;

    pub fn new(status: u16, message: impl Into<String>) -> Self {
        let kind = if status == Self::NETWORK_STATUS {
            ErrorKind::Network
        } else {
            ErrorKind::Http
        };
        Self {
            status,
            message: message.into(),
            kind,
        }
    }

    pub fn network() -> Self {
        Self::new(Self::NETWORK_STATUS, "network error")
    }

    pub fn unauthorized() -> Self {
        Self::new(Self::UNAUTHORIZED_STATUS, "Unauthorized - please login again")
    }

    /// A failure on this side of the wire, such as persisting a session,
    /// writing a download or building the request itself.
    pub fn local(context: &str, err: impl std::fmt::Display) -> Self {
        Self {
            status: Self::NETWORK_STATUS,
            message: format!("{}: {}", context, err),
            kind: ErrorKind::Local,
        }
    }

    /// Refused because a conflicting request for the same record is still running.
    pub fn in_flight(message: impl Into<String>) -> Self {
        Self {
            status: 409,
            message: message.into(),
            kind: ErrorKind::Local,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// Generic message used when a failed response carries no usable detail.
    pub fn from_status(status: u16) -> Self {
        Self::new(status, format!("API error: {}", status))
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    pub fn is_local(&self) -> bool {
        self.kind == ErrorKind::Local
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Self::UNAUTHORIZED_STATUS
    }
}
