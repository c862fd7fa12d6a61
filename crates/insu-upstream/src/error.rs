//! Fetch errors for backend lookups
//!
//! Every failed lookup carries a structured [`FetchErrorKind`] so callers can
//! tell a dead backend from a failing one without reading the message text.

use std::fmt;

/// Structured failure kind reported by the fetch layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Request did not complete in time
    Timeout,
    /// Connection could not be established (refused, DNS, reset)
    Connect,
    /// Backend answered with a 5xx status
    Server(u16),
    /// Backend answered with a non-success, non-5xx status
    Status(u16),
    /// Response body could not be decoded
    Decode,
    /// Anything else
    Other,
}

impl FetchErrorKind {
    /// Kind for an HTTP status code that is not a success
    #[inline]
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        if (500..600).contains(&status) {
            Self::Server(status)
        } else {
            Self::Status(status)
        }
    }
}

/// Coarse display bucket of a fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Backend unreachable
    Transport,
    /// Backend reachable but failing (HTTP 5xx)
    Server,
    /// Any other failure
    Generic,
}

/// Error returned by every [`Upstream`](crate::Upstream) lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    /// Structured kind
    pub kind: FetchErrorKind,
    /// Human-readable description
    pub message: String,
}

impl FetchError {
    /// Create a new fetch error
    #[inline]
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Timeout error
    #[inline]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    /// Connection error
    #[inline]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Connect, message)
    }

    /// Error for a non-success HTTP status
    #[inline]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::from_status(status), message)
    }

    /// Decode error
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Decode, message)
    }

    /// Uncategorised error
    #[inline]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Other, message)
    }

    /// Display bucket for this error
    #[inline]
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self.kind {
            FetchErrorKind::Timeout | FetchErrorKind::Connect => FailureClass::Transport,
            FetchErrorKind::Server(_) => FailureClass::Server,
            FetchErrorKind::Status(_) | FetchErrorKind::Decode | FetchErrorKind::Other => {
                FailureClass::Generic
            }
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connection failed"),
            Self::Server(status) | Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Decode => write!(f, "decode failed"),
            Self::Other => write!(f, "request failed"),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Self::timeout(message)
        } else if err.is_connect() {
            Self::connect(message)
        } else if let Some(status) = err.status() {
            Self::status(status.as_u16(), message)
        } else if err.is_decode() {
            Self::decode(message)
        } else {
            Self::other(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_kind_splits_server_errors() {
        assert_eq!(FetchErrorKind::from_status(503), FetchErrorKind::Server(503));
        assert_eq!(FetchErrorKind::from_status(404), FetchErrorKind::Status(404));
        assert_eq!(FetchErrorKind::from_status(600), FetchErrorKind::Status(600));
    }

    #[test]
    fn class_buckets() {
        assert_eq!(FetchError::timeout("t").class(), FailureClass::Transport);
        assert_eq!(FetchError::connect("c").class(), FailureClass::Transport);
        assert_eq!(FetchError::status(500, "boom").class(), FailureClass::Server);
        assert_eq!(FetchError::status(400, "bad").class(), FailureClass::Generic);
        assert_eq!(FetchError::decode("json").class(), FailureClass::Generic);
        assert_eq!(FetchError::other("?").class(), FailureClass::Generic);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = FetchError::status(502, "bad gateway");
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }
}
