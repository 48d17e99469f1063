//! Error types and client/server error classification.
//!
//! Errors returned by wrapped handlers are classified into one of two
//! [`ErrorClass`]es by walking their [`source`] chain against a configured
//! set of [`ClientErrors`] sentinels.
//!
//! [`source`]: std::error::Error::source

mod classify;

use std::error::Error as StdError;
use std::fmt;

use axum::http::StatusCode;

pub use self::classify::{ClientErrors, error_chain, is_any, render_error_chain};

/// Type alias for boxed errors that are Send + Sync.
///
/// This is the erased error type every fallible handler error is converted
/// into before it is logged and classified.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Binary classification of a handler failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The failure is attributable to the caller's request.
    Client,
    /// The failure is attributable to the serving system.
    Server,
}

impl ErrorClass {
    /// Returns the status code responded with for this class.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Client => StatusCode::BAD_REQUEST,
            Self::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the class as a string for structured logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }

    /// Returns `true` for [`ErrorClass::Client`].
    #[must_use]
    pub const fn is_client(self) -> bool {
        matches!(self, Self::Client)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_class_status_codes() {
        assert_eq!(ErrorClass::Client.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorClass::Server.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_class_as_str() {
        assert_eq!(ErrorClass::Client.as_str(), "client");
        assert_eq!(ErrorClass::Server.to_string(), "server");
        assert!(ErrorClass::Client.is_client());
        assert!(!ErrorClass::Server.is_client());
    }
}
