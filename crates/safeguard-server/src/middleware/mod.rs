//! Middleware for `axum::Router` and `tower` services.
//!
//! This module provides two independent middlewares:
//! - [`Recoverer`]: turns panics of the wrapped service into `500` responses
//! - [`ErrorHandler`]: turns errors returned by the wrapped service into `400`
//!   or `500` responses, depending on the configured [`ClientErrors`]
//!
//! Both write a record through the configured [`Logger`] for every failure,
//! or fall back to standard error when no logger is set.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::Router;
//! use axum::routing::get;
//! use safeguard_server::ClientErrors;
//! use safeguard_server::middleware::{MiddlewareConfig, RouterSafeguardExt};
//!
//! #[derive(Debug, PartialEq, thiserror::Error)]
//! #[error("not found")]
//! struct NotFound;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MiddlewareConfig::default().with_service_name("accounts");
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .with_safeguard(&config, ClientErrors::new().with(NotFound))?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ClientErrors`]: crate::ClientErrors
//! [`Logger`]: crate::logging::Logger

mod config;
mod error_handling;
mod extensions;
mod recovery;
mod response;

pub use config::{ConfigError, MiddlewareConfig};
pub use error_handling::{ErrorHandler, ErrorHandlerLayer};
pub use extensions::RouterSafeguardExt;
pub use recovery::{Panic, PanicError, Recoverer, RecovererLayer};
