//! Logging collaborator for the middleware.
//!
//! Both middlewares take an optional [`Logger`]. When one is configured,
//! recovered panics and handler errors are written through it together with
//! a [`LogContext`] used for correlation. When none is configured, a fixed
//! diagnostic line is written to standard error instead.

mod context;
pub(crate) mod fallback;
#[cfg(test)]
pub(crate) mod testing;
mod tracing;

use std::sync::Arc;

pub use ::tracing::Level;

pub use self::context::{DEFAULT_REQUEST_ID_HEADER, LogContext};
pub use self::tracing::{TRACING_TARGET_MIDDLEWARE, TracingLogger};

/// Logger shared between every clone of a middleware.
pub type SharedLogger = Arc<dyn Logger>;

/// Sink for severity-tagged messages with correlation context.
///
/// Implementations must be safe for concurrent use and must never panic:
/// they run inside the recovery path of the middleware.
pub trait Logger: Send + Sync + 'static {
    /// Writes `message` at `level` with the given correlation `context`.
    fn log(&self, level: Level, context: &LogContext, message: &str);

    /// Writes `message` at [`Level::ERROR`].
    fn error(&self, context: &LogContext, message: &str) {
        self.log(Level::ERROR, context, message);
    }
}

impl<L> Logger for Arc<L>
where
    L: Logger + ?Sized,
{
    fn log(&self, level: Level, context: &LogContext, message: &str) {
        (**self).log(level, context, message);
    }
}
