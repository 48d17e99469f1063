//! [`Logger`] backed by the `tracing` ecosystem.

use axum::http::Method;
use tracing::Level;

use super::{LogContext, Logger};

/// Tracing target for events written by [`TracingLogger`].
pub const TRACING_TARGET_MIDDLEWARE: &str = "safeguard_server::middleware";

/// Emits one event per message through the globally installed subscriber.
///
/// Context fields are recorded as structured fields (`service`,
/// `request_id`, `method`, `path`, `status`); absent fields are skipped.
/// Events emitted while a request span is entered inherit that span.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    /// Creates a new [`TracingLogger`].
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

macro_rules! emit {
    ($level:expr, $context:expr, $message:expr) => {
        tracing::event!(
            target: TRACING_TARGET_MIDDLEWARE,
            $level,
            service = $context.service(),
            request_id = $context.request_id(),
            method = $context.method().map(Method::as_str),
            path = $context.path(),
            status = $context.status().map(|status| status.as_u16()),
            "{}",
            $message,
        )
    };
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, context: &LogContext, message: &str) {
        if level == Level::ERROR {
            emit!(Level::ERROR, context, message);
        } else if level == Level::WARN {
            emit!(Level::WARN, context, message);
        } else if level == Level::INFO {
            emit!(Level::INFO, context, message);
        } else if level == Level::DEBUG {
            emit!(Level::DEBUG, context, message);
        } else {
            emit!(Level::TRACE, context, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::logging::testing::CapturedOutput;

    #[test]
    fn writes_message_and_context_fields() {
        let output = CapturedOutput::default();
        let context = LogContext::new()
            .with_service("accounts")
            .with_request_id("req-7")
            .with_status(StatusCode::INTERNAL_SERVER_ERROR);

        output.capture(|| TracingLogger::new().error(&context, "db down"));

        let logs = output.contents();
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("db down"));
        assert!(logs.contains("accounts"));
        assert!(logs.contains("req-7"));
        assert!(logs.contains("500"));
        assert!(logs.contains(TRACING_TARGET_MIDDLEWARE));
    }

    #[test]
    fn respects_requested_level() {
        let output = CapturedOutput::default();
        output.capture(|| TracingLogger::new().log(Level::WARN, &LogContext::new(), "slow"));

        let logs = output.contents();
        assert!(logs.contains("WARN"));
        assert!(logs.contains("slow"));
    }
}
