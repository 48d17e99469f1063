//! Panic recovery middleware.
//!
//! [`RecovererLayer`] wraps a service into a [`Recoverer`] that catches
//! panics raised while calling the service or while polling its response
//! future. A caught panic is normalized into a [`PanicError`], logged, and
//! answered with a plain `500 Internal Server Error`; the panic payload never
//! reaches the client.

mod panic;

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::BoxError;
use axum::body::{Body, Bytes, HttpBody};
use axum::http::{HeaderName, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::{BoxFuture, FutureExt};
use tower::{Layer, Service};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use self::panic::{PayloadDowncast, payload_downcast};
pub use self::panic::{Panic, PanicError};
use crate::logging::{
    DEFAULT_REQUEST_ID_HEADER, LogContext, Logger, SharedLogger, TracingLogger, fallback,
};
use crate::middleware::response::status_response;
use crate::render_error_chain;

/// Layer that applies the [`Recoverer`] middleware.
///
/// Without a logger, recovered panics are written to standard error together
/// with a backtrace.
#[derive(Clone)]
#[must_use = "layers do nothing unless applied to a service"]
pub struct RecovererLayer {
    logger: Option<SharedLogger>,
    context: LogContext,
    request_id_header: HeaderName,
    payload_types: Vec<Arc<PayloadDowncast>>,
}

impl RecovererLayer {
    /// Creates a new [`RecovererLayer`] without a logger.
    pub fn new() -> Self {
        Self {
            logger: None,
            context: LogContext::default(),
            request_id_header: HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER),
            payload_types: Vec::new(),
        }
    }

    /// Writes recovered panics through `logger`.
    pub fn with_logger(self, logger: impl Logger) -> Self {
        Self {
            logger: Some(Arc::new(logger)),
            ..self
        }
    }

    /// Writes recovered panics through a [`TracingLogger`].
    pub fn with_tracing(self) -> Self {
        self.with_logger(TracingLogger::new())
    }

    /// Sets the base context every per-request context is derived from.
    pub fn with_context(self, context: LogContext) -> Self {
        Self { context, ..self }
    }

    /// Sets the header read for the request id.
    pub fn with_request_id_header(self, request_id_header: HeaderName) -> Self {
        Self {
            request_id_header,
            ..self
        }
    }

    /// Treats panics carrying a value of type `E` as error panics.
    ///
    /// `panic_any(err)` erases the type of `err`; registered types are
    /// recovered as [`PanicError::Error`] and logged with their message.
    pub fn with_payload_type<E>(mut self) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.payload_types.push(payload_downcast::<E>());
        self
    }

    /// Returns `true` if a logger is configured.
    #[must_use]
    pub fn has_logger(&self) -> bool {
        self.logger.is_some()
    }

    /// Logs a recovered panic and builds the response sent in its place.
    fn recover(&self, context: LogContext, panic: Panic) -> Response {
        let error = PanicError::from_payload_with(panic, &self.payload_types);
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let message = render_error_chain(&error);

        match &self.logger {
            Some(logger) => logger.error(&context.with_status(status), &message),
            None => fallback::write_panic(&message),
        }

        status_response(status)
    }
}

impl Default for RecovererLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecovererLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecovererLayer")
            .field("logger", &self.has_logger())
            .field("context", &self.context)
            .field("request_id_header", &self.request_id_header)
            .field("payload_types", &self.payload_types.len())
            .finish()
    }
}

impl<S> Layer<S> for RecovererLayer {
    type Service = Recoverer<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Recoverer {
            inner,
            recovery: Arc::new(self.clone()),
        }
    }
}

/// Panic handler for [`CatchPanicLayer`] bound to one request.
#[derive(Clone)]
struct PanicResponder {
    recovery: Arc<RecovererLayer>,
    context: LogContext,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, panic: Panic) -> Response {
        self.recovery.recover(mem::take(&mut self.context), panic)
    }
}

/// Middleware that turns panics of the inner service into `500` responses.
///
/// Panics raised while calling the inner service and while polling its
/// response future are both caught by [`CatchPanicLayer`]. Responses of an
/// inner service that does not panic pass through as they are.
#[derive(Debug, Clone)]
pub struct Recoverer<S> {
    inner: S,
    recovery: Arc<RecovererLayer>,
}

impl<S> Recoverer<S> {
    /// Wraps `inner` with the configuration of `layer`.
    pub fn new(inner: S, layer: &RecovererLayer) -> Self {
        layer.layer(inner)
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Recoverer<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;
    type Response = Response;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let responder = PanicResponder {
            context: self
                .recovery
                .context
                .for_request(&request, &self.recovery.request_id_header),
            recovery: Arc::clone(&self.recovery),
        };

        CatchPanicLayer::custom(responder)
            .layer(&mut self.inner)
            .call(request)
            .map(|result| result.map(IntoResponse::into_response))
            .boxed()
    }
}
