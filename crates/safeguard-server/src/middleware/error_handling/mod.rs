//! Error handling middleware for fallible services and handlers.
//!
//! [`ErrorHandlerLayer`] turns a service whose error type converts into a
//! [`BoxedError`] into an infallible [`ErrorHandler`], built on
//! [`HandleError`]. Returned errors are logged, classified against the
//! configured [`ClientErrors`] and answered with `400 Bad Request` or
//! `500 Internal Server Error`.
//!
//! A wrapped handler either produces a response or an error, never both, so
//! at most one response leaves the middleware per request.

use std::any::Any;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::error_handling::HandleError;
use axum::error_handling::future::HandleErrorFuture;
use axum::http::{HeaderName, Request};
use axum::response::{IntoResponse, Response};
use tower::util::ServiceFn;
use tower::{Layer, Service, service_fn};

use crate::logging::{
    DEFAULT_REQUEST_ID_HEADER, LogContext, Logger, SharedLogger, TracingLogger, fallback,
};
use crate::middleware::response::status_response;
use crate::{BoxedError, ClientErrors, ErrorClass, render_error_chain};

/// Layer that applies the [`ErrorHandler`] middleware.
#[derive(Clone)]
#[must_use = "layers do nothing unless applied to a service"]
pub struct ErrorHandlerLayer {
    logger: Option<SharedLogger>,
    context: LogContext,
    request_id_header: HeaderName,
    client_errors: ClientErrors,
}

impl ErrorHandlerLayer {
    /// Creates a new [`ErrorHandlerLayer`] without a logger.
    ///
    /// Errors matching `client_errors` are answered with `400`, every other
    /// error with `500`.
    pub fn new(client_errors: ClientErrors) -> Self {
        Self {
            logger: None,
            context: LogContext::default(),
            request_id_header: HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER),
            client_errors,
        }
    }

    /// Writes handler errors through `logger`.
    pub fn with_logger(self, logger: impl Logger) -> Self {
        Self {
            logger: Some(Arc::new(logger)),
            ..self
        }
    }

    /// Writes handler errors through a [`TracingLogger`].
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

    /// Returns the configured client errors.
    #[must_use]
    pub fn client_errors(&self) -> &ClientErrors {
        &self.client_errors
    }

    /// Returns `true` if a logger is configured.
    #[must_use]
    pub fn has_logger(&self) -> bool {
        self.logger.is_some()
    }

    /// Adapts an async handler function returning `Result<R, E>`.
    ///
    /// The returned service can be mounted with `axum::Router::route_service`.
    ///
    /// ```rust
    /// use axum::Router;
    /// use axum::extract::Request;
    /// use safeguard_server::ClientErrors;
    /// use safeguard_server::middleware::ErrorHandlerLayer;
    ///
    /// #[derive(Debug, PartialEq, thiserror::Error)]
    /// #[error("not found")]
    /// struct NotFound;
    ///
    /// async fn lookup(_request: Request) -> Result<&'static str, NotFound> {
    ///     Err(NotFound)
    /// }
    ///
    /// let errors = ErrorHandlerLayer::new(ClientErrors::new().with(NotFound));
    /// let router: Router = Router::new().route_service("/lookup", errors.handler(lookup));
    /// ```
    pub fn handler<F>(&self, f: F) -> ErrorHandler<ServiceFn<F>> {
        self.layer(service_fn(f))
    }

    /// Logs `error`, classifies it and builds the response sent in its place.
    ///
    /// An `anyhow::Error` is inspected through its own chain, which starts at
    /// the concrete error it was created from.
    pub fn handle_error<E>(&self, context: LogContext, error: E) -> Response
    where
        E: Into<BoxedError> + 'static,
    {
        if let Some(error) = (&error as &dyn Any).downcast_ref::<anyhow::Error>() {
            return self.respond(context, &**error);
        }

        let error: BoxedError = error.into();
        self.respond(context, &*error)
    }

    /// Classifies `error` against the configured client errors.
    #[must_use]
    pub fn classify(&self, error: &(dyn StdError + 'static)) -> ErrorClass {
        self.client_errors.classify(error)
    }

    fn respond(&self, context: LogContext, error: &(dyn StdError + 'static)) -> Response {
        let status = self.classify(error).status_code();
        let message = render_error_chain(error);

        match &self.logger {
            Some(logger) => logger.error(&context.with_status(status), &message),
            None => fallback::write_error(&message),
        }

        status_response(status)
    }
}

impl fmt::Debug for ErrorHandlerLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlerLayer")
            .field("logger", &self.has_logger())
            .field("context", &self.context)
            .field("request_id_header", &self.request_id_header)
            .field("client_errors", &self.client_errors)
            .finish()
    }
}

impl<S> Layer<S> for ErrorHandlerLayer {
    type Service = ErrorHandler<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorHandler {
            inner,
            handler: Arc::new(self.clone()),
        }
    }
}

/// Middleware that turns errors of the inner service into `400`/`500`
/// responses.
///
/// Each request is served by a [`HandleError`] whose error callback carries
/// the context of that request. Successful responses of the inner service are
/// returned untouched.
#[derive(Debug, Clone)]
pub struct ErrorHandler<S> {
    inner: S,
    handler: Arc<ErrorHandlerLayer>,
}

impl<S> ErrorHandler<S> {
    /// Wraps `inner` with the configuration of `layer`.
    pub fn new(inner: S, layer: &ErrorHandlerLayer) -> Self {
        layer.layer(inner)
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, B> Service<Request<B>> for ErrorHandler<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Response: IntoResponse + Send,
    S::Error: Into<BoxedError> + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
{
    type Error = Infallible;
    type Future = HandleErrorFuture;
    type Response = Response;

    #[inline]
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // `HandleError` drives readiness of the inner service per call.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let context = self
            .handler
            .context
            .for_request(&request, &self.handler.request_id_header);
        let handler = Arc::clone(&self.handler);

        let handle_error = move |error: S::Error| async move {
            handler.handle_error(context, error)
        };

        HandleError::<_, _, ()>::new(self.inner.clone(), handle_error).call(request)
    }
}
