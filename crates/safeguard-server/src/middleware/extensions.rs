//! Extension traits for `axum::Router` to apply the safeguard middleware.

use axum::Router;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::Route;
use tower::timeout::TimeoutLayer;
use tower::{Layer, Service, ServiceBuilder};

use super::{ConfigError, ErrorHandlerLayer, MiddlewareConfig, RecovererLayer};
use crate::{BoxedError, ClientErrors};

/// Extension trait for `axum::`[`Router`] for layering the safeguard
/// middleware.
pub trait RouterSafeguardExt<S>: Sized {
    /// Layers the [`Recoverer`] middleware over every route.
    ///
    /// [`Recoverer`]: super::Recoverer
    fn with_recoverer(self, recoverer: RecovererLayer) -> Self;

    /// Layers a fallible middleware `layer` over every route and turns its
    /// errors into `400`/`500` responses with the [`ErrorHandler`].
    ///
    /// [`ErrorHandler`]: super::ErrorHandler
    fn with_error_handler<L>(self, error_handler: ErrorHandlerLayer, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + Send + 'static,
        <L::Service as Service<Request>>::Error: Into<BoxedError> + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static;

    /// Layers [`Timeout`], [`ErrorHandler`] and [`Recoverer`] middlewares
    /// built from `config`.
    ///
    /// Timed out requests are answered with `500`, panics with `500`, and
    /// errors matching `client_errors` with `400`.
    ///
    /// [`Timeout`]: tower::timeout::TimeoutLayer
    /// [`ErrorHandler`]: super::ErrorHandler
    /// [`Recoverer`]: super::Recoverer
    fn with_safeguard(
        self,
        config: &MiddlewareConfig,
        client_errors: ClientErrors,
    ) -> Result<Self, ConfigError>;
}

impl<S> RouterSafeguardExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_recoverer(self, recoverer: RecovererLayer) -> Self {
        self.layer(recoverer)
    }

    fn with_error_handler<L>(self, error_handler: ErrorHandlerLayer, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + Send + 'static,
        <L::Service as Service<Request>>::Error: Into<BoxedError> + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        let middlewares = ServiceBuilder::new().layer(error_handler).layer(layer);
        self.layer(middlewares)
    }

    fn with_safeguard(
        self,
        config: &MiddlewareConfig,
        client_errors: ClientErrors,
    ) -> Result<Self, ConfigError> {
        let error_handler = config.error_handler_layer(client_errors)?;
        let recoverer = config.recoverer_layer()?;
        let timeout = TimeoutLayer::new(config.request_timeout());

        Ok(self
            .with_error_handler(error_handler, timeout)
            .with_recoverer(recoverer))
    }
}
