//! Configuration for the safeguard middleware stack.

use std::time::Duration;

use axum::http::HeaderName;
use axum::http::header::InvalidHeaderName;
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{ErrorHandlerLayer, RecovererLayer};
use crate::ClientErrors;
use crate::logging::{DEFAULT_REQUEST_ID_HEADER, LogContext};

/// Error returned by [`MiddlewareConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The service name is set but blank.
    #[error("service name must not be empty")]
    EmptyServiceName,
    /// The request id header is not a valid header name.
    #[error("invalid request id header `{header}`")]
    InvalidRequestIdHeader {
        header: String,
        #[source]
        source: InvalidHeaderName,
    },
    /// The request timeout is zero.
    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,
}

/// Configuration for the recoverer and error handler middleware.
///
/// Both layers built from one configuration share the same log context and
/// request id header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
#[must_use = "config does nothing unless you use it"]
pub struct MiddlewareConfig {
    /// Name of the service, attached to every log record.
    #[cfg_attr(feature = "config", arg(long, env = "SERVICE_NAME"))]
    pub service_name: Option<String>,

    /// Header carrying the request id when no request id extension is present.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_ID_HEADER", default_value = DEFAULT_REQUEST_ID_HEADER)
    )]
    pub request_id_header: String,

    /// Maximum duration in seconds to wait for a request before answering
    /// with a server error.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_TIMEOUT", default_value = "30")
    )]
    pub request_timeout: u64,

    /// Writes failures to standard error instead of `tracing`.
    #[cfg_attr(feature = "config", arg(long, env = "LOG_TO_STDERR"))]
    pub log_to_stderr: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_owned(),
            request_timeout: 30,
            log_to_stderr: false,
        }
    }
}

impl MiddlewareConfig {
    /// Sets the service name.
    pub fn with_service_name(self, service_name: impl Into<String>) -> Self {
        Self {
            service_name: Some(service_name.into()),
            ..self
        }
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        Self {
            request_timeout: secs,
            ..self
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .service_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::EmptyServiceName);
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        self.request_id_header()?;
        Ok(())
    }

    /// Parses the configured request id header.
    pub fn request_id_header(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::try_from(self.request_id_header.as_str()).map_err(|source| {
            ConfigError::InvalidRequestIdHeader {
                header: self.request_id_header.clone(),
                source,
            }
        })
    }

    /// Returns the request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Returns the base log context for both layers.
    pub fn log_context(&self) -> LogContext {
        match &self.service_name {
            Some(name) => LogContext::new().with_service(name.clone()),
            None => LogContext::new(),
        }
    }

    /// Builds a [`RecovererLayer`] from this configuration.
    pub fn recoverer_layer(&self) -> Result<RecovererLayer, ConfigError> {
        self.validate()?;

        let layer = RecovererLayer::new()
            .with_context(self.log_context())
            .with_request_id_header(self.request_id_header()?);

        if self.log_to_stderr {
            return Ok(layer);
        }

        Ok(layer.with_tracing())
    }

    /// Builds an [`ErrorHandlerLayer`] answering `client_errors` with `400`.
    pub fn error_handler_layer(
        &self,
        client_errors: ClientErrors,
    ) -> Result<ErrorHandlerLayer, ConfigError> {
        self.validate()?;

        let layer = ErrorHandlerLayer::new(client_errors)
            .with_context(self.log_context())
            .with_request_id_header(self.request_id_header()?);

        if self.log_to_stderr {
            return Ok(layer);
        }

        Ok(layer.with_tracing())
    }
}
