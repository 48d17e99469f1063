//! Correlation context attached to every log call.

use std::borrow::Cow;
use std::fmt;

use axum::http::{HeaderName, Method, Request, StatusCode};
use tower_http::request_id::RequestId;

/// Header read for request correlation when no [`RequestId`] extension is set.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation data written alongside a log message.
///
/// A middleware holds a base context (usually just the service name) and
/// derives a per-request context from it with [`LogContext::for_request`].
/// Deriving only reads from the request; nothing is consumed or rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    service: Option<Cow<'static, str>>,
    request_id: Option<String>,
    method: Option<Method>,
    path: Option<String>,
    status: Option<StatusCode>,
}

impl LogContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name reported with every message.
    #[must_use]
    pub fn with_service(self, service: impl Into<Cow<'static, str>>) -> Self {
        Self {
            service: Some(service.into()),
            ..self
        }
    }

    /// Sets the request id.
    #[must_use]
    pub fn with_request_id(self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..self
        }
    }

    /// Sets the status code of the response the middleware emits.
    #[must_use]
    pub fn with_status(self, status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }

    /// Derives the context of a single request.
    ///
    /// The request id is taken from the [`RequestId`] extension (set by
    /// `tower_http::request_id::SetRequestIdLayer`) and falls back to the
    /// `request_id_header` header. Non-UTF-8 ids are ignored.
    #[must_use]
    pub fn for_request<B>(&self, request: &Request<B>, request_id_header: &HeaderName) -> Self {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(RequestId::header_value)
            .or_else(|| request.headers().get(request_id_header))
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Self {
            service: self.service.clone(),
            request_id: request_id.or_else(|| self.request_id.clone()),
            method: Some(request.method().clone()),
            path: Some(request.uri().path().to_owned()),
            status: self.status,
        }
    }

    /// Returns the service name, if set.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Returns the request id, if known.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the request method, if known.
    #[must_use]
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Returns the request path, if known.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the response status, if set.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = "";
        let mut field = |f: &mut fmt::Formatter<'_>, key: &str, value: &dyn fmt::Display| {
            let result = write!(f, "{separator}{key}={value}");
            separator = " ";
            result
        };

        if let Some(service) = self.service() {
            field(f, "service", &service)?;
        }
        if let Some(request_id) = self.request_id() {
            field(f, "request_id", &request_id)?;
        }
        if let Some(method) = self.method() {
            field(f, "method", method)?;
        }
        if let Some(path) = self.path() {
            field(f, "path", &path)?;
        }
        if let Some(status) = self.status() {
            field(f, "status", &status.as_u16())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::HeaderValue;

    use super::*;

    fn header() -> HeaderName {
        HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER)
    }

    #[test]
    fn for_request_reads_method_path_and_header() -> anyhow::Result<()> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users/42?verbose=true")
            .header(DEFAULT_REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())?;

        let context = LogContext::new()
            .with_service("accounts")
            .for_request(&request, &header());

        assert_eq!(context.service(), Some("accounts"));
        assert_eq!(context.request_id(), Some("abc-123"));
        assert_eq!(context.method(), Some(&Method::POST));
        assert_eq!(context.path(), Some("/users/42"));
        assert_eq!(context.status(), None);
        Ok(())
    }

    #[test]
    fn for_request_prefers_request_id_extension() -> anyhow::Result<()> {
        let mut request = Request::builder()
            .uri("/")
            .header(DEFAULT_REQUEST_ID_HEADER, "from-header")
            .body(Body::empty())?;
        request
            .extensions_mut()
            .insert(RequestId::new(HeaderValue::from_static("from-extension")));

        let context = LogContext::new().for_request(&request, &header());
        assert_eq!(context.request_id(), Some("from-extension"));
        Ok(())
    }

    #[test]
    fn for_request_without_request_id() -> anyhow::Result<()> {
        let request = Request::builder().uri("/").body(Body::empty())?;
        let context = LogContext::new().for_request(&request, &header());
        assert_eq!(context.request_id(), None);
        Ok(())
    }

    #[test]
    fn display_lists_present_fields() {
        let context = LogContext::new()
            .with_service("accounts")
            .with_request_id("abc")
            .with_status(StatusCode::BAD_REQUEST);

        assert_eq!(
            context.to_string(),
            "service=accounts request_id=abc status=400"
        );
        assert_eq!(LogContext::new().to_string(), "");
    }
}
