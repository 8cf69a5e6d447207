use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{Instrument, Span};

use crate::{
    limiter::ConcurrencyLimiter, retry::run_with_retry, transport::PooledTransport, ApiRequest,
    ApiResponse, CallContext, ClientConfig, ClientOptions, Result, ServiceError,
};

/// Long-lived handle to one remote API.
///
/// Clones share the same connection pool, concurrency limiter and closed
/// latch, so a clone can be handed to each task that needs to send.
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<Inner>,
}

struct Inner {
    enabled: bool,
    base_url: Option<Url>,
    authorization: Option<String>,
    options: ClientOptions,
    closed: AtomicBool,
    transport: RwLock<Option<Arc<PooledTransport>>>,
    limiter: ConcurrencyLimiter,
    span: Span,
}

impl Inner {
    /// Hands out the shared pool, or `Closed` once it has been released.
    fn transport(&self) -> Result<Arc<PooledTransport>> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ServiceError::Closed)
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("enabled", &self.inner.enabled)
            .field("closed", &self.is_closed())
            .field("base_url", &self.inner.base_url.as_ref().map(Url::as_str))
            .field("authorization", &"<redacted>")
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Builder for [`ServiceClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
    options: ClientOptions,
    span: Option<Span>,
}

impl ClientBuilder {
    /// Applies retry, timeout and pool options.
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Span that every event emitted by the client is recorded under.
    ///
    /// Defaults to an `info` span named `service_client` carrying the base URL
    /// (empty for a disabled client without one).
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Validates the configuration and builds the pooled transport.
    ///
    /// The base URL is only required when the client is enabled; a disabled
    /// client keeps it if it parses and otherwise has none.
    pub fn build(self) -> Result<ServiceClient> {
        self.options.validate()?;
        let base_url = if self.config.enabled {
            Some(self.config.parsed_base_url()?)
        } else {
            self.config.parsed_base_url().ok()
        };
        let transport =
            PooledTransport::build(&self.options.pool, self.options.retry.request_timeout())?;
        let span = self.span.unwrap_or_else(|| {
            let url = base_url.as_ref().map_or("", Url::as_str);
            tracing::info_span!("service_client", base_url = url)
        });

        span.in_scope(|| {
            tracing::info!(
                enabled = self.config.enabled,
                max_concurrent_requests = self.options.retry.max_concurrent_requests,
                max_retries = self.options.retry.max_retries,
                request_timeout_ms = self.options.retry.request_timeout_ms,
                "client ready"
            );
        });

        Ok(ServiceClient {
            inner: Arc::new(Inner {
                enabled: self.config.enabled,
                base_url,
                authorization: authorization_value(&self.config.api_key),
                limiter: ConcurrencyLimiter::new(self.options.retry.max_concurrent_requests),
                options: self.options,
                closed: AtomicBool::new(false),
                transport: RwLock::new(Some(Arc::new(transport))),
                span,
            }),
        })
    }
}

impl ServiceClient {
    /// Creates a client with default options.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            options: ClientOptions::default(),
            span: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// `None` only for a disabled client built without a usable URL.
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Concurrency slots currently free.
    pub fn available_slots(&self) -> usize {
        self.inner.limiter.available()
    }

    /// Sends a request with retries. Each attempt is bounded by the policy's
    /// `request_timeout`; there is no overall deadline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send_with(request, &CallContext::new()).await
    }

    /// Sends a request with retries under the caller's deadline and cancellation.
    ///
    /// Fails without I/O when the client is closed or disabled. Only timeouts
    /// are retried; the response status is returned as-is.
    pub async fn send_with(&self, request: ApiRequest, ctx: &CallContext) -> Result<ApiResponse> {
        let inner = &*self.inner;
        async move {
            if inner.closed.load(Ordering::Acquire) {
                return Err(ServiceError::Closed);
            }
            if !inner.enabled {
                return Err(ServiceError::Disabled);
            }

            let base_url = inner.base_url.as_ref().ok_or(ServiceError::Disabled)?;
            let url = request.resolve(base_url)?;
            tracing::debug!(method = %request.method(), %url, "sending request");

            let (url, request) = (&url, &request);
            run_with_retry(&inner.options.retry, &inner.limiter, ctx, |n| async move {
                // the latch is checked again here so no retry starts after close()
                let transport = inner.transport()?;
                let prepared = transport.prepare(url, request, inner.authorization.as_deref())?;
                tracing::debug!(attempt = n + 1, "attempt started");
                transport.execute(prepared).await
            })
            .await
        }
        .instrument(inner.span.clone())
        .await
    }

    /// Sends a request and decodes a 2xx JSON body.
    ///
    /// Non-success statuses become [`ServiceError::Http`] and are not retried.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.error_for_status()?.json()
    }

    /// Shuts the client down.
    ///
    /// Subsequent sends fail with [`ServiceError::Closed`], as do sends still
    /// queued for a slot. Attempts already in flight run to completion and the
    /// pool is released when the last of them finishes. Calling `close` again
    /// is a no-op.
    pub fn close(&self) {
        let inner = &*self.inner;
        let mut transport = inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if inner.closed.swap(true, Ordering::AcqRel) {
            inner
                .span
                .in_scope(|| tracing::debug!("close called on closed client"));
            return;
        }
        transport.take();
        inner.limiter.close();
        inner.span.in_scope(|| tracing::info!("client closed"));
    }
}

/// Bearer authorization for `api_key`; `None` when the key is blank.
///
/// An existing `Bearer ` prefix is kept as-is.
fn authorization_value(api_key: &str) -> Option<String> {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        return None;
    }
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        Some(trimmed.to_owned())
    } else {
        Some(format!("Bearer {trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{authorization_value, ServiceClient};
    use crate::{ClientConfig, ClientOptions, ServiceError};

    #[test]
    fn authorization_adds_prefix_when_missing() {
        assert_eq!(
            authorization_value("abc123"),
            Some("Bearer abc123".to_owned())
        );
    }

    #[test]
    fn authorization_keeps_existing_prefix() {
        assert_eq!(
            authorization_value("bEaReR abc123"),
            Some("bEaReR abc123".to_owned())
        );
    }

    #[test]
    fn blank_key_sends_no_authorization() {
        assert_eq!(authorization_value("   "), None);
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let client = ServiceClient::new(ClientConfig::new(
            true,
            "https://api.example.com",
            "secret-token",
        ))
        .expect("client must build");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn build_rejects_invalid_base_url_and_options() {
        let err = ServiceClient::new(ClientConfig::new(true, "not a url", ""))
            .expect_err("url must be rejected");
        assert!(matches!(err, ServiceError::Config(_)));

        let mut options = ClientOptions::default();
        options.pool.max_connections_per_host = 1;
        let err = ServiceClient::builder(ClientConfig::new(true, "https://api.example.com", ""))
            .options(options)
            .build()
            .expect_err("starved pool must be rejected");
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[tokio::test]
    async fn disabled_client_builds_without_base_url() {
        let client = ServiceClient::new(ClientConfig::default()).expect("client must build");
        assert!(!client.is_enabled());
        assert!(client.base_url().is_none());
        assert!(matches!(
            client.send(crate::ApiRequest::get("status")).await,
            Err(ServiceError::Disabled)
        ));

        // a disabled client tolerates a bad URL too; enabling it would not
        let client = ServiceClient::new(ClientConfig::new(false, "not a url", ""))
            .expect("client must build");
        assert!(client.base_url().is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let client = ServiceClient::new(ClientConfig::new(true, "https://api.example.com", ""))
            .expect("client must build");
        let clone = client.clone();
        assert!(!client.is_closed());
        client.close();
        clone.close();
        assert!(client.is_closed());
        assert!(clone.is_closed());
    }

    #[tokio::test]
    async fn closed_and_disabled_fail_before_any_io() {
        // nothing listens on port 9; reaching the network would surface a transport error
        let disabled = ServiceClient::new(ClientConfig::new(false, "http://127.0.0.1:9", ""))
            .expect("client must build");
        assert!(!disabled.is_enabled());
        assert!(matches!(
            disabled.send(crate::ApiRequest::get("")).await,
            Err(ServiceError::Disabled)
        ));

        disabled.close();
        assert!(matches!(
            disabled.send(crate::ApiRequest::get("")).await,
            Err(ServiceError::Closed)
        ));
    }
}
