//! Pooled HTTP transport shared by every attempt of one client.

use std::time::Duration;

use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Url,
};

use crate::{
    request::{ApiRequest, Body},
    ApiResponse, PoolOptions, Result, ServiceError,
};

/// One `reqwest` connection pool, built once and never reconfigured.
///
/// Proxies are taken from the ambient environment (`HTTP_PROXY`,
/// `HTTPS_PROXY`, `NO_PROXY`), which is reqwest's default behavior.
#[derive(Debug)]
pub(crate) struct PooledTransport {
    http: reqwest::Client,
}

impl PooledTransport {
    pub(crate) fn build(pool: &PoolOptions, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(pool.connect_timeout())
            .tcp_keepalive(pool.tcp_keepalive())
            .pool_idle_timeout(pool.idle_timeout())
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .timeout(request_timeout)
            .build()
            .map_err(|err| ServiceError::Config(format!("failed to build HTTP transport: {err}")))?;
        Ok(Self { http })
    }

    /// Builds the wire request for one attempt.
    pub(crate) fn prepare(
        &self,
        url: &Url,
        request: &ApiRequest,
        authorization: Option<&str>,
    ) -> Result<reqwest::Request> {
        let mut builder = self
            .http
            .request(request.method().clone(), url.clone())
            .headers(request.headers().clone());
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        builder = match request.payload() {
            Some(Body::Json(bytes)) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            Some(Body::Bytes(bytes)) => builder.body(bytes.clone()),
            None => builder,
        };
        builder
            .build()
            .map_err(|err| ServiceError::InvalidRequest(err.to_string()))
    }

    /// Sends the request and reads the whole body.
    pub(crate) async fn execute(&self, request: reqwest::Request) -> Result<ApiResponse> {
        let response = self
            .http
            .execute(request)
            .await
            .map_err(ServiceError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(ServiceError::Transport)?
            .to_vec();
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
