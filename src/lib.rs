//! `steady-http` is a resilient HTTP client core for a single remote API.
//!
//! A [`ServiceClient`] owns one pooled transport and:
//! - bounds attempts in flight with a fixed-size concurrency limiter
//! - gives every attempt its own timeout and retries only timeouts, with a fixed delay
//! - honors caller deadlines and cancellation via [`CallContext`]
//! - fails fast once disabled or closed
//!
//! ```no_run
//! use steady_http::{ApiRequest, ClientConfig, ServiceClient};
//!
//! # async fn run() -> steady_http::Result<()> {
//! let client = ServiceClient::new(ClientConfig::new(true, "https://api.example.com/v1", "key"))?;
//! let response = client.send(ApiRequest::get("status")).await?;
//! println!("{}", response.status);
//! client.close();
//! # Ok(())
//! # }
//! ```

mod classify;
mod client;
mod config;
mod context;
mod error;
mod limiter;
mod options;
mod request;
mod response;
mod retry;
mod transport;

pub use classify::is_transient;
pub use client::{ClientBuilder, ServiceClient};
pub use config::ClientConfig;
pub use context::CallContext;
pub use error::{CancelCause, ErrorKind, ServiceError};
pub use options::{ClientOptions, PoolOptions, RetryPolicy};
pub use request::ApiRequest;
pub use response::ApiResponse;

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, ServiceError>;
