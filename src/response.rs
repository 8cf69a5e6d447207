use reqwest::{header::HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::{Result, ServiceError};

/// Fully-read response from the remote API.
///
/// Status codes are passed through untouched; use
/// [`ApiResponse::error_for_status`] to turn non-2xx into an error.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|err| ServiceError::Decode(format!("response body is not UTF-8: {err}")))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            ServiceError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                String::from_utf8_lossy(&self.body)
            ))
        })
    }

    /// Returns `self` for 2xx responses, otherwise [`ServiceError::Http`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ServiceError::Http {
            status: self.status.as_u16(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}
