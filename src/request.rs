use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method, Url,
};
use serde::Serialize;

use crate::{Result, ServiceError};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Body {
    /// Serialized JSON, sent with `Content-Type: application/json`.
    Json(Vec<u8>),
    Bytes(Vec<u8>),
}

/// Request to the remote API, relative to the client's base URL.
///
/// The payload is opaque to the client. Builder errors (bad header, body that
/// fails to serialize) are held until send time and reported as
/// [`ServiceError::InvalidRequest`] before any network attempt.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Body>,
    error: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(err), _) => self.record_error(format!("invalid header name '{name}': {err}")),
            (_, Err(err)) => self.record_error(format!("invalid value for header '{name}': {err}")),
        }
        self
    }

    /// Sets a JSON body, serialized once and reused by every attempt.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(Body::Json(bytes)),
            Err(err) => self.record_error(format!("body serialization failed: {err}")),
        }
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(bytes.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn payload(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Resolves the full URL against `base`, surfacing deferred builder errors.
    pub(crate) fn resolve(&self, base: &Url) -> Result<Url> {
        if let Some(err) = &self.error {
            return Err(ServiceError::InvalidRequest(err.clone()));
        }

        let mut url = base.clone();
        let relative = self.path.trim_start_matches('/');
        if !relative.is_empty() {
            let joined = format!("{}/{}", base.path().trim_end_matches('/'), relative);
            url.set_path(&joined);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }

    fn record_error(&mut self, message: String) {
        // first error wins
        if self.error.is_none() {
            self.error = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, Url};
    use serde_json::json;

    use super::{ApiRequest, Body};
    use crate::ServiceError;

    fn base() -> Url {
        Url::parse("https://api.example.com/v1/").expect("valid base")
    }

    #[test]
    fn resolves_path_under_base_prefix() {
        let url = ApiRequest::get("/items/42").resolve(&base()).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/items/42");

        let bare = Url::parse("https://api.example.com/v1").expect("valid base");
        let url = ApiRequest::get("items").resolve(&bare).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/items");
    }

    #[test]
    fn empty_path_targets_base_url() {
        let url = ApiRequest::get("").resolve(&base()).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/");
    }

    #[test]
    fn appends_query_pairs() {
        let url = ApiRequest::get("search")
            .query("q", "rust lang")
            .query("page", "2")
            .resolve(&base())
            .expect("url");
        assert_eq!(url.path(), "/v1/search");
        assert_eq!(url.query(), Some("q=rust+lang&page=2"));
    }

    #[test]
    fn invalid_header_is_reported_at_resolve() {
        let request = ApiRequest::get("items")
            .header("bad header", "x")
            .header("x-ok", "1");
        let err = request.resolve(&base()).expect_err("header must be rejected");
        match err {
            ServiceError::InvalidRequest(message) => assert!(message.contains("bad header")),
            other => panic!("expected invalid request, got {other:?}"),
        }
    }

    #[test]
    fn json_body_is_serialized_once() {
        let request = ApiRequest::post("items").json(&json!({"name": "Kit"}));
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(
            request.payload(),
            Some(&Body::Json(br#"{"name":"Kit"}"#.to_vec()))
        );
    }

    #[test]
    fn json_body_keeps_struct_field_order() {
        #[derive(serde::Serialize)]
        struct Ordered {
            zeta: u8,
            alpha: u8,
        }

        let request = ApiRequest::put("items/1").json(&Ordered { zeta: 1, alpha: 2 });
        assert_eq!(
            request.payload(),
            Some(&Body::Json(br#"{"zeta":1,"alpha":2}"#.to_vec()))
        );
    }

    #[test]
    fn headers_accumulate() {
        let request = ApiRequest::get("items")
            .header("x-trace", "a")
            .header("x-trace", "b");
        assert_eq!(request.headers().get_all("x-trace").iter().count(), 2);
    }
}
