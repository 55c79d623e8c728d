//! Transport seam for the REST surface
//!
//! The client is written against [`ApiTransport`] so the test
//! utilities can stand in a fake backend with real server-side
//! semantics. [`HttpTransport`] is the production implementation.

use apiary_core::ApiError;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Request body variants the backend accepts
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// One request against the REST surface, relative to the base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// GET request for a path
    #[inline]
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    /// POST request with a JSON body
    #[inline]
    #[must_use]
    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Json(body),
            bearer: None,
        }
    }

    /// POST request with a form-encoded body
    #[inline]
    #[must_use]
    pub fn post_form(path: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Form(fields),
            bearer: None,
        }
    }

    /// PUT request with a JSON body
    #[inline]
    #[must_use]
    pub fn put_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Json(body),
            bearer: None,
        }
    }

    /// DELETE request for a path
    #[inline]
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    /// With URL query pairs
    #[inline]
    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// With a bearer credential
    #[inline]
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Raw response: status plus decoded JSON body (`Null` when empty)
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Response with a JSON body
    #[inline]
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Bodyless response (e.g. 204)
    #[inline]
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: Value::Null,
        }
    }
}

/// Executes requests against a backend
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    /// - `ApiError::Network` for transport-level failures; HTTP error
    ///   statuses come back as an [`ApiResponse`], not an `Err`.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base: String,
    inner: reqwest::Client,
}

impl HttpTransport {
    /// Transport rooted at the given base URL
    #[inline]
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            inner: reqwest::Client::new(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            Method::Get => self.inner.get(&url),
            Method::Post => self.inner.post(&url),
            Method::Put => self.inner.put(&url),
            Method::Delete => self.inner.delete(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_tolerates_slashes() {
        let transport = HttpTransport::new("http://localhost:8001/api/v1/");
        assert_eq!(
            transport.url_for("/users/me"),
            "http://localhost:8001/api/v1/users/me"
        );
        assert_eq!(
            transport.url_for("auth/login"),
            "http://localhost:8001/api/v1/auth/login"
        );
    }

    #[test]
    fn request_builders_carry_bearer_and_query() {
        let request = ApiRequest::get("users/")
            .with_query(vec![("limit".to_string(), "10".to_string())])
            .with_bearer("tok");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.bearer.as_deref(), Some("tok"));
        assert_eq!(request.query.len(), 1);
    }
}
