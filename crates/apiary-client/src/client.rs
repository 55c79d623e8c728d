//! Typed client over the fleet backend's REST surface
//!
//! Injects the bearer credential from the session store into every
//! authenticated call and maps response statuses into the console
//! error taxonomy. The server-provided `detail` message is surfaced
//! verbatim for validation, permission, and conflict responses.

use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiTransport};
use apiary_core::types::{
    AttackLog, ChartBundle, LogQuery, Node, NodeCreate, NodeHistory, NodeStatus, Permission,
    RegisterRequest, Role, RoleCreate, RoleUpdate, StatsSummary, Token, TrafficPoint, UserCreate,
    UserPage, UserProfile, UserUpdate,
};
use apiary_core::ApiError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Typed REST client bound to one session store
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Client over the given transport and session
    #[inline]
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    /// The session store this client injects credentials from
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // ---- auth ----

    /// `POST /auth/login` with form-encoded credentials.
    ///
    /// The returned tokens are NOT stored here; the caller owns that
    /// decision (remember-me handling lives with the session context).
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, ApiError> {
        let request = ApiRequest::post_form(
            "auth/login",
            vec![
                ("username".to_string(), username.to_string()),
                ("password".to_string(), password.to_string()),
            ],
        );
        match self.send(request).await {
            Ok(body) => decode(body),
            // A 401 before any session exists is a credential failure,
            // not an expired session.
            Err(ApiError::AuthExpired) => Err(ApiError::Validation(
                "incorrect username or password".to_string(),
            )),
            Err(err) => Err(err),
        }
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        let body = encode(request)?;
        let response = self.send(ApiRequest::post_json("auth/register", body)).await?;
        decode(response)
    }

    /// `GET /users/me`
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let request = self.authed(ApiRequest::get("users/me"))?;
        decode(self.send(request).await?)
    }

    // ---- users ----

    /// `GET /users/` with pagination and optional filters
    pub async fn list_users(
        &self,
        skip: u64,
        limit: u64,
        username: Option<&str>,
        status: Option<&str>,
    ) -> Result<UserPage, ApiError> {
        let mut query = vec![
            ("skip".to_string(), skip.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(username) = username {
            query.push(("username".to_string(), username.to_string()));
        }
        if let Some(status) = status {
            query.push(("status".to_string(), status.to_string()));
        }
        let request = self.authed(ApiRequest::get("users/").with_query(query))?;
        decode(self.send(request).await?)
    }

    /// `POST /users/` (unguarded; no prior version exists)
    pub async fn create_user(&self, user: &UserCreate) -> Result<UserProfile, ApiError> {
        let body = encode(user)?;
        let request = self.authed(ApiRequest::post_json("users/", body))?;
        decode(self.send(request).await?)
    }

    /// `PUT /users/{id}`; the payload carries the baseline version and
    /// the server answers 409 when it no longer matches.
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<UserProfile, ApiError> {
        let body = encode(update)?;
        let request = self.authed(ApiRequest::put_json(format!("users/{id}"), body))?;
        decode(self.send(request).await?)
    }

    /// `DELETE /users/{id}` (unguarded)
    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let request = self.authed(ApiRequest::delete(format!("users/{id}")))?;
        self.send(request).await.map(|_| ())
    }

    // ---- roles ----

    /// `GET /roles/`
    pub async fn list_roles(&self) -> Result<Vec<Role>, ApiError> {
        let request = self.authed(ApiRequest::get("roles/"))?;
        decode(self.send(request).await?)
    }

    /// `GET /roles/{id}`
    pub async fn get_role(&self, id: i64) -> Result<Role, ApiError> {
        let request = self.authed(ApiRequest::get(format!("roles/{id}")))?;
        decode(self.send(request).await?)
    }

    /// `POST /roles/`
    pub async fn create_role(&self, role: &RoleCreate) -> Result<Role, ApiError> {
        let body = encode(role)?;
        let request = self.authed(ApiRequest::post_json("roles/", body))?;
        decode(self.send(request).await?)
    }

    /// `PUT /roles/{id}`
    pub async fn update_role(&self, id: i64, update: &RoleUpdate) -> Result<Role, ApiError> {
        let body = encode(update)?;
        let request = self.authed(ApiRequest::put_json(format!("roles/{id}"), body))?;
        decode(self.send(request).await?)
    }

    /// `DELETE /roles/{id}`
    pub async fn delete_role(&self, id: i64) -> Result<(), ApiError> {
        let request = self.authed(ApiRequest::delete(format!("roles/{id}")))?;
        self.send(request).await.map(|_| ())
    }

    /// `GET /roles/permissions/list`: the grantable permission catalog
    pub async fn list_permissions(&self) -> Result<Vec<Permission>, ApiError> {
        let request = self.authed(ApiRequest::get("roles/permissions/list"))?;
        decode(self.send(request).await?)
    }

    // ---- nodes ----

    /// `GET /nodes/` with optional group/status filters.
    ///
    /// This is the sole path by which new nodes enter local state; the
    /// push channel only carries deltas for known ids.
    pub async fn list_nodes(
        &self,
        group: Option<&str>,
        status: Option<NodeStatus>,
    ) -> Result<Vec<Node>, ApiError> {
        let mut query = Vec::new();
        if let Some(group) = group {
            query.push(("group".to_string(), group.to_string()));
        }
        if let Some(status) = status {
            let rendered = match status {
                NodeStatus::Online => "online",
                NodeStatus::Offline => "offline",
                NodeStatus::Warning => "warning",
                NodeStatus::Unknown => "unknown",
            };
            query.push(("status".to_string(), rendered.to_string()));
        }
        let request = self.authed(ApiRequest::get("nodes/").with_query(query))?;
        decode(self.send(request).await?)
    }

    /// `POST /nodes/`
    pub async fn create_node(&self, node: &NodeCreate) -> Result<Node, ApiError> {
        let body = encode(node)?;
        let request = self.authed(ApiRequest::post_json("nodes/", body))?;
        decode(self.send(request).await?)
    }

    /// `DELETE /nodes/{id}`
    pub async fn delete_node(&self, id: i64) -> Result<(), ApiError> {
        let request = self.authed(ApiRequest::delete(format!("nodes/{id}")))?;
        self.send(request).await.map(|_| ())
    }

    /// `GET /nodes/{id}/history`
    pub async fn node_history(&self, id: i64, limit: u64) -> Result<Vec<NodeHistory>, ApiError> {
        let request = self.authed(
            ApiRequest::get(format!("nodes/{id}/history"))
                .with_query(vec![("limit".to_string(), limit.to_string())]),
        )?;
        decode(self.send(request).await?)
    }

    // ---- data ----

    /// `GET /data/logs` with the given filter
    pub async fn logs(&self, query: &LogQuery) -> Result<Vec<AttackLog>, ApiError> {
        let request = self.authed(ApiRequest::get("data/logs").with_query(query.query_pairs()))?;
        decode(self.send(request).await?)
    }

    /// `GET /data/stats/charts`
    pub async fn stats_charts(&self) -> Result<ChartBundle, ApiError> {
        let request = self.authed(ApiRequest::get("data/stats/charts"))?;
        decode(self.send(request).await?)
    }

    /// `GET /data/stats/summary`
    pub async fn stats_summary(&self) -> Result<StatsSummary, ApiError> {
        let request = self.authed(ApiRequest::get("data/stats/summary"))?;
        decode(self.send(request).await?)
    }

    /// `GET /data/stats/traffic`
    pub async fn stats_traffic(&self) -> Result<Vec<TrafficPoint>, ApiError> {
        let request = self.authed(ApiRequest::get("data/stats/traffic"))?;
        decode(self.send(request).await?)
    }

    // ---- plumbing ----

    fn authed(&self, request: ApiRequest) -> Result<ApiRequest, ApiError> {
        let token = self.session.current_token().ok_or(ApiError::AuthRequired)?;
        Ok(request.with_bearer(token))
    }

    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.execute(request).await?;
        if (200..300).contains(&response.status) {
            return Ok(response.body);
        }
        let detail = detail_of(&response.body);
        tracing::debug!(?method, %path, status = response.status, %detail, "request rejected");
        Err(ApiError::from_status(response.status, detail))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}

fn encode<T: Serialize>(body: &T) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Extract the server's `detail` field, falling back to the raw body.
fn detail_of(body: &Value) -> String {
    match body.get("detail") {
        Some(Value::String(detail)) => detail.clone(),
        // 422 responses carry a structured detail list
        Some(other) => other.to_string(),
        None if body.is_null() => "no detail provided".to_string(),
        None => body.to_string(),
    }
}
