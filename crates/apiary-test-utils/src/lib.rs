//! Testing utilities for the Apiary workspace
//!
//! Shared fixtures plus an in-memory fake backend speaking the real
//! wire protocol, including server-side optimistic-concurrency
//! semantics, so client and console scenarios run without a network.

#![allow(missing_docs)]

use apiary_client::{ApiRequest, ApiResponse, ApiTransport, Method, RequestBody};
use apiary_core::types::{
    Node, NodeStatus, Permission, Role, UserProfile, UserStatus, UserUpdate,
};
use apiary_core::{ApiError, SUPER_ADMIN_CODE};
use apiary_sync::{ChannelError, ChannelTransport, MessageStream};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Fixed timestamp used by every fixture
#[must_use]
pub fn timestamp() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Permission fixture
#[must_use]
pub fn permission(id: i64, code: &str) -> Permission {
    Permission {
        id,
        code: code.to_string(),
        resource_type: code.split(':').next().map(str::to_string),
        description: None,
    }
}

/// Role fixture granting the given permission codes
#[must_use]
pub fn role(id: i64, code: &str, permission_codes: &[&str]) -> Role {
    Role {
        id,
        name: code.replace('_', " "),
        code: code.to_string(),
        description: None,
        permissions: permission_codes
            .iter()
            .enumerate()
            .map(|(i, code)| permission(id * 100 + i as i64, code))
            .collect(),
    }
}

/// The distinguished all-access role
#[must_use]
pub fn super_admin_role() -> Role {
    role(1, SUPER_ADMIN_CODE, &[])
}

/// Profile fixture at version 1
#[must_use]
pub fn profile(id: i64, username: &str, roles: Vec<Role>) -> UserProfile {
    UserProfile {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        status: UserStatus::Active,
        version: 1,
        deleted: false,
        create_time: timestamp(),
        update_time: timestamp(),
        roles,
    }
}

/// Node fixture, online with idle CPU
#[must_use]
pub fn node(id: i64, name: &str) -> Node {
    Node {
        id,
        name: name.to_string(),
        ip_address: format!("10.0.0.{id}"),
        port: 2222,
        description: None,
        group: "default".to_string(),
        is_active: true,
        status: NodeStatus::Online,
        cpu_usage: 5.0,
        cpu_usage_detail: None,
        last_seen: Some(timestamp()),
        create_time: timestamp(),
        update_time: timestamp(),
    }
}

/// Channel transport whose connection opens and then stays silent;
/// keeps console scenarios off the network
#[derive(Debug, Default)]
pub struct SilentChannel;

#[async_trait]
impl ChannelTransport for SilentChannel {
    async fn open(&self, _url: &str) -> Result<MessageStream, ChannelError> {
        Ok(futures::stream::pending().boxed())
    }
}

/// In-memory backend implementing the REST surface the client speaks.
///
/// Holds real server-side state: credentials, minted tokens, users
/// with version counters (updates compare the submitted baseline and
/// answer 409 on mismatch), roles, the permission catalog, and nodes.
pub struct FakeBackend {
    credentials: Mutex<HashMap<String, String>>,
    tokens: Mutex<HashMap<String, String>>,
    users: Mutex<HashMap<i64, UserProfile>>,
    roles: Mutex<HashMap<i64, Role>>,
    catalog: Mutex<Vec<Permission>>,
    nodes: Mutex<HashMap<i64, Node>>,
    next_id: AtomicI64,
    next_token: AtomicI64,
    latency: Mutex<Vec<(String, Duration)>>,
    denied: Mutex<Vec<String>>,
    requests: Mutex<Vec<(Method, String)>>,
    attack_total: AtomicI64,
}

impl FakeBackend {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            credentials: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            roles: Mutex::new(HashMap::new()),
            catalog: Mutex::new(Vec::new()),
            nodes: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1000),
            next_token: AtomicI64::new(1),
            latency: Mutex::new(Vec::new()),
            denied: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            attack_total: AtomicI64::new(0),
        }
    }

    // ---- seeding ----

    pub fn seed_user(&self, profile: UserProfile, password: &str) {
        self.credentials
            .lock()
            .insert(profile.username.clone(), password.to_string());
        self.users.lock().insert(profile.id, profile);
    }

    pub fn seed_role(&self, role: Role) {
        self.roles.lock().insert(role.id, role);
    }

    pub fn seed_catalog(&self, permissions: Vec<Permission>) {
        *self.catalog.lock() = permissions;
    }

    pub fn seed_node(&self, node: Node) {
        self.nodes.lock().insert(node.id, node);
    }

    pub fn seed_attack_total(&self, total: i64) {
        self.attack_total.store(total, Ordering::SeqCst);
    }

    /// Inject latency for every path starting with `prefix`
    pub fn with_latency(&self, prefix: &str, delay: Duration) {
        self.latency.lock().push((prefix.to_string(), delay));
    }

    /// Answer 403 for every path starting with `prefix`
    pub fn deny_path(&self, prefix: &str) {
        self.denied.lock().push(prefix.to_string());
    }

    /// Invalidate every minted token; the next authenticated call
    /// observes a 401
    pub fn expire_sessions(&self) {
        self.tokens.lock().clear();
    }

    // ---- inspection ----

    /// Server-side copy of one user
    #[must_use]
    pub fn user(&self, id: i64) -> Option<UserProfile> {
        self.users.lock().get(&id).cloned()
    }

    /// How many requests hit paths starting with `prefix`
    #[must_use]
    pub fn count_requests(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(_, path)| path.starts_with(prefix))
            .count()
    }

    // ---- routing ----

    fn authenticate(&self, request: &ApiRequest) -> Result<String, ApiResponse> {
        let Some(token) = &request.bearer else {
            return Err(detail_response(401, "Not authenticated"));
        };
        match self.tokens.lock().get(token) {
            Some(username) => Ok(username.clone()),
            None => Err(detail_response(401, "Could not validate credentials")),
        }
    }

    fn login(&self, body: &RequestBody) -> ApiResponse {
        let RequestBody::Form(fields) = body else {
            return detail_response(422, "expected form body");
        };
        let field = |name: &str| {
            fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        };
        let username = field("username");
        let password = field("password");
        let valid = self
            .credentials
            .lock()
            .get(&username)
            .is_some_and(|stored| *stored == password);
        if !valid {
            return detail_response(401, "Incorrect username or password");
        }
        let serial = self.next_token.fetch_add(1, Ordering::SeqCst);
        let access = format!("access-{serial}");
        self.tokens.lock().insert(access.clone(), username);
        ApiResponse::json(
            200,
            json!({
                "access_token": access,
                "refresh_token": format!("refresh-{serial}"),
                "token_type": "bearer",
            }),
        )
    }

    fn register(&self, body: &RequestBody) -> ApiResponse {
        let RequestBody::Json(value) = body else {
            return detail_response(422, "expected json body");
        };
        let username = value["username"].as_str().unwrap_or_default().to_string();
        let email = value["email"].as_str().unwrap_or_default().to_string();
        let password = value["password"].as_str().unwrap_or_default().to_string();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return detail_response(422, "missing required field");
        }
        let mut users = self.users.lock();
        if users.values().any(|user| user.username == username) {
            return detail_response(409, "Username already registered");
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut created = profile(id, &username, Vec::new());
        created.email = email;
        users.insert(id, created.clone());
        drop(users);
        self.credentials.lock().insert(username, password);
        encode(201, &created)
    }

    fn list_users(&self, query: &[(String, String)]) -> ApiResponse {
        let skip = query_u64(query, "skip").unwrap_or(0) as usize;
        let limit = query_u64(query, "limit").unwrap_or(100) as usize;
        let users = self.users.lock();
        let mut items: Vec<&UserProfile> = users.values().filter(|user| !user.deleted).collect();
        items.sort_by_key(|user| user.id);
        let total = items.len() as u64;
        let page: Vec<&UserProfile> = items.into_iter().skip(skip).take(limit).collect();
        ApiResponse::json(
            200,
            json!({
                "total": total,
                "items": page,
            }),
        )
    }

    fn create_user(&self, body: &RequestBody) -> ApiResponse {
        let RequestBody::Json(value) = body else {
            return detail_response(422, "expected json body");
        };
        let username = value["username"].as_str().unwrap_or_default().to_string();
        let mut users = self.users.lock();
        if users.values().any(|user| user.username == username) {
            return detail_response(400, "Username already registered");
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut created = profile(id, &username, Vec::new());
        if let Some(email) = value["email"].as_str() {
            created.email = email.to_string();
        }
        created.roles = self.resolve_roles(value.get("role_ids"));
        users.insert(id, created.clone());
        encode(201, &created)
    }

    fn update_user(&self, id: i64, body: &RequestBody) -> ApiResponse {
        let RequestBody::Json(value) = body else {
            return detail_response(422, "expected json body");
        };
        let update: UserUpdate = match serde_json::from_value(value.clone()) {
            Ok(update) => update,
            Err(err) => return detail_response(422, &err.to_string()),
        };
        let resolved_roles = value
            .get("role_ids")
            .map(|ids| self.resolve_roles(Some(ids)));
        let mut users = self.users.lock();
        let Some(stored) = users.get_mut(&id) else {
            return detail_response(404, "User not found");
        };
        // The optimistic-concurrency comparison: the submitted baseline
        // must match stored state exactly, or nothing changes.
        if stored.version != update.version {
            return detail_response(409, "Conflict: Data has been modified by another user");
        }
        if let Some(email) = update.email {
            stored.email = email;
        }
        if let Some(status) = update.status {
            stored.status = status;
        }
        if let Some(roles) = resolved_roles {
            stored.roles = roles;
        }
        stored.version += 1;
        stored.update_time = timestamp();
        let updated = stored.clone();
        encode(200, &updated)
    }

    fn resolve_roles(&self, ids: Option<&Value>) -> Vec<Role> {
        let roles = self.roles.lock();
        ids.and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_i64)
                    .filter_map(|id| roles.get(&id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn list_nodes(&self) -> ApiResponse {
        let nodes = self.nodes.lock();
        let mut items: Vec<&Node> = nodes.values().collect();
        items.sort_by_key(|node| node.id);
        encode(200, &items)
    }

    fn create_node(&self, body: &RequestBody) -> ApiResponse {
        let RequestBody::Json(value) = body else {
            return detail_response(422, "expected json body");
        };
        let ip = value["ip_address"].as_str().unwrap_or_default().to_string();
        let mut nodes = self.nodes.lock();
        if nodes.values().any(|node| node.ip_address == ip) {
            return detail_response(400, "Node with this IP already exists");
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut created = node(id, value["name"].as_str().unwrap_or("unnamed"));
        created.ip_address = ip;
        created.status = NodeStatus::Offline;
        created.cpu_usage = 0.0;
        created.last_seen = None;
        nodes.insert(id, created.clone());
        encode(201, &created)
    }

    fn stats_summary(&self) -> ApiResponse {
        ApiResponse::json(
            200,
            json!({
                "total_count": self.attack_total.load(Ordering::SeqCst),
                "most_login_ip": {"name": "203.0.113.9", "value": 40},
                "most_login_user": {"name": "root", "value": 31},
                "most_login_pwd": {"name": "123456", "value": 27},
            }),
        )
    }

    fn stats_charts(&self) -> ApiResponse {
        ApiResponse::json(
            200,
            json!({
                "top_ips": [{"name": "203.0.113.9", "value": 40}],
                "top_usernames": [{"name": "root", "value": 31}],
                "top_passwords": [{"name": "123456", "value": 27}],
            }),
        )
    }

    fn stats_traffic(&self) -> ApiResponse {
        ApiResponse::json(
            200,
            json!([
                {"timestamp": "2026-01-01T10:00:00", "count": 12},
                {"timestamp": "2026-01-01T11:00:00", "count": 30},
            ]),
        )
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiTransport for FakeBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let delays: Vec<Duration> = self
            .latency
            .lock()
            .iter()
            .filter(|(prefix, _)| request.path.starts_with(prefix.as_str()))
            .map(|(_, delay)| *delay)
            .collect();
        for delay in delays {
            tokio::time::sleep(delay).await;
        }

        self.requests
            .lock()
            .push((request.method, request.path.clone()));

        let path = request.path.trim_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').collect();

        // Unauthenticated surface
        match (request.method, segments.as_slice()) {
            (Method::Post, ["auth", "login"]) => return Ok(self.login(&request.body)),
            (Method::Post, ["auth", "register"]) => return Ok(self.register(&request.body)),
            _ => {}
        }

        if let Err(denied) = self.authenticate(&request) {
            return Ok(denied);
        }
        if self
            .denied
            .lock()
            .iter()
            .any(|prefix| request.path.trim_start_matches('/').starts_with(prefix.as_str()))
        {
            return Ok(detail_response(403, "Operation not permitted"));
        }

        let response = match (request.method, segments.as_slice()) {
            (Method::Get, ["users", "me"]) => {
                // Token already validated; map it back to its profile
                let username = self
                    .tokens
                    .lock()
                    .get(request.bearer.as_deref().unwrap_or_default())
                    .cloned()
                    .unwrap_or_default();
                let users = self.users.lock();
                match users.values().find(|user| user.username == username) {
                    Some(me) => encode(200, me),
                    None => detail_response(404, "User not found"),
                }
            }
            (Method::Get, ["users"]) => self.list_users(&request.query),
            (Method::Post, ["users"]) => self.create_user(&request.body),
            (Method::Put, ["users", id]) => match id.parse::<i64>() {
                Ok(id) => self.update_user(id, &request.body),
                Err(_) => detail_response(422, "invalid id"),
            },
            (Method::Delete, ["users", id]) => match id.parse::<i64>() {
                Ok(id) => {
                    if self.users.lock().remove(&id).is_some() {
                        ApiResponse::empty(204)
                    } else {
                        detail_response(404, "User not found")
                    }
                }
                Err(_) => detail_response(422, "invalid id"),
            },
            (Method::Get, ["roles"]) => {
                let roles = self.roles.lock();
                let mut items: Vec<&Role> = roles.values().collect();
                items.sort_by_key(|role| role.id);
                encode(200, &items)
            }
            (Method::Get, ["roles", "permissions", "list"]) => encode(200, &*self.catalog.lock()),
            (Method::Get, ["roles", id]) => match id.parse::<i64>() {
                Ok(id) => match self.roles.lock().get(&id) {
                    Some(role) => encode(200, role),
                    None => detail_response(404, "Role not found"),
                },
                Err(_) => detail_response(422, "invalid id"),
            },
            (Method::Get, ["nodes"]) => self.list_nodes(),
            (Method::Post, ["nodes"]) => self.create_node(&request.body),
            (Method::Delete, ["nodes", id]) => match id.parse::<i64>() {
                Ok(id) => {
                    if self.nodes.lock().remove(&id).is_some() {
                        ApiResponse::empty(204)
                    } else {
                        detail_response(404, "Node not found")
                    }
                }
                Err(_) => detail_response(422, "invalid id"),
            },
            (Method::Get, ["nodes", _, "history"]) => ApiResponse::json(200, json!([])),
            (Method::Get, ["data", "logs"]) => ApiResponse::json(200, json!([])),
            (Method::Get, ["data", "stats", "summary"]) => self.stats_summary(),
            (Method::Get, ["data", "stats", "charts"]) => self.stats_charts(),
            (Method::Get, ["data", "stats", "traffic"]) => self.stats_traffic(),
            _ => detail_response(404, "Resource not found"),
        };
        Ok(response)
    }
}

fn detail_response(status: u16, detail: &str) -> ApiResponse {
    ApiResponse::json(status, json!({ "detail": detail }))
}

fn encode<T: serde::Serialize>(status: u16, body: &T) -> ApiResponse {
    match serde_json::to_value(body) {
        Ok(value) => ApiResponse::json(status, value),
        Err(err) => detail_response(500, &err.to_string()),
    }
}

fn query_u64(query: &[(String, String)], name: &str) -> Option<u64> {
    query
        .iter()
        .find(|(key, _)| key == name)
        .and_then(|(_, value)| value.parse().ok())
}
