//! Console session context
//!
//! The one explicit object owning everything a signed-in console
//! needs: the session store, the REST client, the current profile and
//! its derived capability set, the fleet state with its live channel,
//! the view router, and the per-view cache. Constructed at login (or
//! resume), torn down at logout; a 401 from any call funnels through
//! one handler that clears the session and terminates the context.

use crate::cache::{CacheKey, DataCache};
use crate::notify::{self, Notice, NoticeReceiver, NoticeSender};
use crate::router::{NavigateError, Navigation, ViewRouter};
use crate::views::{DashboardData, RolesData, ViewData, ViewId, ViewSpec};
use apiary_client::{
    ApiClient, ApiTransport, EditError, EditSession, FileStorage, HttpTransport, SessionStorage,
    SessionStore,
};
use apiary_core::types::{
    AttackLog, LogQuery, Node, NodeCreate, NodeHistory, Role, RoleCreate, RoleUpdate, UserCreate,
    UserPage, UserProfile, UserUpdate,
};
use apiary_core::{ApiError, CapabilitySet, ConsoleConfig};
use apiary_sync::{ChannelTransport, ConnectionState, FleetState, LiveNodeSync, WsTransport};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Assembles a [`ConsoleSession`], with seams for the transports
pub struct ConsoleBuilder {
    config: ConsoleConfig,
    storage: Option<Box<dyn SessionStorage>>,
    api_transport: Option<Arc<dyn ApiTransport>>,
    channel_transport: Option<Arc<dyn ChannelTransport>>,
}

impl ConsoleBuilder {
    /// Builder over a configuration
    #[inline]
    #[must_use]
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            config,
            storage: None,
            api_transport: None,
            channel_transport: None,
        }
    }

    /// With a session storage backend (defaults to the state file)
    #[inline]
    #[must_use]
    pub fn with_storage(mut self, storage: Box<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// With a REST transport (defaults to HTTP against the base URL)
    #[inline]
    #[must_use]
    pub fn with_api_transport(mut self, transport: Arc<dyn ApiTransport>) -> Self {
        self.api_transport = Some(transport);
        self
    }

    /// With a push-channel transport (defaults to WebSocket)
    #[inline]
    #[must_use]
    pub fn with_channel_transport(mut self, transport: Arc<dyn ChannelTransport>) -> Self {
        self.channel_transport = Some(transport);
        self
    }

    /// Exchange credentials for a live session context.
    ///
    /// On success the tokens are persisted, the remembered username is
    /// stored or cleared per `remember`, and the capability set is
    /// computed from the freshly fetched profile.
    ///
    /// # Errors
    /// - `ApiError::Validation` for rejected credentials
    /// - any transport-level failure
    pub async fn login(
        self,
        username: &str,
        password: &str,
        remember: bool,
    ) -> Result<(Arc<ConsoleSession>, NoticeReceiver), ApiError> {
        let (config, store, client, channel) = self.into_parts();
        let token = client.login(username, password).await?;
        store.set_session(token.access_token, token.refresh_token);
        store.remember_username(remember.then_some(username));
        let profile = client.me().await?;
        Ok(ConsoleSession::assemble(config, store, client, channel, profile))
    }

    /// Revive a session from persisted tokens.
    ///
    /// # Errors
    /// - `ApiError::AuthRequired` when no token is persisted
    /// - `ApiError::AuthExpired` when the backend rejects the token;
    ///   the persisted session is cleared
    pub async fn resume(self) -> Result<(Arc<ConsoleSession>, NoticeReceiver), ApiError> {
        let (config, store, client, channel) = self.into_parts();
        if !store.is_authenticated() {
            return Err(ApiError::AuthRequired);
        }
        let profile = match client.me().await {
            Ok(profile) => profile,
            Err(err) => {
                if err.is_auth_expired() {
                    store.clear();
                }
                return Err(err);
            }
        };
        Ok(ConsoleSession::assemble(config, store, client, channel, profile))
    }

    fn into_parts(
        self,
    ) -> (
        ConsoleConfig,
        Arc<SessionStore>,
        ApiClient,
        Arc<dyn ChannelTransport>,
    ) {
        let storage = self
            .storage
            .unwrap_or_else(|| Box::new(FileStorage::new(&self.config.state_file)));
        let store = SessionStore::open(storage);
        let api_transport = self
            .api_transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new(&self.config.api_base)));
        let channel = self
            .channel_transport
            .unwrap_or_else(|| Arc::new(WsTransport::new()));
        let client = ApiClient::new(api_transport, Arc::clone(&store));
        (self.config, store, client, channel)
    }
}

/// A signed-in console
pub struct ConsoleSession {
    config: ConsoleConfig,
    client: ApiClient,
    store: Arc<SessionStore>,
    profile: RwLock<UserProfile>,
    caps: RwLock<CapabilitySet>,
    fleet: Arc<FleetState>,
    live: LiveNodeSync,
    router: ViewRouter,
    cache: DataCache,
    notices: NoticeSender,
    terminated: AtomicBool,
}

impl ConsoleSession {
    fn assemble(
        config: ConsoleConfig,
        store: Arc<SessionStore>,
        client: ApiClient,
        channel: Arc<dyn ChannelTransport>,
        profile: UserProfile,
    ) -> (Arc<Self>, NoticeReceiver) {
        let caps = CapabilitySet::from_profile(&profile);
        let fleet = Arc::new(FleetState::new());
        let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();
        let live = LiveNodeSync::new(
            config.ws_url.clone(),
            config.reconnect_delay(),
            channel,
            Arc::clone(&fleet),
            alert_tx,
        );
        let cache = DataCache::new(config.cache_capacity, config.cache_ttl());
        let (notice_tx, notice_rx) = notify::channel();

        // Channel alerts surface as transient notices
        let alert_sink = notice_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = alert_rx.recv().await {
                if alert_sink
                    .send(Notice::warning(format!("node alert: {message}")))
                    .is_err()
                {
                    break;
                }
            }
        });

        tracing::info!(user = %profile.username, "console session started");
        let session = Arc::new(Self {
            config,
            client,
            store,
            profile: RwLock::new(profile),
            caps: RwLock::new(caps),
            fleet,
            live,
            router: ViewRouter::new(),
            cache,
            notices: notice_tx,
            terminated: AtomicBool::new(false),
        });
        (session, notice_rx)
    }

    // ---- session state ----

    /// The configuration this session runs under
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Copy of the last fetched profile
    #[inline]
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        self.profile.read().clone()
    }

    /// Copy of the current capability set
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.caps.read().clone()
    }

    /// The navigation state machine
    #[inline]
    #[must_use]
    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    /// Shared fleet state
    #[inline]
    #[must_use]
    pub fn fleet(&self) -> &Arc<FleetState> {
        &self.fleet
    }

    /// Push-channel connection state
    #[inline]
    #[must_use]
    pub fn live_state(&self) -> ConnectionState {
        self.live.state()
    }

    /// Whether the session has been torn down
    #[inline]
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Views the current capability set may enter
    #[must_use]
    pub fn navigable_views(&self) -> Vec<&'static ViewSpec> {
        crate::views::navigable(&self.caps.read())
    }

    /// Re-fetch the profile and recompute the capability set whole.
    ///
    /// # Errors
    /// - any backend failure; reported as a notice as well
    pub async fn refresh_profile(&self) -> Result<(), ApiError> {
        match self.fetch_profile().await {
            Ok(_) => Ok(()),
            Err(err) => {
                self.report(&err).await;
                Err(err)
            }
        }
    }

    /// End the session: close the channel, clear the credentials.
    ///
    /// Idempotent; a second call observes the same end state.
    pub async fn logout(&self) {
        self.end_session(Notice::info("signed out")).await;
    }

    // ---- navigation ----

    /// Navigate to a view, loading its data.
    ///
    /// Activation (active view, title) happens synchronously; the
    /// loader result is applied only if no newer navigation superseded
    /// this one. Loader failures surface as notices and an inline
    /// failure slot, never as a router crash.
    ///
    /// # Errors
    /// - `NavigateError::PermissionDenied` when the gate fails
    /// - `NavigateError::SessionEnded` after logout or expiry
    pub async fn navigate(&self, target: ViewId) -> Result<Navigation, NavigateError> {
        if self.is_terminated() {
            return Err(NavigateError::SessionEnded);
        }
        let caps = self.capabilities();
        let ticket = self.router.begin(target, &caps)?;
        let result = self.load_view(target).await;
        if let Err(err) = &result {
            self.report(err).await;
        }
        Ok(self.router.finish(ticket, result))
    }

    async fn load_view(&self, view: ViewId) -> Result<ViewData, ApiError> {
        match view {
            ViewId::Dashboard => {
                self.cached(CacheKey::of(view), self.load_dashboard()).await
            }
            ViewId::Users => {
                let limit = self.config.page_limit;
                let key = CacheKey::filtered(view, format!("limit={limit}"));
                self.cached(key, async move {
                    let page = self.client.list_users(0, limit, None, None).await?;
                    Ok(ViewData::Users(page))
                })
                .await
            }
            ViewId::Roles => self.cached(CacheKey::of(view), self.load_roles()).await,
            ViewId::Monitor => {
                // Never cached: the fleet is kept current by the
                // channel, and every entry re-runs the full refresh.
                self.refresh_nodes().await?;
                Ok(ViewData::Monitor(self.fleet.snapshot()))
            }
            ViewId::Stats => {
                self.cached(CacheKey::of(view), async {
                    Ok(ViewData::Stats(self.client.stats_charts().await?))
                })
                .await
            }
            ViewId::Traffic => {
                self.cached(CacheKey::of(view), async {
                    Ok(ViewData::Traffic(self.client.stats_traffic().await?))
                })
                .await
            }
            ViewId::Settings => {
                // Always fresh so a role change shows up immediately
                let profile = self.fetch_profile().await?;
                Ok(ViewData::Settings(profile))
            }
        }
    }

    async fn cached(
        &self,
        key: CacheKey,
        load: impl std::future::Future<Output = Result<ViewData, ApiError>>,
    ) -> Result<ViewData, ApiError> {
        if let Some(hit) = self.cache.get(&key).await {
            tracing::trace!(?key, "view served from cache");
            return Ok(hit);
        }
        let data = load.await?;
        self.cache.insert(key, data.clone()).await;
        Ok(data)
    }

    async fn load_dashboard(&self) -> Result<ViewData, ApiError> {
        // Headline tiles degrade to zero where this profile cannot
        // read the underlying listing; the dashboard itself is open.
        let total_users = match self.client.list_users(0, 1, None, None).await {
            Ok(page) => page.total,
            Err(ApiError::PermissionDenied(_)) => 0,
            Err(err) => return Err(err),
        };
        let total_attacks = match self.client.stats_summary().await {
            Ok(summary) => summary.total_count,
            Err(ApiError::PermissionDenied(_)) => 0,
            Err(err) => return Err(err),
        };
        self.refresh_nodes().await?;
        Ok(ViewData::Dashboard(DashboardData {
            total_users,
            total_nodes: self.fleet.len(),
            online_nodes: self.fleet.online_count(),
            total_attacks,
        }))
    }

    async fn load_roles(&self) -> Result<ViewData, ApiError> {
        let roles = self.client.list_roles().await?;
        // The catalog needs its own permission; without it the panel
        // still lists roles, just without grantable entries.
        let catalog = match self.client.list_permissions().await {
            Ok(catalog) => catalog,
            Err(ApiError::PermissionDenied(_)) => Vec::new(),
            Err(err) => return Err(err),
        };
        Ok(ViewData::Roles(RolesData { roles, catalog }))
    }

    // ---- entities ----

    /// Full node refresh: wholesale fleet replacement, and the sole
    /// path by which new nodes appear. Opportunistically (re)connects
    /// the push channel.
    pub async fn refresh_nodes(&self) -> Result<Vec<Node>, ApiError> {
        let nodes = self.client.list_nodes(None, None).await?;
        self.fleet.replace_all(nodes.clone());
        self.live.connect();
        Ok(nodes)
    }

    /// Search the user listing with filters; uncached.
    pub async fn search_users(
        &self,
        username: Option<&str>,
        status: Option<&str>,
    ) -> Result<UserPage, ApiError> {
        self.guarded(
            self.client
                .list_users(0, self.config.page_limit, username, status),
        )
        .await
    }

    /// Create a user account (unguarded: nothing to conflict with)
    pub async fn create_user(&self, user: &UserCreate) -> Result<UserProfile, ApiError> {
        let created = self.guarded(self.client.create_user(user)).await?;
        self.invalidate_user_views();
        let _ = self
            .notices
            .send(Notice::info(format!("user {} created", created.username)));
        Ok(created)
    }

    /// Submit a user edit under optimistic concurrency control.
    ///
    /// A stale rejection is surfaced as a distinct notice and error;
    /// it is never resubmitted with a refreshed version.
    ///
    /// # Errors
    /// - `EditError::Stale` when a concurrent edit won the version race
    /// - `EditError::Api` for every other failure
    pub async fn submit_user_edit(
        &self,
        edit: &EditSession<UserProfile>,
        update: UserUpdate,
    ) -> Result<UserProfile, EditError> {
        match self.client.submit_user_edit(edit, update).await {
            Ok(updated) => {
                self.invalidate_user_views();
                let _ = self
                    .notices
                    .send(Notice::info(format!("user {} updated", updated.username)));
                Ok(updated)
            }
            Err(EditError::Stale(detail)) => {
                let _ = self.notices.send(Notice::warning(format!(
                    "your copy is stale: {detail}; re-fetch and reapply"
                )));
                Err(EditError::Stale(detail))
            }
            Err(EditError::Api(err)) => {
                self.report(&err).await;
                Err(EditError::Api(err))
            }
        }
    }

    /// Delete a user account (unguarded)
    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        self.guarded(self.client.delete_user(id)).await?;
        self.invalidate_user_views();
        Ok(())
    }

    /// Create a role
    pub async fn create_role(&self, role: &RoleCreate) -> Result<Role, ApiError> {
        let created = self.guarded(self.client.create_role(role)).await?;
        self.cache.invalidate_view(ViewId::Roles);
        Ok(created)
    }

    /// Update a role (roles carry no version; unguarded by design)
    pub async fn update_role(&self, id: i64, update: &RoleUpdate) -> Result<Role, ApiError> {
        let updated = self.guarded(self.client.update_role(id, update)).await?;
        self.cache.invalidate_view(ViewId::Roles);
        Ok(updated)
    }

    /// Delete a role
    pub async fn delete_role(&self, id: i64) -> Result<(), ApiError> {
        self.guarded(self.client.delete_role(id)).await?;
        self.cache.invalidate_view(ViewId::Roles);
        Ok(())
    }

    /// Register a node with the fleet
    pub async fn register_node(&self, node: &NodeCreate) -> Result<Node, ApiError> {
        let created = self.guarded(self.client.create_node(node)).await?;
        self.cache.invalidate_view(ViewId::Dashboard);
        let _ = self
            .notices
            .send(Notice::info(format!("node {} registered", created.name)));
        Ok(created)
    }

    /// Remove a node from the fleet
    pub async fn remove_node(&self, id: i64) -> Result<(), ApiError> {
        self.guarded(self.client.delete_node(id)).await?;
        self.cache.invalidate_view(ViewId::Dashboard);
        Ok(())
    }

    /// Status history of one node
    pub async fn node_history(&self, id: i64, limit: u64) -> Result<Vec<NodeHistory>, ApiError> {
        self.guarded(self.client.node_history(id, limit)).await
    }

    /// Filtered honeypot log listing; always fresh
    pub async fn logs(&self, query: &LogQuery) -> Result<Vec<AttackLog>, ApiError> {
        self.guarded(self.client.logs(query)).await
    }

    // ---- plumbing ----

    /// Run a backend call, funneling its error through the notice and
    /// expiry handling exactly once.
    async fn guarded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        match call.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.report(&err).await;
                Err(err)
            }
        }
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let profile = self.client.me().await?;
        // Recomputed whole, never patched: prevents permission drift
        // when roles changed server-side since the last fetch.
        *self.caps.write() = CapabilitySet::from_profile(&profile);
        *self.profile.write() = profile.clone();
        Ok(profile)
    }

    fn invalidate_user_views(&self) {
        self.cache.invalidate_view(ViewId::Users);
        self.cache.invalidate_view(ViewId::Dashboard);
    }

    async fn report(&self, err: &ApiError) {
        if err.is_auth_expired() {
            self.end_session(Notice::warning("session expired, please sign in again"))
                .await;
            return;
        }
        let _ = self.notices.send(Notice::error(err.to_string()));
    }

    async fn end_session(&self, notice: Notice) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("console session ending");
        self.live.shutdown().await;
        self.store.clear();
        let _ = self.notices.send(notice);
    }
}

impl std::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("user", &self.profile.read().username)
            .field("active_view", &self.router.active())
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}
