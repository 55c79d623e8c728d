//! End-to-end console scenarios against the fake backend

use apiary_client::{ApiTransport, MemoryStorage};
use apiary_console::{
    ConsoleBuilder, ConsoleSession, LoadState, NavigateError, Navigation, NoticeLevel,
    NoticeReceiver, ViewData, ViewId,
};
use apiary_core::types::UserCreate;
use apiary_core::ConsoleConfig;
use apiary_sync::{ChannelTransport, ConnectionState};
use apiary_test_utils::{node, profile, role, FakeBackend, SilentChannel};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn seeded_backend() -> Arc<FakeBackend> {
    let backend = Arc::new(FakeBackend::new());
    backend.seed_user(profile(1, "admin", vec![role(1, "super_admin", &[])]), "s3cret");
    backend.seed_user(
        profile(2, "op", vec![role(2, "operator", &["data:stats"])]),
        "op-pw",
    );
    backend.seed_node(node(1, "hive-a"));
    backend.seed_node(node(2, "hive-b"));
    backend.seed_attack_total(120);
    backend
}

async fn session_for(
    backend: &Arc<FakeBackend>,
    username: &str,
    password: &str,
) -> (Arc<ConsoleSession>, NoticeReceiver) {
    let api: Arc<dyn ApiTransport> = backend.clone();
    let channel: Arc<dyn ChannelTransport> = Arc::new(SilentChannel);
    ConsoleBuilder::new(ConsoleConfig::new().with_reconnect_delay(1))
        .with_storage(Box::new(MemoryStorage::new()))
        .with_api_transport(api)
        .with_channel_transport(channel)
        .login(username, password, false)
        .await
        .expect("login")
}

#[tokio::test]
async fn limited_operator_never_sees_gated_views() {
    let backend = seeded_backend();
    let (session, _notices) = session_for(&backend, "op", "op-pw").await;

    let ids: Vec<ViewId> = session
        .navigable_views()
        .iter()
        .map(|view| view.id)
        .collect();
    assert_eq!(
        ids,
        vec![
            ViewId::Dashboard,
            ViewId::Stats,
            ViewId::Traffic,
            ViewId::Settings
        ]
    );

    // A direct navigation attempt is refused and changes nothing
    let err = session.navigate(ViewId::Users).await.unwrap_err();
    match err {
        NavigateError::PermissionDenied { required, .. } => assert_eq!(required, "user:list"),
        other => panic!("expected permission denial, got {other:?}"),
    }
    assert_eq!(session.router().active(), ViewId::Dashboard);
    assert_eq!(session.router().epoch(), 0);
}

#[tokio::test]
async fn super_admin_navigates_everything() {
    let backend = seeded_backend();
    let (session, _notices) = session_for(&backend, "admin", "s3cret").await;

    assert_eq!(session.navigable_views().len(), 7);
    for view in [ViewId::Users, ViewId::Roles, ViewId::Monitor, ViewId::Stats] {
        let outcome = session.navigate(view).await.unwrap();
        assert_eq!(outcome, Navigation::Applied(view));
    }
}

#[tokio::test]
async fn stale_load_never_overwrites_the_active_view() {
    let backend = seeded_backend();
    let (session, _notices) = session_for(&backend, "admin", "s3cret").await;
    backend.with_latency("users/", Duration::from_millis(80));

    let slow_session = Arc::clone(&session);
    let slow = tokio::spawn(async move { slow_session.navigate(ViewId::Users).await });
    // Let the slow navigation claim its epoch first
    tokio::time::sleep(Duration::from_millis(10)).await;

    let fast = session.navigate(ViewId::Stats).await.unwrap();
    assert_eq!(fast, Navigation::Applied(ViewId::Stats));

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow, Navigation::Superseded(ViewId::Users));

    // The stats view stays in charge; the late users payload was dropped
    assert_eq!(session.router().active(), ViewId::Stats);
    assert!(matches!(
        session.router().content(ViewId::Stats),
        Some(LoadState::Ready(ViewData::Stats(_)))
    ));
    assert_eq!(
        session.router().content(ViewId::Users),
        Some(LoadState::Loading)
    );
}

#[tokio::test]
async fn monitor_refresh_fills_fleet_and_connects_channel() {
    let backend = seeded_backend();
    let (session, _notices) = session_for(&backend, "admin", "s3cret").await;

    let outcome = session.navigate(ViewId::Monitor).await.unwrap();
    assert_eq!(outcome, Navigation::Applied(ViewId::Monitor));

    match session.router().content(ViewId::Monitor) {
        Some(LoadState::Ready(ViewData::Monitor(nodes))) => {
            let ids: Vec<i64> = nodes.iter().map(|node| node.id).collect();
            assert_eq!(ids, vec![1, 2]);
        }
        other => panic!("expected monitor data, got {other:?}"),
    }
    assert_eq!(session.fleet().len(), 2);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.live_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn repeated_navigation_is_served_from_cache() {
    let backend = seeded_backend();
    let (session, _notices) = session_for(&backend, "admin", "s3cret").await;

    session.navigate(ViewId::Stats).await.unwrap();
    session.navigate(ViewId::Stats).await.unwrap();
    assert_eq!(backend.count_requests("data/stats/charts"), 1);
}

#[tokio::test]
async fn user_mutation_invalidates_the_users_view() {
    let backend = seeded_backend();
    let (session, _notices) = session_for(&backend, "admin", "s3cret").await;

    let before = backend.count_requests("users/");
    session.navigate(ViewId::Users).await.unwrap();
    session.navigate(ViewId::Users).await.unwrap();
    let after_reads = backend.count_requests("users/");
    // Second entry is a memo hit
    assert_eq!(after_reads - before, 1);

    session
        .create_user(&UserCreate::new("frank", "frank@example.com", "frank-pw"))
        .await
        .unwrap();
    session.navigate(ViewId::Users).await.unwrap();
    // One POST plus one fresh list fetch
    assert_eq!(backend.count_requests("users/") - after_reads, 2);
}

#[tokio::test]
async fn loader_failure_leaves_view_mounted_with_inline_error() {
    let backend = seeded_backend();
    let (session, mut notices) = session_for(&backend, "admin", "s3cret").await;
    backend.deny_path("data/stats/traffic");

    let outcome = session.navigate(ViewId::Traffic).await.unwrap();
    assert_eq!(outcome, Navigation::Applied(ViewId::Traffic));
    assert_eq!(session.router().active(), ViewId::Traffic);
    match session.router().content(ViewId::Traffic) {
        Some(LoadState::Failed(message)) => assert!(message.contains("not permitted")),
        other => panic!("expected inline failure, got {other:?}"),
    }
    // The failure surfaced as a scoped notice, not a crash
    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(!session.is_terminated());
}

#[tokio::test]
async fn expiry_mid_session_terminates_the_context() {
    let backend = seeded_backend();
    let (session, mut notices) = session_for(&backend, "admin", "s3cret").await;

    backend.expire_sessions();
    let outcome = session.navigate(ViewId::Traffic).await.unwrap();
    // The navigation itself completed; its loader recorded the failure
    assert_eq!(outcome, Navigation::Applied(ViewId::Traffic));
    assert!(session.is_terminated());

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.message.contains("session expired"));

    // Every further navigation is refused
    let err = session.navigate(ViewId::Dashboard).await.unwrap_err();
    assert!(matches!(err, NavigateError::SessionEnded));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let backend = seeded_backend();
    let (session, _notices) = session_for(&backend, "admin", "s3cret").await;

    session.logout().await;
    assert!(session.is_terminated());
    assert_eq!(session.live_state(), ConnectionState::Disconnected);

    // A second logout observes the same end state
    session.logout().await;
    assert!(session.is_terminated());
    assert!(matches!(
        session.navigate(ViewId::Dashboard).await.unwrap_err(),
        NavigateError::SessionEnded
    ));
}

#[tokio::test]
async fn settings_refresh_recomputes_capabilities_whole() {
    let backend = seeded_backend();
    backend.seed_user(
        profile(3, "shift", vec![role(3, "staff", &["user:list"])]),
        "shift-pw",
    );
    let (session, _notices) = session_for(&backend, "shift", "shift-pw").await;
    assert!(session.capabilities().allows(Some("user:list")));

    // Server-side downgrade between fetches
    backend.seed_user(
        profile(3, "shift", vec![role(3, "staff", &["data:stats"])]),
        "shift-pw",
    );

    session.navigate(ViewId::Settings).await.unwrap();
    let caps = session.capabilities();
    assert!(!caps.allows(Some("user:list")));
    assert!(caps.allows(Some("data:stats")));
    assert!(session
        .navigable_views()
        .iter()
        .all(|view| view.id != ViewId::Users));
    assert!(session.navigate(ViewId::Users).await.is_err());
}
