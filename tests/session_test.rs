//! Session acquisition, login branches and renewal

use kodegen_tools_tagscrape::browsing::SiteProfile;
use kodegen_tools_tagscrape::config::Credentials;
use kodegen_tools_tagscrape::scrape_engine::ScrapeError;
use kodegen_tools_tagscrape::session::{AuthStateStore, SessionManager, SessionState};
use std::sync::Arc;
use tempfile::TempDir;

mod common;
use common::{FakeBackend, FakeWorld, LoginScript, PASSWORD, USERNAME, test_config};

fn manager(
    world: &Arc<FakeWorld>,
    dir: &TempDir,
    with_credentials: bool,
) -> (SessionManager<FakeBackend>, AuthStateStore) {
    let store = AuthStateStore::new(dir.path().join("auth_state.json"));
    let credentials = with_credentials.then(|| Credentials::new(USERNAME, PASSWORD));
    let timeouts = test_config(dir.path(), false).session_timeouts();
    let manager = SessionManager::new(
        Arc::new(FakeBackend::new(world)),
        store.clone(),
        credentials,
        Arc::new(SiteProfile::default()),
        timeouts,
    );
    (manager, store)
}

#[tokio::test(start_paused = true)]
async fn test_fresh_login_authenticates_and_persists_state() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, store) = manager(&world, &dir, true);

    assert_eq!(session.state().await, SessionState::NoState);
    assert!(store.load().unwrap().is_none());

    let active = session.acquire().await.unwrap();
    assert_eq!(active.generation, 1);
    assert_eq!(session.state().await, SessionState::Authenticated);
    assert_eq!(world.logins(), 1);

    let saved = store.load().unwrap().expect("state persisted after login");
    assert!(saved.payload["token"].as_u64().is_some_and(|t| t > 0));

    drop(active);
    session.shutdown().await;
    assert_eq!(world.opened(), world.closed());
}

#[tokio::test(start_paused = true)]
async fn test_valid_persisted_state_skips_login() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, store) = manager(&world, &dir, false);
    store.save(&world.valid_state()).unwrap();

    session.acquire().await.unwrap();
    assert_eq!(session.state().await, SessionState::Authenticated);
    assert_eq!(world.logins(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_persisted_state_falls_back_to_login() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, store) = manager(&world, &dir, true);
    store.save(&world.stale_state()).unwrap();

    session.acquire().await.unwrap();
    assert_eq!(world.logins(), 1);
    // Probe context plus the login context
    assert_eq!(world.opened(), 2);

    let saved = store.load().unwrap().unwrap();
    assert_ne!(saved.payload["token"].as_u64(), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_persisted_state_is_treated_as_absent() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, store) = manager(&world, &dir, true);
    std::fs::write(store.path(), b"{ not json").unwrap();

    session.acquire().await.unwrap();
    assert_eq!(world.logins(), 1);
    assert!(store.load().unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_persisted_state_falls_back_to_login() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, store) = manager(&world, &dir, true);
    // A directory where the slot file should be: unreadable and unwritable
    std::fs::create_dir(store.path()).unwrap();

    let active = session.acquire().await.unwrap();
    assert_eq!(active.generation, 1);
    assert_eq!(world.logins(), 1);
    assert_eq!(session.state().await, SessionState::Authenticated);
    assert!(store.load().unwrap().is_none());

    drop(active);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_identity_reconfirmation_branch() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    world.set_login_script(LoginScript::Reconfirm);
    let (session, _store) = manager(&world, &dir, true);

    session.acquire().await.unwrap();
    assert_eq!(world.logins(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_challenge_is_fatal_and_persists_nothing() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    world.set_login_script(LoginScript::Challenge);
    let (session, store) = manager(&world, &dir, true);

    let err = session.acquire().await.err().unwrap();
    assert!(matches!(err, ScrapeError::AuthChallengeUnsupported(_)));
    assert!(err.is_fatal());
    assert_eq!(session.state().await, SessionState::NoState);
    assert!(store.load().unwrap().is_none());
    assert_eq!(world.opened(), world.closed());
}

#[tokio::test(start_paused = true)]
async fn test_silent_login_page_times_out() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    world.set_login_script(LoginScript::Stuck);
    let (session, _store) = manager(&world, &dir, true);

    let err = session.acquire().await.err().unwrap();
    match err {
        ScrapeError::AuthTimeout { step } => assert_eq!(step, "password prompt"),
        other => panic!("expected auth timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_credentials_is_config_error() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, _store) = manager(&world, &dir, false);

    let err = session.acquire().await.err().unwrap();
    assert!(matches!(err, ScrapeError::Config(_)));
    assert_eq!(world.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_acquire_shares_one_login() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, _store) = manager(&world, &dir, true);
    let session = Arc::new(session);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.acquire().await.map(|a| a.generation) })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }
    assert_eq!(world.logins(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_renewal_happens_once_per_run() {
    let dir = TempDir::new().unwrap();
    let world = FakeWorld::new();
    let (session, _store) = manager(&world, &dir, true);

    let first = session.acquire().await.unwrap();
    let renewed = session.renew(first.generation).await.unwrap();
    assert_eq!(renewed.generation, 2);
    assert_eq!(world.logins(), 2);

    // A caller still holding the old handle gets the renewed context
    let late = session.renew(first.generation).await.unwrap();
    assert_eq!(late.generation, 2);
    assert_eq!(world.logins(), 2);

    // The budget is spent
    let err = session.renew(renewed.generation).await.err().unwrap();
    assert!(matches!(err, ScrapeError::SessionExpired));
    assert_eq!(session.state().await, SessionState::Expired);

    drop((first, renewed, late));
    session.shutdown().await;
    assert_eq!(world.opened(), 2);
    assert_eq!(world.closed(), 2);
}
