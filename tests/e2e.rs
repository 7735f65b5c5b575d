//! End-to-end tests against an in-process mock identity service.
//!
//! The mock server exposes the reserve, claim, and webhook endpoints and
//! records every call, so the tests can assert attempt counts, claim
//! ordering, and notification behavior without touching the network.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tag_claimer::claimer::{ClaimClient, ClientConfig, Dispatcher, Outcome, WorkerConfig};
use tag_claimer::webhook::Notifier;
use tokio::net::TcpListener;

struct MockState {
    reserve_suffix: String,
    claim_status: StatusCode,
    reserve_calls: AtomicUsize,
    claim_calls: AtomicUsize,
    webhook_calls: AtomicUsize,
    reserve_auth: Mutex<Vec<String>>,
    claim_bodies: Mutex<Vec<Value>>,
    webhook_bodies: Mutex<Vec<Value>>,
}

impl MockState {
    fn new(reserve_suffix: &str, claim_status: StatusCode) -> Arc<Self> {
        Arc::new(Self {
            reserve_suffix: reserve_suffix.to_string(),
            claim_status,
            reserve_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
            webhook_calls: AtomicUsize::new(0),
            reserve_auth: Mutex::new(Vec::new()),
            claim_bodies: Mutex::new(Vec::new()),
            webhook_bodies: Mutex::new(Vec::new()),
        })
    }
}

async fn reserve_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> Json<Value> {
    state.reserve_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(auth) = headers.get("authorization") {
        state
            .reserve_auth
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap().to_string());
    }
    Json(json!({ "gamertagSuffix": state.reserve_suffix.clone() }))
}

async fn claim_handler(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.claim_calls.fetch_add(1, Ordering::SeqCst);
    state.claim_bodies.lock().unwrap().push(body);
    state.claim_status
}

async fn webhook_handler(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.webhook_calls.fetch_add(1, Ordering::SeqCst);
    state.webhook_bodies.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

/// Spawn the mock service and return its base URL plus the shared state.
async fn spawn_mock(reserve_suffix: &str, claim_status: StatusCode) -> (String, Arc<MockState>) {
    let state = MockState::new(reserve_suffix, claim_status);
    let app = Router::new()
        .route("/gamertags/reserve", post(reserve_handler))
        .route("/users/current/profile/gamertag", post(claim_handler))
        .route("/webhook", post(webhook_handler))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn dispatcher_for(
    base: &str,
    tokens: Vec<String>,
    proxies: Vec<String>,
    config: WorkerConfig,
) -> Dispatcher {
    let client_config = ClientConfig::new()
        .with_reserve_url(format!("{base}/gamertags/reserve"))
        .with_claim_url(format!("{base}/users/current/profile/gamertag"))
        .with_timeout(Duration::from_secs(5));
    let client = ClaimClient::with_config(client_config).unwrap();
    let notifier = Notifier::new(format!("{base}/webhook"));
    Dispatcher::new(client, notifier, tokens, proxies, config)
}

#[tokio::test]
async fn reserve_succeeds_first_try_then_claims_once() {
    let (base, state) = spawn_mock("", StatusCode::OK).await;
    let dispatcher = dispatcher_for(
        &base,
        vec!["T1".to_string()],
        Vec::new(),
        WorkerConfig::default(),
    );

    let outcomes = dispatcher.run(vec!["Foo".to_string()]).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0], ("Foo".to_string(), Outcome::Claimed));
    assert_eq!(state.reserve_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.claim_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.webhook_calls.load(Ordering::SeqCst), 1);

    // The claim reuses the token that won the reservation.
    let auth = state.reserve_auth.lock().unwrap();
    assert_eq!(auth.as_slice(), ["XBL3.0 x=T1"]);

    let claims = state.claim_bodies.lock().unwrap();
    assert_eq!(claims[0]["gamertag"]["gamertag"], "Foo");
    assert_eq!(claims[0]["gamertag"]["classicGamertag"], "Foo");
    assert_eq!(claims[0]["gamertag"]["gamertagSuffix"], "");

    let webhooks = state.webhook_bodies.lock().unwrap();
    let embed = &webhooks[0]["embeds"][0];
    assert_eq!(embed["color"], 0x00ff00);
    assert_eq!(embed["fields"][0]["name"], "Gamertag");
    assert_eq!(embed["fields"][0]["value"], "Foo");
}

#[tokio::test]
async fn suffix_offered_exhausts_cap_with_no_claim_and_no_notification() {
    let (base, state) = spawn_mock("123", StatusCode::OK).await;
    let dispatcher = dispatcher_for(
        &base,
        vec!["T1".to_string()],
        Vec::new(),
        WorkerConfig::new().with_max_attempts(5),
    );

    let outcomes = dispatcher.run(vec!["Foo".to_string()]).await;

    assert_eq!(outcomes[0].1, Outcome::Exhausted);
    assert_eq!(state.reserve_calls.load(Ordering::SeqCst), 5);
    assert_eq!(state.claim_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.webhook_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_claim_is_not_retried_and_notifies_failure() {
    let (base, state) = spawn_mock("", StatusCode::INTERNAL_SERVER_ERROR).await;
    let dispatcher = dispatcher_for(
        &base,
        vec!["T1".to_string()],
        Vec::new(),
        WorkerConfig::default(),
    );

    let outcomes = dispatcher.run(vec!["Foo".to_string()]).await;

    assert_eq!(outcomes[0].1, Outcome::ClaimFailed);
    assert_eq!(state.reserve_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.claim_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.webhook_calls.load(Ordering::SeqCst), 1);

    let webhooks = state.webhook_bodies.lock().unwrap();
    let embed = &webhooks[0]["embeds"][0];
    assert_eq!(embed["color"], 0xff0000);
    assert_eq!(embed["fields"][0]["value"], "Foo");
}

#[tokio::test]
async fn each_target_gets_an_independent_outcome() {
    let (base, state) = spawn_mock("", StatusCode::OK).await;
    let dispatcher = dispatcher_for(
        &base,
        vec!["T1".to_string(), "T2".to_string()],
        Vec::new(),
        WorkerConfig::new().with_concurrency(2),
    );

    let targets = vec!["Foo".to_string(), "Bar".to_string(), "Baz".to_string()];
    let mut outcomes = dispatcher.run(targets).await;
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|(_, o)| *o == Outcome::Claimed));
    let names: Vec<&str> = outcomes.iter().map(|(g, _)| g.as_str()).collect();
    assert_eq!(names, ["Bar", "Baz", "Foo"]);
    assert_eq!(state.reserve_calls.load(Ordering::SeqCst), 3);
    assert_eq!(state.claim_calls.load(Ordering::SeqCst), 3);
    assert_eq!(state.webhook_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unreachable_endpoints_count_as_failed_attempts() {
    // Nothing listens on port 1, so every reserve attempt is a transport
    // fault. The worker must absorb them as failed attempts and exhaust
    // its cap without panicking.
    let client_config = ClientConfig::new()
        .with_reserve_url("http://127.0.0.1:1/gamertags/reserve".to_string())
        .with_claim_url("http://127.0.0.1:1/users/current/profile/gamertag".to_string())
        .with_timeout(Duration::from_secs(1));
    let client = ClaimClient::with_config(client_config).unwrap();
    let notifier = Notifier::new("http://127.0.0.1:1/webhook");
    let dispatcher = Dispatcher::new(
        client,
        notifier,
        vec!["T1".to_string()],
        Vec::new(),
        WorkerConfig::new().with_max_attempts(3),
    );

    let outcomes = dispatcher.run(vec!["Foo".to_string()]).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].1, Outcome::Exhausted);
}

#[tokio::test]
async fn dead_webhook_does_not_change_a_claimed_outcome() {
    let (base, state) = spawn_mock("", StatusCode::OK).await;
    let client_config = ClientConfig::new()
        .with_reserve_url(format!("{base}/gamertags/reserve"))
        .with_claim_url(format!("{base}/users/current/profile/gamertag"))
        .with_timeout(Duration::from_secs(5));
    let client = ClaimClient::with_config(client_config).unwrap();
    // Webhook delivery is best-effort: a dead sink must not abort the
    // worker or downgrade its outcome.
    let notifier = Notifier::new("http://127.0.0.1:1/webhook");
    let dispatcher = Dispatcher::new(
        client,
        notifier,
        vec!["T1".to_string()],
        Vec::new(),
        WorkerConfig::default(),
    );

    let outcomes = dispatcher.run(vec!["Foo".to_string()]).await;

    assert_eq!(outcomes[0].1, Outcome::Claimed);
    assert_eq!(state.reserve_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.claim_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.webhook_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_proxy_entries_are_skipped_not_fatal() {
    let (base, state) = spawn_mock("", StatusCode::OK).await;
    // Every draw hits the single malformed entry, so the run burns its
    // attempts without ever reaching the service.
    let dispatcher = dispatcher_for(
        &base,
        vec!["T1".to_string()],
        vec!["not a proxy".to_string()],
        WorkerConfig::new().with_max_attempts(3),
    );

    let outcomes = dispatcher.run(vec!["Foo".to_string()]).await;

    assert_eq!(outcomes[0].1, Outcome::Exhausted);
    assert_eq!(state.reserve_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.webhook_calls.load(Ordering::SeqCst), 0);
}
