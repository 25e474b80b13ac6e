//! Full router: configuration directory on disk, inbound HTTP, real downstreams.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use webrehook::config::{load_confdir, ServiceConfig};
use webrehook::lifecycle::startup::{build_engine, serve};
use webrehook::lifecycle::Shutdown;

mod common;

const RULES: &str = r#"
- name: gitlab-push
  headers:
    X-Gitlab-Event: Push Hook
  when: "JSON['project']['name'] == 'router' and JSON['total_commits_count'] > 0"
  routes: [chat]
  template: push.j2
  done: false

- name: audit
  routes: [audit]
  template: audit.j2

- name: never
  routes: [chat]
  template: push.j2
"#;

const PUSH_TEMPLATE: &str =
    r#"{"text": "{{JSON.user_name}} pushed {{JSON.total_commits_count}} commits", "commits": {{tojson JSON.commits}} }"#;

const AUDIT_TEMPLATE: &str = r#"{"event": {{tojson JSON}} }"#;

struct Running {
    addr: std::net::SocketAddr,
    shutdown: Shutdown,
    client: reqwest::Client,
}

impl Running {
    async fn post(&self, body: &str, event: Option<&str>) -> reqwest::StatusCode {
        let mut request = self
            .client
            .post(format!("http://{}/", self.addr))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(event) = event {
            request = request.header("X-Gitlab-Event", event);
        }
        request.send().await.expect("Router unreachable").status()
    }
}

async fn start(chat: &common::MockDownstream, audit: &common::MockDownstream) -> Running {
    let routes = format!("chat: {}\naudit: {}\n", chat.url(), audit.url());
    let dir = common::write_confdir(
        &routes,
        RULES,
        &[("push.j2", PUSH_TEMPLATE), ("audit.j2", AUDIT_TEMPLATE)],
    );

    let mut service = ServiceConfig::default();
    service.dispatch.delay_secs = 0;
    service.dispatch.tries = 2;

    let config = load_confdir(&dir, service.rules.autodone).unwrap();
    let engine = build_engine(config, &service.dispatch).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = serve(engine, &service, listener, &server_shutdown).await;
    });

    Running {
        addr,
        shutdown,
        client: reqwest::Client::builder().no_proxy().build().unwrap(),
    }
}

#[tokio::test]
async fn test_push_event_reaches_both_routes() {
    let chat = common::start_mock_downstream(200).await;
    let audit = common::start_mock_downstream(204).await;
    let router = start(&chat, &audit).await;

    let payload = json!({
        "user_name": "John Smith",
        "total_commits_count": 2,
        "project": {"name": "router"},
        "commits": [{"id": "a1"}, {"id": "b2"}],
    });
    let status = router.post(&payload.to_string(), Some("Push Hook")).await;
    assert_eq!(status, 200);

    assert!(common::wait_until(|| chat.calls() == 1 && audit.calls() == 1, Duration::from_secs(5)).await);
    assert_eq!(
        chat.bodies(),
        vec![json!({
            "text": "John Smith pushed 2 commits",
            "commits": [{"id": "a1"}, {"id": "b2"}],
        })]
    );
    assert_eq!(audit.bodies(), vec![json!({"event": payload})]);

    router.shutdown.trigger();
}

#[tokio::test]
async fn test_wrong_header_skips_push_rule() {
    let chat = common::start_mock_downstream(200).await;
    let audit = common::start_mock_downstream(200).await;
    let router = start(&chat, &audit).await;

    let payload = json!({"total_commits_count": 1, "project": {"name": "router"}});
    assert_eq!(router.post(&payload.to_string(), Some("Tag Push Hook")).await, 200);

    assert!(common::wait_until(|| audit.calls() == 1, Duration::from_secs(5)).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(chat.calls(), 0);
    assert_eq!(audit.calls(), 1, "audit is done; the last rule is never reached");

    router.shutdown.trigger();
}

#[tokio::test]
async fn test_broken_json_is_acknowledged() {
    let chat = common::start_mock_downstream(200).await;
    let audit = common::start_mock_downstream(200).await;
    let router = start(&chat, &audit).await;

    assert_eq!(router.post("{\"unterminated\": ", Some("Push Hook")).await, 200);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(chat.calls() + audit.calls(), 0);

    router.shutdown.trigger();
}

#[tokio::test]
async fn test_downstream_failure_is_invisible_to_sender() {
    let chat = common::start_mock_downstream(500).await;
    let audit = common::start_mock_downstream(503).await;
    let router = start(&chat, &audit).await;

    let payload = json!({"total_commits_count": 3, "project": {"name": "router"}, "commits": []});
    assert_eq!(router.post(&payload.to_string(), Some("Push Hook")).await, 200);

    // tries = 2 for each route
    assert!(common::wait_until(|| chat.calls() == 2 && audit.calls() == 2, Duration::from_secs(5)).await);

    router.shutdown.trigger();
}

#[tokio::test]
async fn test_health_reports_counts() {
    let chat = common::start_mock_downstream(200).await;
    let audit = common::start_mock_downstream(200).await;
    let router = start(&chat, &audit).await;

    let health: Value = router
        .client
        .get(format!("http://{}/health", router.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"status": "ok", "rules": 3, "routes": 2}));

    router.shutdown.trigger();
}
