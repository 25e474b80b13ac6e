//! Rule engine behavior end to end, with a scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;
use webrehook::condition::{compile, evaluate, resolve, truthy, JsonPath, Step};
use webrehook::config::{DispatchConfig, RouterConfig};
use webrehook::dispatch::{DeliveryOutcome, Dispatcher, TemplateTable, Transport};
use webrehook::error::TransportError;
use webrehook::routing::{RequestHeaders, RouteTable, Rule, RuleEngine, RuleList};

/// Answers from a script, then 200. Records the host of every request.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<u16>>,
    hosts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn with_script(statuses: &[u16]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(statuses.iter().copied().collect()),
            hosts: Mutex::new(Vec::new()),
        })
    }

    fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &Url, _body: &Value) -> Result<u16, TransportError> {
        self.hosts
            .lock()
            .unwrap()
            .push(url.host_str().unwrap_or_default().to_string());
        Ok(self.script.lock().unwrap().pop_front().unwrap_or(200))
    }
}

fn engine(rules: Vec<Rule>, transport: Arc<ScriptedTransport>, dispatch: DispatchConfig) -> RuleEngine {
    let mut routes = RouteTable::new();
    for name in ["r1", "r2"] {
        routes.insert(name, Url::parse(&format!("http://{}.test/hook", name)).unwrap());
    }
    let mut templates = TemplateTable::new();
    templates.register("t", r#"{"user": "{{JSON.user_name}}"}"#).unwrap();

    let config = Arc::new(RouterConfig {
        routes,
        templates,
        rules: RuleList::new(rules),
    });
    let dispatcher = Dispatcher::new(Arc::clone(&config), transport, &dispatch);
    RuleEngine::new(config, dispatcher)
}

fn john_rule() -> Rule {
    Rule::new("john", vec!["r1".into()], "t")
        .with_when("JSON['user_name']=='John Smith'")
        .unwrap()
        .with_done(true)
}

#[tokio::test]
async fn test_matching_done_rule_dispatches_and_stops() {
    let transport = ScriptedTransport::with_script(&[]);
    let fallback = Rule::new("fallback", vec!["r2".into()], "t");
    let engine = engine(vec![john_rule(), fallback], transport.clone(), DispatchConfig::default());

    let outcome = engine.process(json!({"user_name": "John Smith"}), &RequestHeaders::new());

    assert_eq!(outcome.matched, ["john"]);
    assert_eq!(outcome.stopped_by.as_deref(), Some("john"));
    assert_eq!(outcome.join().await, vec![DeliveryOutcome::Delivered { attempts: 1 }]);
    assert_eq!(transport.hosts(), ["r1.test"]);
}

#[tokio::test]
async fn test_non_matching_rule_lets_evaluation_continue() {
    let transport = ScriptedTransport::with_script(&[]);
    let fallback = Rule::new("fallback", vec!["r2".into()], "t");
    let engine = engine(vec![john_rule(), fallback], transport.clone(), DispatchConfig::default());

    let outcome = engine.process(json!({"user_name": "Jane"}), &RequestHeaders::new());

    assert_eq!(outcome.matched, ["fallback"]);
    outcome.join().await;
    assert_eq!(transport.hosts(), ["r2.test"]);
}

#[tokio::test]
async fn test_header_gate_fails_regardless_of_condition() {
    let transport = ScriptedTransport::with_script(&[]);
    let rule = Rule::new("push", vec!["r1".into()], "t")
        .with_headers([("X-Event", "push")])
        .with_when("1 == 1")
        .unwrap();
    let engine = engine(vec![rule], transport.clone(), DispatchConfig::default());

    let headers: RequestHeaders = [("X-Event", "pull")].into_iter().collect();
    let outcome = engine.process(json!({}), &headers);
    assert!(!outcome.is_match());

    let headers: RequestHeaders = [("x-event", "push")].into_iter().collect();
    let outcome = engine.process(json!({}), &headers);
    assert_eq!(outcome.matched, ["push"]);
    outcome.join().await;
    assert_eq!(transport.hosts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_third_attempt_succeeds() {
    let transport = ScriptedTransport::with_script(&[500, 500, 200, 200]);
    let dispatch = DispatchConfig {
        tries: 3,
        delay_secs: 1,
        ..DispatchConfig::default()
    };
    let rule = Rule::new("any", vec!["r1".into()], "t");
    let engine = engine(vec![rule], transport.clone(), dispatch);

    let start = tokio::time::Instant::now();
    let outcome = engine.process(json!({}), &RequestHeaders::new());
    assert_eq!(outcome.join().await, vec![DeliveryOutcome::Delivered { attempts: 3 }]);

    assert_eq!(transport.hosts().len(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_not_done_then_done_both_dispatch() {
    let transport = ScriptedTransport::with_script(&[]);
    let first = Rule::new("first", vec!["r1".into()], "t").with_done(false);
    let second = Rule::new("second", vec!["r2".into()], "t").with_done(true);
    let never = Rule::new("never", vec!["r1".into()], "t");
    let engine = engine(vec![first, second, never], transport.clone(), DispatchConfig::default());

    let outcome = engine.process(json!({}), &RequestHeaders::new());

    assert_eq!(outcome.matched, ["first", "second"]);
    assert_eq!(outcome.stopped_by.as_deref(), Some("second"));
    assert_eq!(outcome.join().await.len(), 2);

    let mut hosts = transport.hosts();
    hosts.sort();
    assert_eq!(hosts, ["r1.test", "r2.test"]);
}

#[test]
fn test_and_short_circuits_on_missing_index() {
    let condition = compile("guard", "JSON['a'][0] is not None and JSON['a'][0]['b']=='x'").unwrap();
    let payload = json!({"a": []});

    let first = JsonPath::new(vec![Step::Key("a".into()), Step::Index(0)]);
    assert_eq!(resolve(&payload, &first), &Value::Null);

    let value = evaluate(condition.root(), &payload);
    assert_eq!(value.as_ref(), &json!(false));
    assert!(!truthy(&value));

    let payload2 = json!({"a": [{"b": "x"}]});
    let value = evaluate(condition.root(), &payload2);
    assert!(truthy(&value));
}

#[test]
fn test_compilation_is_deterministic() {
    let source = "not JSON['x'] in 'abc' or JSON['n'] * 2 >= 10";
    let a = compile("r", source).unwrap();
    let b = compile("r", source).unwrap();
    assert_eq!(a.root(), b.root());
    assert_eq!(a.root().to_string(), b.root().to_string());
}
