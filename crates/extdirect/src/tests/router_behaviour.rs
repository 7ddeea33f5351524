//! Behavioural tests for routing calls through a provider.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use extdirect_config::Config;

use crate::Provider;

struct RouterWorld {
    provider: Provider<()>,
    calls: Arc<AtomicUsize>,
    reply: Option<Value>,
    descriptor: Option<Value>,
    script: Option<String>,
}

impl RouterWorld {
    fn new() -> Self {
        Self {
            provider: Provider::new(Config::default()),
            calls: Arc::new(AtomicUsize::new(0)),
            reply: None,
            descriptor: None,
            script: None,
        }
    }

    fn route(&mut self, body: &Value) {
        let reply = self.provider.route(body.to_string().as_bytes(), &());
        let decoded = serde_json::from_str(&reply.body).expect("router reply is JSON");
        self.reply = Some(decoded);
    }

    fn reply(&self) -> &Value {
        self.reply.as_ref().expect("router reply recorded")
    }

    fn batch_entry(&self, position: usize) -> &Value {
        let entries = self.reply().as_array().expect("batch reply");
        &entries[position - 1]
    }
}

#[fixture]
fn world() -> RefCell<RouterWorld> {
    RefCell::new(RouterWorld::new())
}

fn call(namespace: &str, method: &str, arguments: usize, tid: i64) -> Value {
    json!({
        "action": namespace,
        "method": method,
        "data": (1..=arguments).collect::<Vec<_>>(),
        "type": "rpc",
        "tid": tid
    })
}

fn assert_exception(response: &Value, kind: &str) {
    assert_eq!(response["type"], json!("exception"), "got {response}");
    assert_eq!(response["kind"], json!(kind.trim_matches('"')), "got {response}");
}

fn assert_rpc_result(response: &Value, result: f64) {
    assert_eq!(response["type"], json!("rpc"), "got {response}");
    assert_eq!(response["result"], json!(result), "got {response}");
}

#[given("a provider exposing \"{method}\" in \"{namespace}\" with {arity} arguments")]
fn given_provider(world: &RefCell<RouterWorld>, method: String, namespace: String, arity: usize) {
    let world = world.borrow();
    let calls = Arc::clone(&world.calls);
    world.provider.register(
        namespace.trim_matches('"'),
        method.trim_matches('"'),
        arity,
        move |_: &(), _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(13.37)
        },
    );
}

#[given("a failing action \"{method}\" in \"{namespace}\"")]
fn given_failing_action(world: &RefCell<RouterWorld>, method: String, namespace: String) {
    world.borrow().provider.register(
        namespace.trim_matches('"'),
        method.trim_matches('"'),
        0,
        |_: &(), _| Err::<(), _>("backend offline"),
    );
}

#[when(
    "the router receives a call to \"{method}\" in \"{namespace}\" with {count} arguments and tid {tid}"
)]
fn when_call(
    world: &RefCell<RouterWorld>,
    method: String,
    namespace: String,
    count: usize,
    tid: i64,
) {
    let body = call(
        namespace.trim_matches('"'),
        method.trim_matches('"'),
        count,
        tid,
    );
    world.borrow_mut().route(&body);
}

#[when("the router receives a batch calling \"{first}\" then \"{second}\" in \"{namespace}\"")]
fn when_batch(world: &RefCell<RouterWorld>, first: String, second: String, namespace: String) {
    let namespace = namespace.trim_matches('"');
    let body = json!([
        call(namespace, first.trim_matches('"'), 0, 1),
        call(namespace, second.trim_matches('"'), 4, 2),
    ]);
    world.borrow_mut().route(&body);
}

#[when("the descriptor is rendered")]
fn when_descriptor_rendered(world: &RefCell<RouterWorld>) {
    let mut world = world.borrow_mut();
    let json = world.provider.api_json().expect("render api.json");
    let script = world.provider.api_script().expect("render api.js");
    world.descriptor = Some(serde_json::from_str(&json).expect("descriptor is JSON"));
    world.script = Some(script);
}

#[then("the response is an rpc envelope with result {result}")]
fn then_rpc_result(world: &RefCell<RouterWorld>, result: f64) {
    let world = world.borrow();
    assert_rpc_result(world.reply(), result);
    assert_eq!(world.reply()["action"], json!("myclass"));
    assert_eq!(world.reply()["method"], json!("myview"));
}

#[then("the response echoes tid {tid}")]
fn then_tid_echoed(world: &RefCell<RouterWorld>, tid: i64) {
    assert_eq!(world.borrow().reply()["tid"], json!(tid));
}

#[then("the response is an exception of kind \"{kind}\"")]
fn then_exception(world: &RefCell<RouterWorld>, kind: String) {
    assert_exception(world.borrow().reply(), &kind);
}

#[then("the handler was not invoked")]
fn then_not_invoked(world: &RefCell<RouterWorld>) {
    assert_eq!(world.borrow().calls.load(Ordering::SeqCst), 0);
}

#[then("the batch contains {count} responses")]
fn then_batch_size(world: &RefCell<RouterWorld>, count: usize) {
    let world = world.borrow();
    assert_eq!(world.reply().as_array().map(Vec::len), Some(count));
}

#[then("batch response {position} is an exception of kind \"{kind}\"")]
fn then_batch_exception(world: &RefCell<RouterWorld>, position: usize, kind: String) {
    assert_exception(world.borrow().batch_entry(position), &kind);
}

#[then("batch response {position} is an rpc envelope with result {result}")]
fn then_batch_rpc(world: &RefCell<RouterWorld>, position: usize, result: f64) {
    assert_rpc_result(world.borrow().batch_entry(position), result);
}

#[then("namespace \"{namespace}\" lists \"{methods}\"")]
fn then_namespace_lists(world: &RefCell<RouterWorld>, namespace: String, methods: String) {
    let world = world.borrow();
    let descriptor = world.descriptor.as_ref().expect("descriptor rendered");
    let entries = descriptor["actions"][namespace.trim_matches('"')]
        .as_array()
        .expect("namespace listed");
    let names: Vec<&str> = entries
        .iter()
        .filter_map(|entry| entry["name"].as_str())
        .collect();
    let expected: Vec<&str> = methods.trim_matches('"').split(',').collect();
    assert_eq!(names, expected);
}

#[then("the script registers the provider on load")]
fn then_script_registers(world: &RefCell<RouterWorld>) {
    let world = world.borrow();
    let script = world.script.as_deref().expect("script rendered");
    assert!(script.ends_with("Ext.Direct.addProvider( Ext.app.REMOTING_API );"));
}

#[scenario(
    path = "tests/features/router.feature",
    name = "Successful call returns the handler result"
)]
fn successful_call(#[from(world)] world: RefCell<RouterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/router.feature",
    name = "Wrong argument count is rejected without invoking the handler"
)]
fn arity_mismatch(#[from(world)] world: RefCell<RouterWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/router.feature", name = "Unknown method is rejected")]
fn unknown_method(#[from(world)] world: RefCell<RouterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/router.feature",
    name = "Failing batch entry does not abort its siblings"
)]
fn batch_isolation(#[from(world)] world: RefCell<RouterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/router.feature",
    name = "Descriptor lists methods in registration order"
)]
fn descriptor_order(#[from(world)] world: RefCell<RouterWorld>) {
    let _ = world;
}
