//! Scenario suite shared by every transport's integration tests.
//!
//! Each scenario takes a served endpoint and a calling endpoint built from the
//! same declaration, binds what it needs on the first, and calls through the
//! second.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use anyhow::Result;
use anyhow::ensure;

use treerpc::Command;
use treerpc::Map;
use treerpc::Node;
use treerpc::Serializer;
use treerpc::serializer::expect_map;
use treerpc::serializer::field;

/// A user type carried as a map with capitalized field names.
#[derive(Clone, Debug, PartialEq)]
pub struct Custom {
    pub field1: u32,
    pub field2: String,
}

impl Serializer for Custom {
    fn serialize(&self) -> Node {
        let mut map = Map::new();
        map.insert("Field1".into(), self.field1.serialize());
        map.insert("Field2".into(), self.field2.serialize());
        Node::Object(map)
    }

    fn deserialize(node: Node) -> treerpc::Result<Self> {
        let mut map = expect_map(node)?;
        Ok(Custom {
            field1: field(&mut map, "Field1")?,
            field2: field(&mut map, "Field2")?,
        })
    }
}

treerpc::endpoint! {
    pub struct TestRpc {
        pub simple_call: Command<()>,
        pub simple_const_call: Command<u32>,
        pub scalar_args: Command<u32, (u32, u32)>,
        pub pair_args: Command<(u32, u32), ((u32, u32),)>,
        pub tuple_args: Command<(u32, String), ((u32, u32, u32),)>,
        pub nested_tuple_args: Command<(String, (u64, f32)), (((u32, u32), (f32, f64)),)>,
        pub custom_type: Command<Custom, (Custom,)>,
        pub the_method: Command<(), (Vec<String>,)>,
        pub void_args_method: Command<usize>,
        pub returning_method: Command<String, (Vec<String>,)>,
        pub sort_vector: Command<Vec<String>, (Vec<String>,)>,
    }
}

/// Server-side object whose methods are bound by reference.
#[derive(Default)]
pub struct Stub {
    seen: Vec<Vec<String>>,
}

impl Stub {
    fn the_method(&mut self, items: Vec<String>) {
        self.seen.push(items);
    }

    fn void_args_method(&mut self) -> usize {
        self.seen.len()
    }

    fn returning_method(&self, items: Vec<String>) -> String {
        format!("Item 0: {}", items.first().map(String::as_str).unwrap_or_default())
    }

    fn sort_vector(&self, mut items: Vec<String>) -> Vec<String> {
        items.sort();
        items
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
//  CALLS
// ============================================================================

pub fn simple_call(server: &TestRpc, client: &TestRpc) -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    server.simple_call.bind(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })?;

    client.simple_call.call()?;
    ensure!(hits.load(Ordering::SeqCst) == 1, "handler ran {} times", hits.load(Ordering::SeqCst));
    Ok(())
}

pub fn simple_const_call(server: &TestRpc, client: &TestRpc) -> Result<()> {
    server.simple_const_call.bind(|| 123456)?;
    ensure!(client.simple_const_call.call()? == 123456);
    Ok(())
}

pub fn rebind(server: &TestRpc, client: &TestRpc) -> Result<()> {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let counter = first.clone();
    server.simple_call.bind(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })?;
    client.simple_call.call()?;

    let counter = second.clone();
    server.simple_call.bind(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })?;
    client.simple_call.call()?;
    client.simple_call.call()?;

    ensure!(first.load(Ordering::SeqCst) == 1, "old handler ran after rebind");
    ensure!(second.load(Ordering::SeqCst) == 2, "new handler missed calls");
    Ok(())
}

pub fn scalar_args(server: &TestRpc, client: &TestRpc) -> Result<()> {
    server.scalar_args.bind(|a, b| a * b)?;
    ensure!(client.scalar_args.call(10, 20)? == 200);
    Ok(())
}

pub fn pair_args(server: &TestRpc, client: &TestRpc) -> Result<()> {
    server.pair_args.bind(|(a, b)| (a / b, a % b))?;
    ensure!(client.pair_args.call((7, 2))? == (3, 1));
    Ok(())
}

pub fn tuple_args(server: &TestRpc, client: &TestRpc) -> Result<()> {
    server.tuple_args.bind(|(a, b, c)| {
        let result = a * b + c;
        (result, format!("Result: {}", result))
    })?;
    ensure!(client.tuple_args.call((4, 5, 6))? == (26, "Result: 26".to_string()));
    Ok(())
}

pub fn nested_tuple_args(server: &TestRpc, client: &TestRpc) -> Result<()> {
    server.nested_tuple_args.bind(|((a, b), (x, y))| {
        ("A string".to_string(), (u64::from(a) * u64::from(b), (y / f64::from(x)) as f32))
    })?;

    let (text, (product, ratio)) = client.nested_tuple_args.call(((11, 34), (1.11, 2.34)))?;
    ensure!(text == "A string");
    ensure!(product == 374);
    ensure!((ratio - (2.34 / 1.11) as f32).abs() < 1e-5, "ratio was {}", ratio);
    Ok(())
}

pub fn custom_type(server: &TestRpc, client: &TestRpc) -> Result<()> {
    server.custom_type.bind(|input: Custom| Custom {
        field1: input.field1 + 111,
        field2: input.field2 + "->out",
    })?;

    let output = client.custom_type.call(Custom {
        field1: 100,
        field2: "In".into(),
    })?;
    ensure!(output == Custom { field1: 211, field2: "In->out".into() }, "got {:?}", output);
    Ok(())
}

pub fn bound_methods(server: &TestRpc, client: &TestRpc) -> Result<()> {
    let stub = Arc::new(Mutex::new(Stub::default()));
    server.the_method.bind_mut(stub.clone(), Stub::the_method)?;
    server.void_args_method.bind_mut(stub.clone(), Stub::void_args_method)?;

    let reader = Arc::new(Stub::default());
    server.returning_method.bind_ref(reader.clone(), Stub::returning_method)?;
    server.sort_vector.bind_ref(reader, Stub::sort_vector)?;

    client.the_method.call(words(&["one", "two"]))?;
    client.the_method.call(Vec::new())?;
    ensure!(client.void_args_method.call()? == 2);

    let seen = stub.lock().map_err(|_| anyhow::anyhow!("stub poisoned"))?.seen.clone();
    ensure!(seen == vec![words(&["one", "two"]), Vec::new()]);

    ensure!(client.returning_method.call(words(&["first", "second"]))? == "Item 0: first");
    ensure!(client.sort_vector.call(words(&["pear", "apple", "fig"]))? == words(&["apple", "fig", "pear"]));
    Ok(())
}

// ============================================================================
//  MISUSE
// ============================================================================

pub fn call_on_server_is_role_violation(server: &TestRpc, _client: &TestRpc) -> Result<()> {
    server.scalar_args.bind(|a, b| a + b)?;
    let err = server.scalar_args.call(1, 2).err().ok_or_else(|| anyhow::anyhow!("call on server succeeded"))?;
    ensure!(err.is_role_violation(), "unexpected error: {}", err);
    Ok(())
}

pub fn bind_on_client_is_role_violation(_server: &TestRpc, client: &TestRpc) -> Result<()> {
    let err = client
        .simple_call
        .bind(|| ())
        .err()
        .ok_or_else(|| anyhow::anyhow!("bind on client succeeded"))?;
    ensure!(err.is_role_violation(), "unexpected error: {}", err);
    ensure!(!client.simple_call.is_bound());
    Ok(())
}

pub fn matching_schemas(server: &TestRpc, client: &TestRpc) -> Result<()> {
    let served = server.schema();
    ensure!(served.commands.len() == 11);
    ensure!(served.commands[2].name == "scalar_args");
    ensure!(served.commands[2].id.0 == 2);
    ensure!(served.mismatch(&client.schema()).is_none());
    ensure!(served == client.schema());
    Ok(())
}
