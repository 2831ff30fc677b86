//! Integration tests for the in-process loopback transport.

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::Result;
use anyhow::ensure;
use tracing_subscriber::EnvFilter;

use treerpc::Command;
use treerpc::Endpoint;
use treerpc::Error;
use treerpc::LoopbackClient;
use treerpc::LoopbackServer;
use treerpc::Registry;
use treerpc::Transport;

use common::TestRpc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn plain_pair() -> (TestRpc, TestRpc) {
    init_tracing();
    let server = LoopbackServer::new();
    let client = LoopbackClient::new(server.clone());
    (TestRpc::new(server), TestRpc::new(client))
}

fn encoded_pair() -> (TestRpc, TestRpc) {
    init_tracing();
    let server = LoopbackServer::new();
    let client = LoopbackClient::encoded(server.clone());
    (TestRpc::new(server), TestRpc::new(client))
}

/// Runs each named scenario against both loopback flavours.
macro_rules! scenarios {
    ($($scenario:ident),* $(,)?) => {
        mod plain {
            $(
                #[test]
                fn $scenario() -> anyhow::Result<()> {
                    let (server, client) = super::plain_pair();
                    super::common::$scenario(&server, &client)
                }
            )*
        }

        mod encoded {
            $(
                #[test]
                fn $scenario() -> anyhow::Result<()> {
                    let (server, client) = super::encoded_pair();
                    super::common::$scenario(&server, &client)
                }
            )*
        }
    };
}

scenarios!(
    simple_call,
    simple_const_call,
    rebind,
    scalar_args,
    pair_args,
    tuple_args,
    nested_tuple_args,
    custom_type,
    bound_methods,
    call_on_server_is_role_violation,
    bind_on_client_is_role_violation,
    matching_schemas,
);

// --- Unbound handlers ---

#[test]
fn test_unbound_call_fails_at_call_time() -> Result<()> {
    let (server, client) = plain_pair();
    ensure!(!server.simple_call.is_bound());

    let err = client.simple_call.call().unwrap_err();
    ensure!(err.is_unbound(), "unexpected error: {}", err);
    ensure!(!err.is_role_violation());
    Ok(())
}

#[test]
fn test_unbind_restores_unbound_failure() -> Result<()> {
    let (server, client) = plain_pair();
    server.simple_const_call.bind(|| 7)?;
    ensure!(client.simple_const_call.call()? == 7);

    server.simple_const_call.unbind()?;
    ensure!(!server.simple_const_call.is_bound());
    ensure!(matches!(client.simple_const_call.call(), Err(Error::Unbound { .. })));
    Ok(())
}

#[test]
fn test_unbind_on_client_is_role_violation() {
    let (_server, client) = plain_pair();
    assert!(client.simple_call.unbind().unwrap_err().is_role_violation());
}

// --- Unconfigured transport ---

/// A transport that never took a side.
#[derive(Default)]
struct Detached {
    registry: Registry,
}

impl Transport for Detached {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn invoke_endpoint(&self, _envelope: treerpc::Node) -> treerpc::Result<treerpc::Node> {
        panic!("an unconfigured transport must never deliver");
    }
}

#[test]
fn test_unconfigured_transport_refuses_everything() {
    let transport: Arc<dyn Transport> = Arc::new(Detached::default());
    assert!(!transport.is_client());
    assert!(!transport.is_server());

    let endpoint = Endpoint::new(transport);
    let double: Command<u32, (u32,)> = Command::new(&endpoint, "double");

    assert!(double.bind(|x| x * 2).unwrap_err().is_role_violation());
    assert!(double.call(4).unwrap_err().is_role_violation());
}

// --- Identifiers and schemas ---

#[test]
fn test_identifiers_follow_declaration_order() {
    let (server, client) = plain_pair();
    assert_eq!(server.simple_call.id().0, 0);
    assert_eq!(server.sort_vector.id().0, 10);
    assert_eq!(client.custom_type.id(), server.custom_type.id());
    assert_eq!(server.endpoint().transport().registry().len(), 11);
    assert_eq!(server.scalar_args.name(), "scalar_args");
}

treerpc::endpoint! {
    struct Reordered {
        scalar_args: Command<u32, (u32, u32)>,
        simple_call: Command<()>,
    }
}

#[test]
fn test_schema_reports_divergent_declarations() {
    let server = LoopbackServer::new();
    let served = TestRpc::new(server.clone());
    let reordered = Reordered::new(LoopbackClient::new(server));

    let divergence = served.schema().mismatch(&reordered.schema());
    let message = divergence.expect("reordered declaration went unnoticed");
    assert!(message.contains("cmd-0"), "{}", message);
}

#[test]
fn test_schema_travels_as_a_node() -> Result<()> {
    use treerpc::Schema;
    use treerpc::Serializer;

    treerpc::endpoint! {
        struct Introspect {
            describe: Command<Schema>,
        }
    }

    let server = LoopbackServer::new();
    let served = Introspect::new(server.clone());
    let schema = served.schema();
    served.describe.bind(move || schema.clone())?;

    let client = Introspect::new(LoopbackClient::encoded(server));
    let remote = client.describe.call()?;
    ensure!(remote == client.schema());
    ensure!(Schema::deserialize(remote.serialize())? == remote);
    Ok(())
}

// --- Rebinding under load ---

#[test]
fn test_rebind_while_calling_sees_one_handler_per_call() -> Result<()> {
    let (server, client) = plain_pair();
    server.simple_const_call.bind(|| 1)?;

    let done = AtomicBool::new(false);
    std::thread::scope(|scope| -> Result<()> {
        let caller = scope.spawn(|| -> treerpc::Result<Vec<u32>> {
            let mut seen = Vec::new();
            while !done.load(Ordering::SeqCst) {
                seen.push(client.simple_const_call.call()?);
            }
            seen.push(client.simple_const_call.call()?);
            Ok(seen)
        });

        for value in 2..=50 {
            server.simple_const_call.bind(move || value)?;
        }
        done.store(true, Ordering::SeqCst);

        let seen = caller.join().map_err(|_| anyhow::anyhow!("caller panicked"))??;
        ensure!(seen.iter().all(|v| (1..=50).contains(v)));
        ensure!(seen.windows(2).all(|w| w[0] <= w[1]), "a call observed a stale handler");
        ensure!(seen.last() == Some(&50));
        Ok(())
    })
}

// --- Handler rebinding itself ---

#[test]
fn test_handler_may_rebind_its_own_command() -> Result<()> {
    let server = LoopbackServer::new();
    let served = Arc::new(TestRpc::new(server.clone()));
    let client = TestRpc::new(LoopbackClient::new(server));

    let inner = served.clone();
    served.simple_const_call.bind(move || {
        inner.simple_const_call.bind(|| 2).expect("rebind from handler");
        1
    })?;

    ensure!(client.simple_const_call.call()? == 1);
    ensure!(client.simple_const_call.call()? == 2);
    Ok(())
}
