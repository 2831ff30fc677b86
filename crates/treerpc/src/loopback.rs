//! # Loopback Transport
//!
//! A server and client pair living in one process. The client hands each
//! envelope straight to the server's dispatch routine on the calling thread:
//! no threads, no suspension. Arguments and results still travel as document
//! nodes, so serialization behaves exactly as it does over a socket.

use std::sync::Arc;

use crate::error::Result;
use crate::node;
use crate::node::Node;
use crate::transport;
use crate::transport::Registry;
use crate::transport::Role;
use crate::transport::Transport;

/// Serving half; owns the registry that client envelopes are routed through.
#[derive(Default)]
pub struct LoopbackServer {
    registry: Registry,
}

impl LoopbackServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Transport for LoopbackServer {
    fn role(&self) -> Role {
        Role::Server
    }

    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn invoke_endpoint(&self, envelope: Node) -> Result<Node> {
        transport::dispatch(&self.registry, envelope)
    }
}

/// Calling half; holds the server alive for as long as it exists.
pub struct LoopbackClient {
    server: Arc<LoopbackServer>,
    registry: Registry,
    encoded: bool,
}

impl LoopbackClient {
    pub fn new(server: Arc<LoopbackServer>) -> Arc<Self> {
        Arc::new(Self {
            server,
            registry: Registry::new(),
            encoded: false,
        })
    }

    /// Like [`LoopbackClient::new`], but every envelope and reply also makes a
    /// round trip through the text encoding used on the wire.
    pub fn encoded(server: Arc<LoopbackServer>) -> Arc<Self> {
        Arc::new(Self {
            server,
            registry: Registry::new(),
            encoded: true,
        })
    }

    pub fn server(&self) -> &Arc<LoopbackServer> {
        &self.server
    }
}

impl Transport for LoopbackClient {
    fn role(&self) -> Role {
        Role::Client
    }

    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn invoke_endpoint(&self, envelope: Node) -> Result<Node> {
        if !self.encoded {
            return self.server.invoke_endpoint(envelope);
        }

        let request = node::from_text(&node::to_text(&envelope)?)?;
        let reply = self.server.invoke_endpoint(request)?;
        node::from_text(&node::to_text(&reply)?)
    }
}
