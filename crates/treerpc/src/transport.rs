//! # Transport Abstraction
//!
//! The shared substrate between an endpoint's commands and whatever moves
//! envelopes between processes.
//!
//! ## Philosophy
//!
//! - **Registration Order Is Identity**: every command receives the registry's
//!   current length as its identifier. Client and server must declare their
//!   commands in the same order, and nothing at runtime checks that they did.
//! - **One Extension Point**: a transport only decides how an envelope reaches
//!   the serving side (`invoke_endpoint`). Routing on the serving side is the
//!   shared [`dispatch`] routine.
//! - **Roles Are Exclusive**: a concrete transport is a client or a server. The
//!   unconfigured default exists only so that misuse is reported, not run.

use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use tracing::trace;

use crate::error::Error;
use crate::error::Result;
use crate::node;
use crate::node::Node;

/// Strong type for command identifiers.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommandId(pub u32);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

/// Which side of the wire a transport serves.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Role {
    /// May call commands.
    Client,
    /// May bind handlers and dispatch.
    Server,
    /// Neither; every call and bind is refused.
    Unconfigured,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::Unconfigured => write!(f, "unconfigured"),
        }
    }
}

/// A command with its signature erased.
pub trait Invoke: Send + Sync {
    /// The name the command was declared with.
    fn name(&self) -> &str;

    /// Decodes the argument node, runs the bound handler, and encodes the result.
    fn invoke(&self, args: Node) -> Result<Node>;
}

/// Append-only list of registered commands, indexed by [`CommandId`].
#[derive(Default)]
pub struct Registry {
    commands: RwLock<Vec<Arc<dyn Invoke>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command and returns the identifier it was assigned.
    pub fn add(&self, command: Arc<dyn Invoke>) -> CommandId {
        let mut commands = self.commands.write().unwrap_or_else(PoisonError::into_inner);
        let id = CommandId(commands.len() as u32);
        commands.push(command);
        id
    }

    pub fn get(&self, id: CommandId) -> Option<Arc<dyn Invoke>> {
        let commands = self.commands.read().unwrap_or_else(PoisonError::into_inner);
        commands.get(id.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Command names in identifier order.
    pub fn names(&self) -> Vec<String> {
        let commands = self.commands.read().unwrap_or_else(PoisonError::into_inner);
        commands.iter().map(|c| c.name().to_string()).collect()
    }
}

/// A mechanism that delivers envelopes to the serving side.
///
/// This trait is object-safe; commands hold their transport as `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn role(&self) -> Role {
        Role::Unconfigured
    }

    /// The commands registered against this transport.
    fn registry(&self) -> &Registry;

    /// Delivers an `[id, args]` envelope and returns the result node.
    ///
    /// # invariants
    /// - Client transports hand the envelope to their peer and block for the reply.
    /// - Server transports route it through [`dispatch`] locally.
    fn invoke_endpoint(&self, envelope: Node) -> Result<Node>;

    fn is_client(&self) -> bool {
        self.role() == Role::Client
    }

    fn is_server(&self) -> bool {
        self.role() == Role::Server
    }

    /// Registers a command and returns its identifier.
    fn add_command(&self, command: Arc<dyn Invoke>) -> CommandId {
        self.registry().add(command)
    }
}

/// Builds the `[id, args]` envelope.
pub fn envelope(id: CommandId, args: Node) -> Node {
    Node::Array(vec![Node::from(id.0), args])
}

/// Splits an envelope into its identifier and argument node.
///
/// A missing argument node is read as the empty node.
pub fn open_envelope(envelope: Node) -> Result<(CommandId, Node)> {
    let items = match envelope {
        Node::Array(items) => items,
        other => {
            return Err(Error::Envelope(format!("expected a sequence, found {}", node::kind(&other))));
        }
    };

    let mut items = items.into_iter();
    let id = items
        .next()
        .and_then(|n| n.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .map(CommandId)
        .ok_or_else(|| Error::Envelope("missing or invalid command identifier".into()))?;
    let args = items.next().unwrap_or_else(node::empty);

    if items.next().is_some() {
        return Err(Error::Envelope("trailing elements after the argument node".into()));
    }

    Ok((id, args))
}

/// Routes an envelope to the registered command and returns its result.
///
/// # Panics
///
/// An identifier with no registered command means the two sides were built
/// from different endpoint declarations. That is a programming fault, not a
/// recoverable condition, and it panics.
pub fn dispatch(registry: &Registry, envelope: Node) -> Result<Node> {
    let (id, args) = open_envelope(envelope)?;

    let Some(command) = registry.get(id) else {
        panic!(
            "no command registered as {} ({} registered); client and server endpoint declarations disagree",
            id,
            registry.len()
        );
    };

    trace!(command = command.name(), %id, "dispatching");
    command.invoke(args)
}
