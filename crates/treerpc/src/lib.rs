//! # Treerpc
//!
//! Strongly-typed commands, dispatched by registration order across a
//! transport boundary, with every value carried as a document tree.
//!
//! ## Architecture
//!
//! - **Serializer**: typed values to and from document nodes, recursively for tuples.
//! - **Command**: a typed call/bind face over a type-erased registry entry.
//! - **Transport**: the registry, the role, and the one delivery primitive.
//! - **Endpoint**: a declared group of commands; same declaration, same identifiers.
//! - **Loopback**: an in-process server/client pair.
//!
//! Envelopes on the wire are `[command_id, [arg0, arg1, ...]]`; replies are the
//! bare result node, empty for commands returning `()`.

mod macros;

pub mod command;
pub mod endpoint;
pub mod error;
pub mod loopback;
pub mod node;
pub mod serializer;
pub mod transport;


pub use crate::command::Command;
pub use crate::endpoint::CommandInfo;
pub use crate::endpoint::Endpoint;
pub use crate::endpoint::Schema;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::loopback::LoopbackClient;
pub use crate::loopback::LoopbackServer;
pub use crate::node::Map;
pub use crate::node::Node;
pub use crate::serializer::Serializer;
pub use crate::transport::CommandId;
pub use crate::transport::Invoke;
pub use crate::transport::Registry;
pub use crate::transport::Role;
pub use crate::transport::Transport;
pub use crate::transport::dispatch;
