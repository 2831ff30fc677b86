//! # Treesock
//!
//! Request/response TCP transport for treerpc endpoints.
//!
//! Each message is a node encoded as one line of compact text. A request
//! carries an `[id, args]` envelope; its reply carries the bare result node.
//! One reply per request, on the same connection, with no pipelining.

pub mod client;
pub mod config;
pub mod frame;
pub mod server;


pub use crate::client::SocketClient;
pub use crate::config::SocketConfig;
pub use crate::server::SocketServer;
