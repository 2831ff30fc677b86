//! # Document Value
//!
//! The tree every argument and result travels as: scalars, ordered
//! sequences, and key-ordered maps. The node type is `serde_json::Value`;
//! this module is the only place that knows how it becomes text.

use crate::error::Result;

pub use serde_json::Map;

/// A node in the document tree.
pub type Node = serde_json::Value;

/// The node produced for unit values and for an empty argument list.
pub fn empty() -> Node {
    Node::Null
}

/// Encodes a node as compact, single-line text.
///
/// Newlines inside strings are escaped, so the output never contains a raw
/// `\n` and can be used as a line-terminated message.
pub fn to_text(node: &Node) -> Result<String> {
    Ok(serde_json::to_string(node)?)
}

/// Decodes a node from text produced by [`to_text`].
pub fn from_text(text: &str) -> Result<Node> {
    Ok(serde_json::from_str(text)?)
}

/// Decodes a node from raw bytes; invalid UTF-8 is a codec error.
pub fn from_bytes(bytes: &[u8]) -> Result<Node> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Names the shape of a node, for diagnostics.
pub fn kind(node: &Node) -> &'static str {
    match node {
        Node::Null => "null",
        Node::Bool(_) => "bool",
        Node::Number(_) => "number",
        Node::String(_) => "string",
        Node::Array(_) => "sequence",
        Node::Object(_) => "map",
    }
}
