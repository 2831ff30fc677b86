//! # Endpoints
//!
//! An endpoint groups the commands of one logical interface around a single
//! transport. Declaring the same endpoint on both sides is what lines the
//! command identifiers up: the N-th declared command gets identifier N on the
//! client and on the server.
//!
//! The [`endpoint!`](crate::endpoint!) macro generates the grouping struct and
//! registers its commands in declaration order. [`Schema`] describes what was
//! registered, so an application that wants to can compare both sides at startup.

use std::sync::Arc;

use crate::error::Result;
use crate::node::Map;
use crate::node::Node;
use crate::serializer::Serializer;
use crate::serializer::expect_map;
use crate::serializer::field;
use crate::transport::CommandId;
use crate::transport::Transport;

/// The transport a group of commands registers against.
#[derive(Clone)]
pub struct Endpoint {
    transport: Arc<dyn Transport>,
}

impl Endpoint {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

/// Descriptor of one registered command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInfo {
    pub id: CommandId,
    pub name: String,
    /// Type names of the argument tuple and return type. Diagnostic only:
    /// type names are stable within one build, not across compilers.
    pub signature: String,
}

impl Serializer for CommandInfo {
    fn serialize(&self) -> Node {
        let mut map = Map::new();
        map.insert("id".into(), self.id.0.serialize());
        map.insert("name".into(), self.name.serialize());
        map.insert("signature".into(), self.signature.serialize());
        Node::Object(map)
    }

    fn deserialize(node: Node) -> Result<Self> {
        let mut map = expect_map(node)?;
        Ok(CommandInfo {
            id: CommandId(field(&mut map, "id")?),
            name: field(&mut map, "name")?,
            signature: field(&mut map, "signature")?,
        })
    }
}

/// Ordered descriptors of every command an endpoint registered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    pub commands: Vec<CommandInfo>,
}

impl Schema {
    /// Describes the first divergence between two schemas, if any.
    pub fn mismatch(&self, other: &Schema) -> Option<String> {
        for (mine, theirs) in self.commands.iter().zip(other.commands.iter()) {
            if mine.name != theirs.name || mine.signature != theirs.signature {
                return Some(format!(
                    "{}: '{}' {} vs '{}' {}",
                    mine.id, mine.name, mine.signature, theirs.name, theirs.signature
                ));
            }
        }

        if self.commands.len() != other.commands.len() {
            return Some(format!(
                "{} commands vs {} commands",
                self.commands.len(),
                other.commands.len()
            ));
        }

        None
    }
}

impl Serializer for Schema {
    fn serialize(&self) -> Node {
        self.commands.serialize()
    }

    fn deserialize(node: Node) -> Result<Self> {
        Ok(Schema {
            commands: Vec::deserialize(node)?,
        })
    }
}

/// Declares an endpoint struct whose commands register in declaration order.
///
/// ```
/// use treerpc::Command;
/// use treerpc::LoopbackClient;
/// use treerpc::LoopbackServer;
///
/// treerpc::endpoint! {
///     pub struct Calculator {
///         pub add: Command<i64, (i64, i64)>,
///         pub reset: Command<()>,
///     }
/// }
///
/// let server = LoopbackServer::new();
/// let served = Calculator::new(server.clone());
/// served.add.bind(|a, b| a + b).unwrap();
///
/// let client = Calculator::new(LoopbackClient::new(server));
/// assert_eq!(client.add.call(2, 40).unwrap(), 42);
/// assert_eq!(client.schema(), served.schema());
/// ```
#[macro_export]
macro_rules! endpoint {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            endpoint: $crate::Endpoint,
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $name {
            /// Registers every command with `transport`, in declaration order.
            $vis fn new(transport: ::std::sync::Arc<dyn $crate::Transport>) -> Self {
                let endpoint = $crate::Endpoint::new(transport);
                $(
                    let $field = <$ty>::new(&endpoint, ::std::stringify!($field));
                )*
                Self {
                    endpoint,
                    $($field,)*
                }
            }

            #[allow(dead_code)]
            $vis fn endpoint(&self) -> &$crate::Endpoint {
                &self.endpoint
            }

            #[allow(dead_code)]
            $vis fn schema(&self) -> $crate::Schema {
                $crate::Schema {
                    commands: ::std::vec![$(self.$field.info(),)*],
                }
            }
        }
    };
}
