//! # Serializer
//!
//! Conversion between typed values and document nodes.
//!
//! ## Rules
//!
//! - **Scalars** map onto the node's native scalars. Integers are range-checked
//!   on the way back in, never truncated.
//! - **Unit** is the empty node, and decoding it consumes nothing.
//! - **Tuples** are sequences of exactly their arity, element by element, to any
//!   nesting depth. A sequence of any other length is an arity error.
//! - **User types** opt in with their own `impl Serializer`. Field names and order
//!   are a designed contract, so nothing is derived behind the user's back.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::error::Error;
use crate::error::Result;
use crate::macros::for_each_integer;
use crate::macros::for_each_tuple;
use crate::node;
use crate::node::Map;
use crate::node::Node;

/// A value that can cross the wire as a single document node.
///
/// Only owned types implement this, so a command cannot hand back a borrowed
/// view whose storage would not survive the round trip.
///
/// ```
/// use treerpc::Map;
/// use treerpc::Node;
/// use treerpc::Result;
/// use treerpc::Serializer;
/// use treerpc::serializer::expect_map;
/// use treerpc::serializer::field;
///
/// struct Point { x: i32, y: i32 }
///
/// impl Serializer for Point {
///     fn serialize(&self) -> Node {
///         let mut map = Map::new();
///         map.insert("x".into(), self.x.serialize());
///         map.insert("y".into(), self.y.serialize());
///         Node::Object(map)
///     }
///
///     fn deserialize(node: Node) -> Result<Self> {
///         let mut map = expect_map(node)?;
///         Ok(Point { x: field(&mut map, "x")?, y: field(&mut map, "y")? })
///     }
/// }
///
/// let p = Point::deserialize(Point { x: 3, y: -4 }.serialize()).unwrap();
/// assert_eq!((p.x, p.y), (3, -4));
/// ```
pub trait Serializer: Sized {
    fn serialize(&self) -> Node;
    fn deserialize(node: Node) -> Result<Self>;
}

fn mismatch(expected: &'static str, found: &Node) -> Error {
    Error::TypeMismatch {
        expected,
        found: node::kind(found).to_string(),
    }
}

/// Unwraps a sequence node.
pub fn expect_sequence(node: Node) -> Result<Vec<Node>> {
    match node {
        Node::Array(items) => Ok(items),
        other => Err(mismatch("sequence", &other)),
    }
}

/// Unwraps a map node.
pub fn expect_map(node: Node) -> Result<Map<String, Node>> {
    match node {
        Node::Object(map) => Ok(map),
        other => Err(mismatch("map", &other)),
    }
}

/// Removes and decodes a required field of a map-shaped value.
pub fn field<T: Serializer>(map: &mut Map<String, Node>, name: &str) -> Result<T> {
    let value = map
        .remove(name)
        .ok_or_else(|| Error::MissingField(name.to_string()))?;
    T::deserialize(value)
}

// ============================================================================
//  SCALARS
// ============================================================================

macro_rules! integer_serializer {
    ($ty:ty, $accessor:ident) => {
        impl Serializer for $ty {
            fn serialize(&self) -> Node {
                Node::from(*self)
            }

            fn deserialize(node: Node) -> Result<Self> {
                node.$accessor()
                    .and_then(|v| <$ty>::try_from(v).ok())
                    .ok_or_else(|| mismatch(stringify!($ty), &node))
            }
        }
    };
}

for_each_integer!(integer_serializer);

// Non-finite floats have no document representation and come out as the
// empty node, which then fails to decode as a float.
impl Serializer for f64 {
    fn serialize(&self) -> Node {
        Node::from(*self)
    }

    fn deserialize(node: Node) -> Result<Self> {
        node.as_f64().ok_or_else(|| mismatch("f64", &node))
    }
}

impl Serializer for f32 {
    fn serialize(&self) -> Node {
        Node::from(*self)
    }

    fn deserialize(node: Node) -> Result<Self> {
        // widened exactly on the way out, so narrowing restores the original
        node.as_f64().map(|v| v as f32).ok_or_else(|| mismatch("f32", &node))
    }
}

impl Serializer for bool {
    fn serialize(&self) -> Node {
        Node::Bool(*self)
    }

    fn deserialize(node: Node) -> Result<Self> {
        node.as_bool().ok_or_else(|| mismatch("bool", &node))
    }
}

impl Serializer for char {
    fn serialize(&self) -> Node {
        Node::String(self.to_string())
    }

    fn deserialize(node: Node) -> Result<Self> {
        let mut chars = node.as_str().map(str::chars);
        match chars.as_mut().map(|c| (c.next(), c.next())) {
            Some((Some(c), None)) => Ok(c),
            _ => Err(mismatch("char", &node)),
        }
    }
}

impl Serializer for String {
    fn serialize(&self) -> Node {
        Node::String(self.clone())
    }

    fn deserialize(node: Node) -> Result<Self> {
        match node {
            Node::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl Serializer for () {
    fn serialize(&self) -> Node {
        node::empty()
    }

    fn deserialize(_node: Node) -> Result<Self> {
        Ok(())
    }
}

// ============================================================================
//  TUPLES
// ============================================================================

macro_rules! tuple_serializer {
    ($len:literal; $($ty:ident $var:ident $idx:tt),+) => {
        impl<$($ty: Serializer),+> Serializer for ($($ty,)+) {
            fn serialize(&self) -> Node {
                Node::Array(vec![$(self.$idx.serialize()),+])
            }

            fn deserialize(node: Node) -> Result<Self> {
                let items = expect_sequence(node)?;
                let found = items.len();
                let [$($var),+]: [Node; $len] = items
                    .try_into()
                    .map_err(|_| Error::Arity { expected: $len, found })?;
                Ok(($($ty::deserialize($var)?,)+))
            }
        }
    };
}

for_each_tuple!(tuple_serializer);

// ============================================================================
//  CONTAINERS
// ============================================================================

impl<T: Serializer> Serializer for Vec<T> {
    fn serialize(&self) -> Node {
        Node::Array(self.iter().map(Serializer::serialize).collect())
    }

    fn deserialize(node: Node) -> Result<Self> {
        expect_sequence(node)?.into_iter().map(T::deserialize).collect()
    }
}

/// `None` is the empty node. `Option<()>` therefore cannot tell `Some(())`
/// from `None`; both decode as `None`.
impl<T: Serializer> Serializer for Option<T> {
    fn serialize(&self) -> Node {
        match self {
            Some(value) => value.serialize(),
            None => node::empty(),
        }
    }

    fn deserialize(node: Node) -> Result<Self> {
        match node {
            Node::Null => Ok(None),
            other => T::deserialize(other).map(Some),
        }
    }
}

impl<T: Serializer> Serializer for Box<T> {
    fn serialize(&self) -> Node {
        self.as_ref().serialize()
    }

    fn deserialize(node: Node) -> Result<Self> {
        T::deserialize(node).map(Box::new)
    }
}

impl<V: Serializer> Serializer for BTreeMap<String, V> {
    fn serialize(&self) -> Node {
        Node::Object(self.iter().map(|(k, v)| (k.clone(), v.serialize())).collect())
    }

    fn deserialize(node: Node) -> Result<Self> {
        expect_map(node)?
            .into_iter()
            .map(|(k, v)| Ok::<_, Error>((k, V::deserialize(v)?)))
            .collect()
    }
}

impl<V: Serializer, S: BuildHasher + Default> Serializer for HashMap<String, V, S> {
    fn serialize(&self) -> Node {
        Node::Object(self.iter().map(|(k, v)| (k.clone(), v.serialize())).collect())
    }

    fn deserialize(node: Node) -> Result<Self> {
        expect_map(node)?
            .into_iter()
            .map(|(k, v)| Ok::<_, Error>((k, V::deserialize(v)?)))
            .collect()
    }
}
