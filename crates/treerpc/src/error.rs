//! # Error Definitions
//!
//! Every way a command call can fail, from misuse at the call site down to
//! a lost reply on the wire.

use std::fmt;

use crate::transport::Role;

#[derive(Debug)]
pub enum Error {
    /// A command was used from the wrong side: a client tried to bind, or a
    /// server (or unconfigured) transport tried to call.
    Role {
        command: String,
        required: Role,
        actual: Role,
    },
    /// Dispatch reached a command that has no handler bound.
    Unbound { command: String },
    /// A tuple-like value was decoded from a sequence of the wrong length.
    Arity { expected: usize, found: usize },
    /// A node did not have the shape the target type needs.
    TypeMismatch { expected: &'static str, found: String },
    /// A map-shaped value lacked a required field.
    MissingField(String),
    /// A request was not shaped `[id, args]`.
    Envelope(String),
    /// Text encoding or decoding of a node failed.
    Codec(serde_json::Error),
    /// The underlying connection failed while sending.
    Io(std::io::Error),
    /// A request was sent but no reply came back.
    NoReply,
    /// The configured read timeout elapsed before a reply arrived.
    Timeout,
    /// A message exceeded the configured size limit.
    MessageTooLarge { limit: usize, size: usize },
    /// Any other delivery failure.
    Transport(String),
}

impl Error {
    /// True for misuse of a command from the wrong role.
    pub fn is_role_violation(&self) -> bool {
        matches!(self, Self::Role { .. })
    }

    /// True when the command had no handler at dispatch time.
    pub fn is_unbound(&self) -> bool {
        matches!(self, Self::Unbound { .. })
    }

    /// True for failures of the delivery mechanism rather than of the
    /// command or its values.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::NoReply | Self::Timeout | Self::MessageTooLarge { .. } | Self::Transport(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { command, required, actual } => {
                write!(f, "Command '{}' requires a {} transport, but it is bound to a {} transport", command, required, actual)
            }
            Self::Unbound { command } => write!(f, "Command '{}' was called with no handler bound", command),
            Self::Arity { expected, found } => {
                write!(f, "Arity mismatch: expected a sequence of {} elements, found {}", expected, found)
            }
            Self::TypeMismatch { expected, found } => write!(f, "Type mismatch: expected {}, found {}", expected, found),
            Self::MissingField(name) => write!(f, "Missing field '{}'", name),
            Self::Envelope(msg) => write!(f, "Malformed envelope: {}", msg),
            Self::Codec(e) => write!(f, "Codec error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::NoReply => write!(f, "No reply received"),
            Self::Timeout => write!(f, "Timed out waiting for a reply"),
            Self::MessageTooLarge { limit, size } => {
                write!(f, "Message of at least {} bytes exceeds the {} byte limit", size, limit)
            }
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
