//! # Socket Configuration
//!
//! Limits and timeouts shared by the socket server and client. Built with a
//! fluent API, optionally seeded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

pub const ENV_MAX_MESSAGE_BYTES: &str = "TREESOCK_MAX_MESSAGE_BYTES";
pub const ENV_READ_TIMEOUT_MS: &str = "TREESOCK_READ_TIMEOUT_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "TREESOCK_CONNECT_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketConfig {
    /// Largest message either side will read, terminator excluded.
    pub max_message_bytes: usize,
    /// How long a client waits for a reply. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// How long a client waits to establish a connection. `None` uses the
    /// operating system's default.
    pub connect_timeout: Option<Duration>,
    /// Disables Nagle's algorithm on every connection.
    pub nodelay: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            read_timeout: None,
            connect_timeout: None,
            nodelay: true,
        }
    }
}

impl SocketConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by whichever `TREESOCK_*` variables are set.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    pub fn max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// A zero duration clears the timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = nonzero(timeout);
        self
    }

    /// A zero duration clears the timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = nonzero(timeout);
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    /// Unset variables are skipped; unparsable ones are logged and skipped.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(bytes) = parse_var(&lookup, ENV_MAX_MESSAGE_BYTES) {
            self.max_message_bytes = bytes;
        }
        if let Some(ms) = parse_var(&lookup, ENV_READ_TIMEOUT_MS) {
            self.read_timeout = timeout_from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_CONNECT_TIMEOUT_MS) {
            self.connect_timeout = timeout_from_millis(ms);
        }
        self
    }
}

// zero means "no timeout"; the socket APIs reject a zero duration
fn nonzero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

fn timeout_from_millis(ms: u64) -> Option<Duration> {
    nonzero(Duration::from_millis(ms))
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => {
            debug!(variable = name, value = %raw, "socket config override");
            Some(value)
        }
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable socket config override");
            None
        }
    }
}
