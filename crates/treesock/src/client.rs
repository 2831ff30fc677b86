//! # Socket Client
//!
//! Client-role transport over one blocking TCP connection. Each call writes
//! one request and blocks for exactly one reply; calls from several threads
//! queue on the connection lock, so there is never more than one request in
//! flight.
//!
//! A failed exchange leaves the stream in an unknown state, so the connection
//! is dropped and the next call opens a fresh one.

use std::io::BufReader;
use std::io::ErrorKind;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use tracing::debug;
use tracing::warn;

use treerpc::Error;
use treerpc::Node;
use treerpc::Registry;
use treerpc::Result;
use treerpc::Role;
use treerpc::Transport;

use crate::config::SocketConfig;
use crate::frame;

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    fn open(addr: SocketAddr, config: &SocketConfig) -> Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout)?;

        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    fn exchange(&mut self, request: &[u8], limit: usize) -> Result<Node> {
        self.writer.write_all(request)?;
        self.writer.flush()?;

        match frame::read_message(&mut self.reader, limit) {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(Error::NoReply),
            Err(Error::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(Error::Timeout)
            }
            Err(Error::Io(e)) => {
                debug!(error = %e, "receive failed");
                Err(Error::NoReply)
            }
            Err(Error::Transport(reason)) => {
                debug!(%reason, "receive failed");
                Err(Error::NoReply)
            }
            Err(e) => Err(e),
        }
    }
}

/// Client-role transport connected to a [`SocketServer`](crate::SocketServer).
pub struct SocketClient {
    addr: SocketAddr,
    config: SocketConfig,
    registry: Registry,
    connection: Mutex<Option<Connection>>,
}

impl SocketClient {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Arc<Self>> {
        Self::connect_with(addr, SocketConfig::default())
    }

    /// Connects to the first address that accepts.
    pub fn connect_with(addr: impl ToSocketAddrs, config: SocketConfig) -> Result<Arc<Self>> {
        let mut last_error = None;

        for candidate in addr.to_socket_addrs()? {
            match Connection::open(candidate, &config) {
                Ok(connection) => {
                    debug!(addr = %candidate, "socket client connected");
                    return Ok(Arc::new(Self {
                        addr: candidate,
                        config,
                        registry: Registry::new(),
                        connection: Mutex::new(Some(connection)),
                    }));
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Transport("address resolved to nothing".into())))
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }
}

impl Transport for SocketClient {
    fn role(&self) -> Role {
        Role::Client
    }

    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn invoke_endpoint(&self, envelope: Node) -> Result<Node> {
        let request = frame::encode(&envelope)?;
        let limit = self.config.max_message_bytes;
        if request.len() - 1 > limit {
            return Err(Error::MessageTooLarge {
                limit,
                size: request.len() - 1,
            });
        }

        let mut slot = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut connection = match slot.take() {
            Some(connection) => connection,
            None => {
                debug!(addr = %self.addr, "reconnecting");
                Connection::open(self.addr, &self.config)?
            }
        };

        match connection.exchange(&request, limit) {
            Ok(reply) => {
                *slot = Some(connection);
                Ok(reply)
            }
            Err(e) => {
                warn!(addr = %self.addr, error = %e, "exchange failed, dropping connection");
                Err(e)
            }
        }
    }
}
