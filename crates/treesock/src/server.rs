//! # Socket Server
//!
//! Serves a registry over TCP. One dedicated OS thread runs a single-threaded
//! tokio runtime; every connection is a task on that runtime and every
//! dispatch runs synchronously inside its task, so at most one request is
//! being handled at any moment.
//!
//! ## Failure Policy
//!
//! - **Bad Request**: a read error, an oversized or undecodable message, a
//!   malformed envelope, or a failing handler is logged and the connection is
//!   closed without a reply. Other connections are unaffected.
//! - **Unknown Command**: dispatch panics. The panic is re-raised on the
//!   server thread, which stops serving. A later `start` serves again.
//! - **Shutdown**: [`SocketServer::stop`] signals the loop, which exits cleanly,
//!   and joins the thread before returning.

use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread::JoinHandle;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use treerpc::Error;
use treerpc::Node;
use treerpc::Registry;
use treerpc::Result;
use treerpc::Role;
use treerpc::Transport;
use treerpc::dispatch;

use crate::config::SocketConfig;
use crate::frame;

/// The serving loop while it runs.
struct Running {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

/// Server-role transport listening on a TCP socket.
pub struct SocketServer {
    registry: Arc<Registry>,
    config: SocketConfig,
    running: Mutex<Option<Running>>,
}

impl SocketServer {
    pub fn new() -> Arc<Self> {
        Self::with_config(SocketConfig::default())
    }

    pub fn with_config(config: SocketConfig) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(Registry::new()),
            config,
            running: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Binds `addr` and starts serving on a dedicated thread.
    ///
    /// Port 0 picks a free port; the address actually bound is returned.
    /// Handlers may be bound before or after this call.
    pub fn start(&self, addr: impl ToSocketAddrs) -> Result<SocketAddr> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = running.as_ref() {
            if !current.thread.is_finished() {
                return Err(Error::Transport(format!("already serving on {}", current.addr)));
            }
            // the loop died on its own; reap it before serving again
            if let Some(stale) = running.take() {
                retire(stale);
            }
        }

        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(listener)?
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name(format!("treesock-{}", local))
            .spawn(move || {
                runtime.block_on(accept_loop(listener, registry, config, shutdown_rx));
            })?;

        info!(addr = %local, "socket server listening");
        *running = Some(Running {
            addr: local,
            shutdown,
            thread,
        });
        Ok(local)
    }

    /// Signals the serving loop to exit and waits for its thread.
    /// Does nothing if the server is not running.
    pub fn stop(&self) {
        let Some(running) = self.running.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };

        retire(running);
    }

    /// The bound address, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running.as_ref().map(|r| r.addr)
    }

    /// True while the serving thread is alive.
    pub fn is_running(&self) -> bool {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running.as_ref().is_some_and(|r| !r.thread.is_finished())
    }
}

/// Signals the loop and joins its thread, logging how it ended.
fn retire(running: Running) {
    // the loop may already be gone, in which case nobody is listening
    let _ = running.shutdown.send(true);

    match running.thread.join() {
        Ok(()) => info!(addr = %running.addr, "socket server stopped"),
        Err(_) => error!(addr = %running.addr, "socket server thread panicked"),
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Transport for SocketServer {
    fn role(&self) -> Role {
        Role::Server
    }

    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn invoke_endpoint(&self, envelope: Node) -> Result<Node> {
        dispatch(&self.registry, envelope)
    }
}

// ============================================================================
//  SERVING LOOP
// ============================================================================

async fn accept_loop(
    listener: TcpListener,
    registry: Arc<Registry>,
    config: SocketConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("socket server shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(config.nodelay) {
                        debug!(%peer, error = %e, "could not set nodelay");
                    }
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&registry),
                        config.max_message_bytes,
                        shutdown.clone(),
                    ));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        std::panic::resume_unwind(e.into_panic());
                    }
                }
            }
        }
    }

    connections.shutdown().await;
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<Registry>,
    limit: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(%peer, "connection accepted");
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let request = tokio::select! {
            _ = shutdown.changed() => break,
            request = frame::read_message_async(&mut reader, limit) => request,
        };

        let envelope = match request {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                debug!(%peer, "connection closed by peer");
                break;
            }
            Err(e) => {
                warn!(%peer, error = %e, "unreadable request, closing connection");
                break;
            }
        };

        let reply = match dispatch(&registry, envelope) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%peer, error = %e, "request failed, closing connection without a reply");
                break;
            }
        };

        if let Err(e) = frame::write_message_async(&mut writer, &reply).await {
            warn!(%peer, error = %e, "could not send reply, closing connection");
            break;
        }
    }
}
