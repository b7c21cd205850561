//! SBI server lifecycle.
//!
//! ```text
//! Unstarted ──start──▶ Serving ──shutdown──▶ ShuttingDown ──▶ Closed
//!     └────────────────shutdown────────────────────────────────▲
//! ```
//!
//! The accept loop runs on a task registered with the caller's
//! [`TaskTracker`]. Every accepted connection gets its own task, tracked
//! separately so shutdown can wait for them to drain.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use axum::Router;
use common::ServiceName;
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower::Service;
use tracing::{debug, error, info, warn, Instrument, Span};

use super::auth::RouterAuthorizationCheck;
use super::binder::{self, BoundServer, Scheme};
use super::error::SbiError;
use super::router::{self, Route};
use super::{ConfigProvider, SecurityContextProvider};

/// Drain deadline used when the NF does not configure one.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Observable lifecycle state of an [`SbiServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Unstarted,
    Serving,
    ShuttingDown,
    Closed,
}

/// What a call to [`SbiServer::shutdown`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All connections finished within the deadline.
    Drained,
    /// The deadline elapsed; remaining connections were force-closed.
    TimedOut,
    /// The server was never started; the listener was released.
    NotStarted,
    /// Another shutdown already ran or is running.
    AlreadyClosed,
}

enum Inner {
    Unstarted(BoundServer),
    Serving(Running),
    ShuttingDown,
    Closed,
}

impl Inner {
    fn state(&self) -> ServerState {
        match self {
            Inner::Unstarted(_) => ServerState::Unstarted,
            Inner::Serving(_) => ServerState::Serving,
            Inner::ShuttingDown => ServerState::ShuttingDown,
            Inner::Closed => ServerState::Closed,
        }
    }
}

struct Running {
    shutdown: CancellationToken,
    force_close: CancellationToken,
    connections: TaskTracker,
    accept_task: JoinHandle<()>,
}

/// Resolves once the accept loop has exited: `Some(err)` if it died with an
/// [`SbiError::AcceptLoop`], `None` if it stopped because of shutdown.
///
/// The process supervisor is expected to treat `Some` as fatal.
pub struct FatalErrorSignal {
    rx: oneshot::Receiver<SbiError>,
}

impl Future for FatalErrorSignal {
    type Output = Option<SbiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// The UDR's SBI server.
///
/// Owns the bound listener exclusively. `start` and `shutdown` take `&self`
/// so the server can be shared with a signal handler; both are serialized on
/// an internal lock.
pub struct SbiServer {
    inner: Arc<Mutex<Inner>>,
    local_addr: SocketAddr,
    scheme: Scheme,
    shutdown_timeout: Duration,
    span: Span,
}

impl SbiServer {
    /// Build the router for `routes` behind the `nudr-dr` authorization gate
    /// and bind it according to the NF's SBI configuration.
    ///
    /// `span` is the logging handle for everything this server emits.
    ///
    /// # Errors
    ///
    /// [`SbiError::Configuration`] or [`SbiError::Bind`]; both should abort
    /// startup.
    pub async fn new<N>(nf: &N, routes: Vec<Route>, span: Span) -> Result<Self, SbiError>
    where
        N: ConfigProvider + SecurityContextProvider + ?Sized,
    {
        let gate = RouterAuthorizationCheck::new(ServiceName::NudrDr, nf.security_context());
        let router = router::new_router(gate, routes);

        let bound = binder::bind(nf.sbi_config(), router, nf.tls_key_log_path())
            .instrument(span.clone())
            .await
            .inspect_err(|e| span.in_scope(|| error!(error = %e, "bind router error")))?;
        let local_addr = bound
            .local_addr()
            .map_err(|e| SbiError::bind(nf.sbi_config().binding_ipv4.clone(), e))?;

        Ok(Self {
            scheme: bound.scheme(),
            inner: Arc::new(Mutex::new(Inner::Unstarted(bound))),
            local_addr,
            shutdown_timeout: nf.shutdown_timeout(),
            span,
        })
    }

    /// Override the drain deadline used by [`SbiServer::shutdown`].
    #[cfg(test)]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn state(&self) -> ServerState {
        self.lock().state()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    /// Start serving in the background and return immediately.
    ///
    /// The accept loop is spawned on `tasks`, so the caller can wait for it
    /// with [`TaskTracker::wait`]. The returned signal reports whether the
    /// loop died on its own.
    ///
    /// # Errors
    ///
    /// [`SbiError::InvalidState`] unless the server is `Unstarted`.
    pub fn start(&self, tasks: &TaskTracker) -> Result<FatalErrorSignal, SbiError> {
        let mut inner = self.lock();
        let bound = match std::mem::replace(&mut *inner, Inner::Closed) {
            Inner::Unstarted(bound) => bound,
            other => {
                let state = other.state();
                *inner = other;
                return Err(SbiError::InvalidState(state));
            }
        };

        let shutdown = CancellationToken::new();
        let force_close = CancellationToken::new();
        let connections = TaskTracker::new();
        let (fatal_tx, fatal_rx) = oneshot::channel();

        let accept_loop = AcceptLoop {
            listener: bound.listener,
            template: ConnectionTemplate {
                tls: bound.tls,
                router: bound.router,
                shutdown: shutdown.clone(),
                force_close: force_close.clone(),
            },
            connections: connections.clone(),
        };

        self.span.in_scope(|| {
            info!(addr = %self.local_addr, scheme = %self.scheme, "starting SBI server")
        });
        let accept_task = tasks.spawn(
            async move {
                if let Err(e) = accept_loop.run().await {
                    error!(error = %e, "SBI server stopped serving");
                    let _ = fatal_tx.send(e);
                }
            }
            .instrument(self.span.clone()),
        );

        *inner = Inner::Serving(Running {
            shutdown,
            force_close,
            connections,
            accept_task,
        });
        Ok(FatalErrorSignal { rx: fatal_rx })
    }

    /// Stop accepting, drain in-flight requests and close the server.
    ///
    /// Waits at most the drain deadline for open connections; past it they
    /// are force-closed and the timeout is logged, not returned as an error.
    /// Safe to call any number of times.
    ///
    /// The drain runs on its own task: dropping the returned future does not
    /// interrupt it, and the server still reaches `Closed`.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        let running = {
            let mut inner = self.lock();
            match std::mem::replace(&mut *inner, Inner::ShuttingDown) {
                Inner::Serving(running) => running,
                Inner::Unstarted(bound) => {
                    drop(bound);
                    *inner = Inner::Closed;
                    self.span
                        .in_scope(|| info!("SBI server closed before it was started"));
                    return ShutdownOutcome::NotStarted;
                }
                other => {
                    *inner = other;
                    return ShutdownOutcome::AlreadyClosed;
                }
            }
        };

        let inner = self.inner.clone();
        let timeout = self.shutdown_timeout;
        let drain_task = tokio::spawn(
            async move {
                let outcome = drain(running, timeout).await;
                *lock(&inner) = Inner::Closed;
                outcome
            }
            .instrument(self.span.clone()),
        );

        match drain_task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.span
                    .in_scope(|| error!(error = %e, "SBI drain task failed"));
                *self.lock() = Inner::Closed;
                ShutdownOutcome::TimedOut
            }
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stop the accept loop, then wait up to `timeout` for open connections
/// before force-closing them.
async fn drain(running: Running, timeout: Duration) -> ShutdownOutcome {
    info!(timeout = ?timeout, "shutting down SBI server");
    running.shutdown.cancel();

    // The listener is owned by the accept task and closes when it returns.
    if let Err(e) = running.accept_task.await {
        warn!(error = %e, "SBI accept task ended abnormally");
    }

    running.connections.close();
    match tokio::time::timeout(timeout, running.connections.wait()).await {
        Ok(()) => {
            info!("SBI server drained");
            ShutdownOutcome::Drained
        }
        Err(_) => {
            let err = SbiError::ShutdownTimeout(timeout);
            warn!(
                error = %err,
                open_connections = running.connections.len(),
                "HTTP server shutdown failed, closing remaining connections"
            );
            running.force_close.cancel();
            running.connections.wait().await;
            ShutdownOutcome::TimedOut
        }
    }
}

struct AcceptLoop {
    listener: TcpListener,
    template: ConnectionTemplate,
    connections: TaskTracker,
}

impl AcceptLoop {
    /// Accept until shutdown is signalled. Errors tied to a single
    /// connection are skipped; anything else ends the loop.
    async fn run(self) -> Result<(), SbiError> {
        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = self.template.shutdown.cancelled() => {
                    debug!("accept loop stopped by shutdown");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) if is_connection_error(&e) => {
                        debug!(error = %e, "accept error on single connection");
                        continue;
                    }
                    Err(e) => return Err(SbiError::AcceptLoop(e)),
                },
            };

            debug!(%peer, "accepted SBI connection");
            let conn = self.template.clone();
            self.connections
                .spawn(conn.serve(stream, peer).in_current_span());
        }
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
    )
}

/// Everything one connection task needs.
#[derive(Clone)]
struct ConnectionTemplate {
    tls: Option<TlsAcceptor>,
    router: Router,
    shutdown: CancellationToken,
    force_close: CancellationToken,
}

impl ConnectionTemplate {
    async fn serve(self, stream: TcpStream, peer: SocketAddr) {
        let Some(acceptor) = self.tls.clone() else {
            self.serve_io(stream, peer).await;
            return;
        };

        let handshake = tokio::select! {
            _ = self.shutdown.cancelled() => return,
            res = acceptor.accept(stream) => res,
        };
        match handshake {
            Ok(tls_stream) => self.serve_io(tls_stream, peer).await,
            Err(e) => debug!(%peer, error = %e, "TLS handshake failed"),
        }
    }

    /// Serve HTTP/1.1 or HTTP/2 on `io` until the peer closes, shutdown
    /// drains it, or the drain deadline forces it closed.
    async fn serve_io<I>(&self, io: I, peer: SocketAddr)
    where
        I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let router = self.router.clone();
        let service = hyper::service::service_fn(move |req: hyper::Request<Incoming>| {
            router.clone().call(req)
        });

        let builder = auto::Builder::new(TokioExecutor::new());
        let conn = builder.serve_connection(TokioIo::new(io), service);
        tokio::pin!(conn);

        tokio::select! {
            res = conn.as_mut() => {
                log_connection_end(res, peer);
                return;
            }
            _ = self.shutdown.cancelled() => {}
        }

        conn.as_mut().graceful_shutdown();
        tokio::select! {
            res = conn.as_mut() => log_connection_end(res, peer),
            _ = self.force_close.cancelled() => {
                debug!(%peer, "connection force-closed after drain deadline");
            }
        }
    }
}

fn log_connection_end(
    res: Result<(), Box<dyn std::error::Error + Send + Sync>>,
    peer: SocketAddr,
) {
    match res {
        Ok(()) => debug!(%peer, "connection closed"),
        Err(e) => debug!(%peer, error = %e, "connection ended with error"),
    }
}
