//! TCP listener.
//!
//! Binds with a bounded backlog and runs the accept loop. Every accepted
//! socket is moved into its own tokio task, so a slow client never stalls
//! acceptance of the next one. Inside that task the lookup config's
//! `ENABLE_SSL` flag is re-read and, when it is `True`, a server-side TLS
//! handshake is completed before the connection reaches
//! [`handler::handle`]. A failed handshake drops the connection.
//!
//! The number of concurrent connection tasks is unbounded unless
//! `server.max_connections` is set, in which case the accept loop waits for
//! a free slot before accepting more.
//!
//! The loop runs until the shutdown future passed to [`Server::run_until`]
//! resolves (Ctrl-C for the `lineseek serve` command). Tasks already in
//! flight are left to finish.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Semaphore;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::{self, Settings};
use crate::handler;
use crate::policy::{build_source, DocumentSource};
use crate::tls;

/// A bound listener plus everything a connection task needs.
pub struct Server {
    listener: TcpListener,
    source: Arc<dyn DocumentSource>,
    lookup_config: PathBuf,
    acceptor: Option<TlsAcceptor>,
    limiter: Option<Arc<Semaphore>>,
}

impl Server {
    /// Bind the listening socket described by `settings`.
    ///
    /// TLS materials are loaded here if configured. A loading failure is
    /// logged but not fatal: connections that ask for TLS are then dropped.
    pub async fn bind(settings: &Settings, source: Arc<dyn DocumentSource>) -> Result<Self> {
        let address = settings.server.address();
        let listener = listen(&address, settings.server.backlog).await?;

        let acceptor = match (&settings.tls.cert, &settings.tls.key) {
            (Some(cert), Some(key)) => match tls::load_acceptor(cert, key) {
                Ok(acceptor) => Some(acceptor),
                Err(e) => {
                    error!(error = %e, "TLS materials could not be loaded; TLS connections will be dropped");
                    None
                }
            },
            _ => None,
        };

        let limiter = match settings.server.max_connections {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Ok(Self {
            listener,
            source,
            lookup_config: settings.search.lookup_config.clone(),
            acceptor,
            limiter,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            let permit = match &self.limiter {
                Some(limiter) => tokio::select! {
                    _ = &mut shutdown => {
                        info!("shutdown requested, no longer accepting connections");
                        return Ok(());
                    }
                    permit = Arc::clone(limiter).acquire_owned() => {
                        Some(permit.context("connection limiter closed")?)
                    }
                },
                None => None,
            };

            let (socket, peer) = tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };
            debug!(%peer, "connection accepted");

            let source = Arc::clone(&self.source);
            let lookup_config = self.lookup_config.clone();
            let acceptor = self.acceptor.clone();
            tokio::spawn(async move {
                let _permit = permit;
                serve_connection(socket, peer, source, lookup_config, acceptor).await;
            });
        }
    }
}

async fn listen(address: &str, backlog: u32) -> Result<TcpListener> {
    let mut last_err = None;
    for addr in tokio::net::lookup_host(address)
        .await
        .with_context(|| format!("cannot resolve listen address {}", address))?
    {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        if let Err(e) = socket.bind(addr) {
            last_err = Some(e);
            continue;
        }
        match socket.listen(backlog) {
            Ok(listener) => return Ok(listener),
            Err(e) => last_err = Some(e),
        }
    }
    match last_err {
        Some(e) => Err(e).with_context(|| format!("cannot bind {}", address)),
        None => bail!("listen address {} resolved to nothing", address),
    }
}

async fn serve_connection(
    socket: TcpStream,
    peer: SocketAddr,
    source: Arc<dyn DocumentSource>,
    lookup_config: PathBuf,
    acceptor: Option<TlsAcceptor>,
) {
    match config::resolve_tls_flag(&lookup_config).await {
        Some(true) => {
            let Some(acceptor) = acceptor else {
                warn!(%peer, "TLS enabled but no certificate loaded; dropping connection");
                return;
            };
            match acceptor.accept(socket).await {
                Ok(stream) => handler::handle(stream, peer, source.as_ref()).await,
                Err(e) => warn!(%peer, error = %e, "TLS handshake failed; dropping connection"),
            }
        }
        Some(false) => handler::handle(socket, peer, source.as_ref()).await,
        None => {
            debug!(%peer, "TLS flag unspecified, serving plaintext");
            handler::handle(socket, peer, source.as_ref()).await
        }
    }
}

/// Starts the lookup server and serves until Ctrl-C.
///
/// Cached policy loads its snapshot before binding; failing to do so aborts
/// startup since there would be nothing to search.
pub async fn run_server(settings: &Settings) -> Result<()> {
    let source = build_source(settings.search.policy, &settings.search.lookup_config).await?;
    let server = Server::bind(settings, source).await?;

    info!(
        address = %server.local_addr()?,
        policy = ?settings.search.policy,
        lookup_config = %settings.search.lookup_config.display(),
        "lineseek listening"
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}
