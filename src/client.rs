//! Thin request client.
//!
//! Opens one connection, optionally negotiates TLS, writes the query in a
//! single write and returns whatever the server sends before closing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::MAX_REQUEST_BYTES;
use crate::tls;

/// TLS options for [`send_query`].
#[derive(Debug, Clone)]
pub struct ClientTls {
    /// PEM file with the CA that signed the server certificate.
    pub ca: PathBuf,
    /// Name expected on the server certificate.
    pub server_name: String,
}

/// Send `query` to the server at `addr` and return its response line.
pub async fn send_query(addr: &str, query: &str, tls: Option<&ClientTls>) -> Result<String> {
    if query.is_empty() {
        anyhow::bail!("query must not be empty");
    }
    if query.len() > MAX_REQUEST_BYTES {
        anyhow::bail!(
            "query is {} bytes; the server reads at most {}",
            query.len(),
            MAX_REQUEST_BYTES
        );
    }

    let socket = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;

    match tls {
        Some(opts) => {
            let connector = tls::load_connector(&opts.ca)?;
            let name = tls::server_name(&opts.server_name)?;
            let stream = connector
                .connect(name, socket)
                .await
                .context("TLS handshake failed")?;
            exchange(stream, query).await
        }
        None => exchange(socket, query).await,
    }
}

async fn exchange<S>(mut stream: S, query: &str) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(query.as_bytes()).await?;
    stream.flush().await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;
    Ok(String::from_utf8_lossy(&reply).into_owned())
}
