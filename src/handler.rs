//! Per-connection request handling.
//!
//! [`handle`] owns one accepted connection end to end: read one request,
//! search, write one response line, close. Nothing escapes it. A missing
//! data file is answered with an explicit error line; any other failure is
//! logged and the connection is dropped without a response.

use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::error::{LookupError, Result};
use crate::policy::DocumentSource;
use crate::protocol::{RequestRecord, ResponseRecord, MAX_REQUEST_BYTES};
use crate::search::search;

/// Handle one connection. Errors are logged here and never propagated.
pub async fn handle<S>(mut conn: S, peer: SocketAddr, source: &dyn DocumentSource)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    match respond(&mut conn, peer, source).await {
        Ok(response) => {
            debug!(
                %peer,
                request = %response.request,
                status = ?response.status,
                elapsed_ms = response.elapsed_ms().unwrap_or_default(),
                "request served"
            );
        }
        Err(e) => {
            error!(%peer, code = e.code(), error = %e, "connection abandoned");
        }
    }
    // Dropping `conn` closes the socket on every path.
}

/// Read the request, build the response and write it. Returns the response
/// that was sent.
pub async fn respond<S>(
    conn: &mut S,
    peer: SocketAddr,
    source: &dyn DocumentSource,
) -> Result<ResponseRecord>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut buf = [0u8; MAX_REQUEST_BYTES];
    let n = conn.read(&mut buf).await?;
    let request = RequestRecord::from_bytes(&buf[..n], peer);

    let response = match lookup(&request, source).await {
        Ok(response) => response,
        Err(e) if e.is_data_file() => {
            warn!(%peer, error = %e, "data file unavailable");
            ResponseRecord::file_not_found(&request, describe_missing(&e))
        }
        Err(e) => return Err(e),
    };

    conn.write_all(response.to_wire().as_bytes()).await?;
    // The client already has its answer; a failed close is not worth more.
    if let Err(e) = conn.shutdown().await {
        debug!(%peer, error = %e, "shutdown after response failed");
    }
    Ok(response)
}

async fn lookup(request: &RequestRecord, source: &dyn DocumentSource) -> Result<ResponseRecord> {
    let document = source.document().await?;
    let start = Instant::now();
    let outcome = search(&request.text, document).await?;
    let elapsed = start.elapsed();
    Ok(ResponseRecord::from_outcome(request, outcome, elapsed))
}

fn describe_missing(e: &LookupError) -> String {
    match e {
        LookupError::DataFile { path, .. } => path.display().to_string(),
        LookupError::NoActiveFile(config) => {
            format!("no data file declared in {}", config.display())
        }
        other => other.to_string(),
    }
}
