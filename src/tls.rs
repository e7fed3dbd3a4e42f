//! TLS materials.
//!
//! The server side loads one PEM certificate chain and one private key and
//! performs no client-certificate verification. The client side trusts a
//! single PEM CA bundle. Both use the `ring` crypto provider explicitly.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::error::{LookupError, Result};

fn tls_err(context: &str, path: &Path, e: impl std::fmt::Display) -> LookupError {
    LookupError::Tls(format!("{} {}: {}", context, path.display(), e))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| tls_err("cannot open certificate", path, e))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| tls_err("invalid certificate", path, e))?;
    if certs.is_empty() {
        return Err(tls_err("no certificate found in", path, "empty PEM"));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| tls_err("cannot open private key", path, e))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| tls_err("invalid private key", path, e))?
        .ok_or_else(|| tls_err("no private key found in", path, "empty PEM"))
}

/// Build a server-side acceptor from a certificate chain and private key.
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| LookupError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| tls_err("certificate rejected", cert_path, e))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Build a client-side connector trusting the CA certificates in `ca_path`.
pub fn load_connector(ca_path: &Path) -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        roots
            .add(cert)
            .map_err(|e| tls_err("untrusted CA certificate", ca_path, e))?;
    }

    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| LookupError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Parse the name the client expects on the server certificate.
pub fn server_name(name: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(name.to_string())
        .map_err(|e| LookupError::Tls(format!("invalid server name {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_load_acceptor_from_fixtures() {
        assert!(load_acceptor(&fixture("server.pem"), &fixture("server.key")).is_ok());
    }

    #[test]
    fn test_load_connector_from_fixture_ca() {
        assert!(load_connector(&fixture("ca.pem")).is_ok());
    }

    #[test]
    fn test_missing_cert_is_tls_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_acceptor(&tmp.path().join("none.pem"), &fixture("server.key"))
            .err()
            .unwrap();
        assert_eq!(err.code(), "tls");
    }

    #[test]
    fn test_empty_pem_rejected() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty.pem");
        fs::write(&empty, "").unwrap();
        assert!(load_acceptor(&empty, &fixture("server.key")).is_err());
        assert!(load_acceptor(&fixture("server.pem"), &empty).is_err());
    }

    #[test]
    fn test_server_name() {
        assert!(server_name("localhost").is_ok());
        assert!(server_name("127.0.0.1").is_ok());
        assert!(server_name("bad name!").is_err());
    }
}
