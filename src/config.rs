//! Configuration for the lookup server.
//!
//! Two layers are read here:
//!
//! - the **lookup config**, a flat `key=value` text file that declares the
//!   candidate data files (`linuxpath=`) and whether TLS is on
//!   (`ENABLE_SSL=`). It is re-read on every request in re-read mode, so
//!   its resolvers never fail: an unreadable file degrades to an empty
//!   candidate list or an unspecified TLS flag.
//! - the **server settings**, a TOML file with listener, search-policy and
//!   TLS-material settings. Every field has a default.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key prefix for candidate data-file paths. Repeatable, order preserved.
pub const PATH_KEY: &str = "linuxpath";

/// Key controlling TLS on accepted connections.
pub const TLS_KEY: &str = "ENABLE_SSL";

/// The only value of [`TLS_KEY`] that turns TLS on. Case-sensitive.
pub const TLS_TRUE_TOKEN: &str = "True";

// ============ Lookup config (key=value) ============

/// Extract candidate data-file paths from lookup-config text, in file order.
///
/// A line contributes when it starts with `linuxpath=`; its value is the
/// text after the first `=`, trimmed. Other lines are ignored.
pub fn parse_paths(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            line.strip_prefix(PATH_KEY)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|value| value.trim().to_string())
        })
        .collect()
}

/// Extract the tri-state TLS flag from lookup-config text.
///
/// `Some(true)` only for the exact token `True`, `Some(false)` for any other
/// value, `None` when the key is absent. Whitespace around the key and value
/// is ignored, so `ENABLE_SSL = True` is accepted.
pub fn parse_tls_flag(content: &str) -> Option<bool> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == TLS_KEY).then(|| value.trim() == TLS_TRUE_TOKEN)
    })
}

async fn read_lookup_config(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "lookup config unreadable");
            None
        }
    }
}

/// Read the lookup config and return its candidate data-file paths.
///
/// An unreadable file yields an empty list and a warning, never an error.
pub async fn resolve_paths(path: &Path) -> Vec<String> {
    read_lookup_config(path)
        .await
        .map(|content| parse_paths(&content))
        .unwrap_or_default()
}

/// Read the lookup config and return its TLS flag.
///
/// A missing file or key yields `None`, which is distinct from an explicit
/// `Some(false)`.
pub async fn resolve_tls_flag(path: &Path) -> Option<bool> {
    read_lookup_config(path)
        .await
        .and_then(|content| parse_tls_flag(&content))
}

// ============ Server settings (TOML) ============

/// Search policy: how the active data file is consulted.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Re-read the lookup config and rescan the data file on every request.
    #[default]
    Reread,
    /// Load the data file once at startup into an immutable set.
    Cached,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub tls: TlsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Upper bound on concurrently handled connections. `0` means unbounded.
    #[serde(default)]
    pub max_connections: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            backlog: default_backlog(),
            max_connections: 0,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_backlog() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSettings {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default = "default_lookup_config")]
    pub lookup_config: PathBuf,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            lookup_config: default_lookup_config(),
        }
    }
}

fn default_lookup_config() -> PathBuf {
    PathBuf::from("config.txt")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TlsSettings {
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

impl ServerSettings {
    /// The `host:port` string the listener binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Load and validate server settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    let settings: Settings =
        toml::from_str(&content).with_context(|| "Failed to parse settings file")?;

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<()> {
    if settings.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }
    if settings.server.backlog == 0 {
        bail!("server.backlog must be >= 1");
    }
    if settings.tls.cert.is_some() != settings.tls.key.is_some() {
        bail!("tls.cert and tls.key must be set together");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_paths_keeps_order_and_ignores_other_keys() {
        let content = "linuxpath=file1.txt\nlinuxpath=file2.txt\notherpath=file3.txt\n";
        assert_eq!(parse_paths(content), vec!["file1.txt", "file2.txt"]);
    }

    #[test]
    fn test_parse_paths_trims_value_and_splits_on_first_equals() {
        let content = "linuxpath=./data/a=b.txt \nlinuxpath= ./x.txt\n";
        assert_eq!(parse_paths(content), vec!["./data/a=b.txt", "./x.txt"]);
    }

    #[test]
    fn test_parse_paths_requires_prefix_at_line_start() {
        let content = "# linuxpath=commented.txt\nlinuxpathology=no.txt\n";
        assert!(parse_paths(content).is_empty());
    }

    #[test]
    fn test_tls_flag_tri_state() {
        assert_eq!(parse_tls_flag("ENABLE_SSL=True"), Some(true));
        assert_eq!(parse_tls_flag("ENABLE_SSL = True"), Some(true));
        assert_eq!(parse_tls_flag("ENABLE_SSL=False"), Some(false));
        assert_eq!(parse_tls_flag("ENABLE_SSL=true"), Some(false));
        assert_eq!(parse_tls_flag("ENABLE_SSL="), Some(false));
        assert_eq!(parse_tls_flag("linuxpath=a.txt\n"), None);
    }

    #[tokio::test]
    async fn test_resolvers_degrade_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("no_exist_config.txt");
        assert!(resolve_paths(&missing).await.is_empty());
        assert_eq!(resolve_tls_flag(&missing).await, None);
    }

    #[tokio::test]
    async fn test_resolvers_read_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.txt");
        fs::write(&path, "linuxpath=/a.txt\nENABLE_SSL=False\nlinuxpath=/b.txt\n").unwrap();
        assert_eq!(resolve_paths(&path).await, vec!["/a.txt", "/b.txt"]);
        assert_eq!(resolve_tls_flag(&path).await, Some(false));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.server.address(), "127.0.0.1:8000");
        assert_eq!(settings.server.backlog, 5);
        assert_eq!(settings.server.max_connections, 0);
        assert_eq!(settings.search.policy, Policy::Reread);
        assert_eq!(settings.search.lookup_config, PathBuf::from("config.txt"));
        assert!(settings.tls.cert.is_none());
    }

    #[test]
    fn test_load_settings_full() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lineseek.toml");
        fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0"
port = 9000
max_connections = 64

[search]
policy = "cached"
lookup_config = "/etc/lineseek/config.txt"

[tls]
cert = "/etc/lineseek/server.pem"
key = "/etc/lineseek/server.key"
"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.server.address(), "0.0.0.0:9000");
        assert_eq!(settings.server.max_connections, 64);
        assert_eq!(settings.search.policy, Policy::Cached);
        assert_eq!(
            settings.tls.key,
            Some(PathBuf::from("/etc/lineseek/server.key"))
        );
    }

    #[test]
    fn test_load_settings_rejects_half_tls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lineseek.toml");
        fs::write(&path, "[tls]\ncert = \"server.pem\"\n").unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("tls.cert and tls.key"));
    }

    #[test]
    fn test_load_settings_rejects_unknown_policy() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lineseek.toml");
        fs::write(&path, "[search]\npolicy = \"mmap\"\n").unwrap();
        assert!(load_settings(&path).is_err());
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }
}
