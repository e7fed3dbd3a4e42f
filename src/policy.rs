//! Search policies.
//!
//! A [`DocumentSource`] hands the connection handler the document to search
//! for one request. The two implementations trade freshness for speed:
//!
//! - [`RereadSource`] re-reads the lookup config, re-resolves the active
//!   file and opens a new [`DocumentStream`] on every request, so edits to
//!   either file are visible to the next query without a restart.
//! - [`CachedSource`] holds a [`DocumentSnapshot`] built once at startup and
//!   never touches the disk again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::{self, Policy};
use crate::error::{LookupError, Result};
use crate::search::Document;
use crate::store::{active_file_path, DocumentSnapshot, DocumentStream};

/// Supplies the document a single request is searched against.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Policy name for logs.
    fn policy(&self) -> Policy;

    /// Resolve and open the document for one request.
    async fn document<'a>(&'a self) -> Result<Document<'a>>;
}

/// Resolve the active data file named by the lookup config at `lookup_config`.
pub async fn resolve_active_file(lookup_config: &Path) -> Result<PathBuf> {
    let candidates = config::resolve_paths(lookup_config).await;
    active_file_path(&candidates).ok_or_else(|| LookupError::NoActiveFile(lookup_config.to_path_buf()))
}

/// Re-read policy: nothing is shared between requests.
pub struct RereadSource {
    lookup_config: PathBuf,
}

impl RereadSource {
    pub fn new(lookup_config: impl Into<PathBuf>) -> Self {
        Self {
            lookup_config: lookup_config.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for RereadSource {
    fn policy(&self) -> Policy {
        Policy::Reread
    }

    async fn document<'a>(&'a self) -> Result<Document<'a>> {
        let path = resolve_active_file(&self.lookup_config).await?;
        let stream = DocumentStream::open(&path).await?;
        Ok(Document::Stream(stream))
    }
}

/// Cached policy: one immutable snapshot, shared read-only.
pub struct CachedSource {
    snapshot: Arc<DocumentSnapshot>,
}

impl CachedSource {
    pub fn new(snapshot: Arc<DocumentSnapshot>) -> Self {
        Self { snapshot }
    }

    /// Resolve the active file once and load it. Any failure here is fatal
    /// to startup since there is nothing to serve.
    pub async fn load(lookup_config: &Path) -> Result<Self> {
        let path = resolve_active_file(lookup_config).await?;
        let snapshot = DocumentSnapshot::load(&path).await?;
        Ok(Self::new(Arc::new(snapshot)))
    }
}

#[async_trait]
impl DocumentSource for CachedSource {
    fn policy(&self) -> Policy {
        Policy::Cached
    }

    async fn document<'a>(&'a self) -> Result<Document<'a>> {
        Ok(Document::Snapshot(&self.snapshot))
    }
}

/// Build the source for `policy`. Cached mode loads its snapshot here.
pub async fn build_source(
    policy: Policy,
    lookup_config: &Path,
) -> anyhow::Result<Arc<dyn DocumentSource>> {
    let source: Arc<dyn DocumentSource> = match policy {
        Policy::Reread => Arc::new(RereadSource::new(lookup_config)),
        Policy::Cached => Arc::new(CachedSource::load(lookup_config).await.with_context(|| {
            format!(
                "cached policy could not load a snapshot using {}",
                lookup_config.display()
            )
        })?),
    };
    Ok(source)
}
