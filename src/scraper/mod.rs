#[cfg(feature = "browser")]
pub mod browser;
pub mod cleaner;
pub mod comments;
#[cfg(test)]
pub mod fixture;
pub mod login;
pub mod posts;
pub mod replies;
pub mod selectors;
pub mod throttle;

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("navigation to {url} timed out after {ms} ms")]
    NavigationTimeout { url: String, ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("marker {selector:?} did not appear within {ms} ms")]
    MarkerTimeout { selector: String, ms: u64 },

    #[error("element missing: {0}")]
    Missing(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("browser session closed: {0}")]
    SessionClosed(String),
}

impl DriverError {
    /// A fatal error means the browsing context is gone; nothing further on
    /// it can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::SessionClosed(_))
    }
}

// ── Page capability ───────────────────────────────────────────────────────────

/// One browsing context. Every call suspends until the remote side answers;
/// callers never overlap operations on the same context.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Node: Send + Sync;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Poll until `selector` matches something or `timeout` expires.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// All matches in document order, page-wide or below `scope`.
    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&Self::Node>,
    ) -> Result<Vec<Self::Node>, DriverError>;

    async fn text(&self, node: &Self::Node) -> Result<String, DriverError>;

    async fn attribute(&self, node: &Self::Node, name: &str) -> Result<Option<String>, DriverError>;

    async fn click(&self, node: &Self::Node) -> Result<(), DriverError>;

    /// Focus `node` and type `text` into it.
    async fn type_text(&self, node: &Self::Node, text: &str) -> Result<(), DriverError>;

    async fn scroll_to_bottom(&self) -> Result<(), DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    async fn save_pdf(&self, path: &Path) -> Result<(), DriverError>;

    /// Whether two handles point at the same element.
    fn same_node(&self, a: &Self::Node, b: &Self::Node) -> bool;

    /// First match, if any.
    async fn query_first(
        &self,
        selector: &str,
        scope: Option<&Self::Node>,
    ) -> Result<Option<Self::Node>, DriverError> {
        Ok(self.query_all(selector, scope).await?.into_iter().next())
    }

    /// Matches below `scope` that are not inside a `nested` subtree of it,
    /// e.g. a comment's own author but not its replies' authors.
    async fn query_own(
        &self,
        selector: &str,
        scope: &Self::Node,
        nested: &str,
    ) -> Result<Vec<Self::Node>, DriverError> {
        let all = self.query_all(selector, Some(scope)).await?;
        let mut inner = Vec::new();
        for subtree in self.query_all(nested, Some(scope)).await? {
            inner.extend(self.query_all(selector, Some(&subtree)).await?);
        }
        Ok(all
            .into_iter()
            .filter(|node| !inner.iter().any(|n| self.same_node(node, n)))
            .collect())
    }

    /// Read several nodes as one unit: either every text comes back or the
    /// whole read fails.
    async fn read_texts(&self, nodes: &[Option<&Self::Node>]) -> Result<Vec<String>, DriverError> {
        let mut out = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().copied().enumerate() {
            let node = node.ok_or_else(|| DriverError::Missing(format!("batch read slot {}", i)))?;
            out.push(self.text(node).await?);
        }
        Ok(out)
    }
}

// ── Field accessor ────────────────────────────────────────────────────────────

/// Read one field. A recoverable failure is logged and reads as absent;
/// only a fatal driver error escapes, and it aborts whatever range the
/// caller is walking.
pub async fn field<T, F>(what: &str, read: F) -> Result<Option<T>, DriverError>
where
    F: Future<Output = Result<Option<T>, DriverError>>,
{
    match read.await {
        Ok(v) => Ok(v),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("{}: {}", what, e);
            Ok(None)
        }
    }
}
