//! Per-group JSON archive: load, merge by identity, persist in one write.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::Publication;

// ── Archive ───────────────────────────────────────────────────────────────────

/// Ordered, append-only collection of a group's publications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Archive {
    publications: Vec<Publication>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publications(&self) -> &[Publication] {
        &self.publications
    }

    pub fn len(&self) -> usize {
        self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    pub fn contains(&self, author: &str, post: &str) -> bool {
        self.publications.iter().any(|p| p.identity() == (author, post))
    }

    /// Append every publication whose `(author, post)` is not archived yet.
    /// Existing entries are never touched. Returns how many were appended.
    pub fn merge(&mut self, fresh: impl IntoIterator<Item = Publication>) -> usize {
        let mut appended = 0;
        for publication in fresh {
            let (author, post) = publication.identity();
            if self.contains(author, post) {
                debug!("already archived: {} / {:.40}", author, post);
                continue;
            }
            self.publications.push(publication);
            appended += 1;
        }
        appended
    }

    /// Pretty-printed with four-space indentation, fields in declaration order.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        self.serialize(&mut ser).context("Failed to serialise archive")?;
        String::from_utf8(buf).context("Archive JSON is not UTF-8")
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("Failed to parse archive")
    }
}

// ── Store capability ──────────────────────────────────────────────────────────

pub trait ArchiveStore: Send + Sync {
    /// The archive at `path`, or an empty one when nothing is there yet.
    fn load(&self, path: &Path) -> Result<Archive>;

    /// Overwrite `path` with the full archive in a single write.
    fn persist(&self, path: &Path, archive: &Archive) -> Result<()>;
}

impl<S: ArchiveStore + ?Sized> ArchiveStore for &S {
    fn load(&self, path: &Path) -> Result<Archive> {
        (**self).load(path)
    }

    fn persist(&self, path: &Path, archive: &Archive) -> Result<()> {
        (**self).persist(path, archive)
    }
}

/// Archive files on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonArchiveStore;

impl ArchiveStore for JsonArchiveStore {
    fn load(&self, path: &Path) -> Result<Archive> {
        if !path.exists() {
            debug!("No archive at {:?}, starting empty", path);
            return Ok(Archive::new());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read archive {:?}", path))?;
        Archive::from_json(&raw).with_context(|| format!("Corrupt archive {:?}", path))
    }

    fn persist(&self, path: &Path, archive: &Archive) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let json = archive.to_json()?;
        std::fs::write(path, json).with_context(|| format!("Could not write archive {:?}", path))?;
        info!("Archive written: {:?} ({} publications)", path, archive.len());
        Ok(())
    }
}

// ── Test double ───────────────────────────────────────────────────────────────

/// Keeps serialised archives in memory, keyed by path.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    files: std::sync::Mutex<std::collections::HashMap<PathBuf, String>>,
    writes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryArchiveStore {
    pub fn raw(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ArchiveStore for MemoryArchiveStore {
    fn load(&self, path: &Path) -> Result<Archive> {
        match self.files.lock().unwrap().get(path) {
            Some(raw) => Archive::from_json(raw),
            None => Ok(Archive::new()),
        }
    }

    fn persist(&self, path: &Path, archive: &Archive) -> Result<()> {
        let json = archive.to_json()?;
        self.files.lock().unwrap().insert(path.to_path_buf(), json);
        self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

/// `<out>/<group>/<group>.json`
pub fn archive_path(output_dir: &Path, group_name: &str) -> PathBuf {
    output_dir.join(group_name).join(format!("{}.json", group_name))
}

// ── Stats ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
pub struct ArchiveStats {
    pub publications: usize,
    pub comments: usize,
    pub replies: usize,
}

impl Archive {
    pub fn stats(&self) -> ArchiveStats {
        let mut stats = ArchiveStats {
            publications: self.len(),
            ..Default::default()
        };
        for p in &self.publications {
            stats.comments += p.comments.len();
            stats.replies += p.comments.iter().map(|c| c.replies.len()).sum::<usize>();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, Reply};

    fn publication(number: usize, author: &str, post: &str) -> Publication {
        Publication {
            number,
            author: author.into(),
            post: post.into(),
            date: "1h".into(),
            link: Some(format!("https://m.facebook.com/p/{}", number)),
            reactions: "0".into(),
            comments: vec![],
        }
    }

    #[test]
    fn test_merge_skips_known_identities() {
        let mut archive = Archive::new();
        assert_eq!(archive.merge(vec![publication(1, "A", "x"), publication(2, "B", "y")]), 2);
        let appended = archive.merge(vec![publication(9, "A", "x"), publication(3, "A", "z")]);
        assert_eq!(appended, 1);
        assert_eq!(archive.len(), 3);
        // the first entry survives untouched
        assert_eq!(archive.publications()[0].number, 1);
    }

    #[test]
    fn test_merge_dedups_within_one_batch() {
        let mut archive = Archive::new();
        archive.merge(vec![publication(1, "A", "x"), publication(2, "A", "x")]);
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_merge_is_idempotent_and_unique() {
        let mut base = Archive::new();
        base.merge(vec![publication(1, "A", "x")]);
        let fresh = vec![publication(2, "B", "y"), publication(3, "A", "x"), publication(4, "B", "y2")];

        let mut once = base.clone();
        once.merge(fresh.clone());
        let mut twice = once.clone();
        assert_eq!(twice.merge(fresh), 0);
        assert_eq!(once, twice);

        let ids: std::collections::HashSet<_> = twice.publications().iter().map(|p| p.identity()).collect();
        assert_eq!(ids.len(), twice.len());
    }

    #[test]
    fn test_json_layout() {
        let mut archive = Archive::new();
        let mut p = publication(1, "A", "x");
        p.comments.push(Comment {
            author: "C".into(),
            post: "c".into(),
            date: "2h".into(),
            reactions: "0".into(),
            replies: vec![Reply { author: "R".into(), post: "r".into(), date: "1h".into(), reactions: "1".into() }],
        });
        archive.merge(vec![p]);
        let json = archive.to_json().unwrap();
        assert!(json.starts_with("[\n    {\n        \"number\": 1,\n        \"author\": \"A\","));
        let keys = ["\"number\"", "\"author\"", "\"post\"", "\"date\"", "\"link\"", "\"reactions\"", "\"comments\""];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Archive::from_json(&json).unwrap(), archive);
    }

    #[test]
    fn test_json_store_roundtrip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_path(dir.path(), "My Group");
        let store = JsonArchiveStore;

        assert!(store.load(&path).unwrap().is_empty());

        let mut archive = Archive::new();
        archive.merge(vec![publication(1, "A", "x")]);
        store.persist(&path, &archive).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        let mut reloaded = store.load(&path).unwrap();
        assert_eq!(reloaded.merge(vec![publication(5, "A", "x")]), 0);
        store.persist(&path, &reloaded).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_stats() {
        let mut archive = Archive::new();
        let mut p = publication(1, "A", "x");
        p.comments = vec![
            Comment { replies: vec![Reply::default(), Reply::default()], ..Default::default() },
            Comment::default(),
        ];
        archive.merge(vec![p, publication(2, "B", "y")]);
        assert_eq!(archive.stats(), ArchiveStats { publications: 2, comments: 2, replies: 2 });
    }

    #[test]
    fn test_legacy_archive_loads_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_path(dir.path(), "G");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"[
    {
        "number": 1,
        "author": "Bob",
        "post": [
            "/photo/123"
        ],
        "date": "2 hrs",
        "link": "https://m.facebook.com/groups/42/posts/1",
        "reactions": "0",
        "comments": "{}"
    }
]"#,
        )
        .unwrap();

        let store = JsonArchiveStore;
        let mut archive = store.load(&path).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.publications()[0].post, "/photo/123");
        assert!(archive.publications()[0].comments.is_empty());

        assert_eq!(archive.merge(vec![publication(2, "Ann", "hello")]), 1);
        store.persist(&path, &archive).unwrap();
        assert_eq!(store.load(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_archive_path() {
        let p = archive_path(Path::new("/out"), "G");
        assert_eq!(p, PathBuf::from("/out/G/G.json"));
    }
}
