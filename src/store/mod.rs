//! File-backed local store for pulled instances.
//!
//! One JSON document per entity id per kind folder, rooted at a run's base
//! path. Two layouts are supported:
//!
//! - **Nested** (default): `{root}/{instanceId}/{locale}/{preview|live}/...`
//! - **Legacy**: `{root}/...` with no instance/locale/mode segmentation
//!
//! # Layout
//!
//! ```text
//! galleries/{id}.json
//! assets/json/{id}.json
//! models/{id}.json
//! containers/{referenceName}.json
//! item/{contentId}.json
//! list/{containerRef}.json
//! templates/{id}.json
//! pages/{id}.json
//! sitemap/{channel}.json
//! state/sync.json
//! logs/instancelog.txt
//! ```
//!
//! The orchestrators only ever see a [`LocalStore`] built for one base path.

mod file;
mod hash;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::{ContentItem, EntityKind, PageRef, SyncToken};

pub use file::{atomic_write, file_stem, read_document, to_document};
pub use hash::snapshot_digest;

const LIST_DIR: &str = "list";
const SITEMAP_DIR: &str = "sitemap";
const STATE_DIR: &str = "state";
const SYNC_STATE_FILE: &str = "sync.json";
const LOGS_DIR: &str = "logs";

/// Errors raised by local store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Directory layout of the local store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreLayout {
    #[default]
    Nested,
    Legacy,
}

/// Where one run's snapshot lives.
#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub root: PathBuf,
    pub instance: String,
    pub locale: String,
    pub preview: bool,
    pub layout: StoreLayout,
}

impl StoreLocation {
    /// Base path for this run under the configured layout.
    #[must_use]
    pub fn base_path(&self) -> PathBuf {
        match self.layout {
            StoreLayout::Legacy => self.root.clone(),
            StoreLayout::Nested => self
                .root
                .join(&self.instance)
                .join(&self.locale)
                .join(if self.preview { "preview" } else { "live" }),
        }
    }
}

/// Configured store root plus layout, shared by every run of a command.
#[derive(Debug, Clone)]
pub struct StoreRoot {
    pub root: PathBuf,
    pub layout: StoreLayout,
}

impl StoreRoot {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, layout: StoreLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Store for one instance, locale and mode.
    #[must_use]
    pub fn store_for(&self, instance: &str, locale: &str, preview: bool) -> LocalStore {
        LocalStore::at(&StoreLocation {
            root: self.root.clone(),
            instance: instance.to_string(),
            locale: locale.to_string(),
            preview,
            layout: self.layout,
        })
    }
}

/// Result of writing one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Persisted delta-sync cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SyncState {
    token: SyncToken,
    updated_at: String,
}

/// Key/value store of JSON documents per entity kind.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base: PathBuf,
}

impl LocalStore {
    /// Open a store rooted directly at `base`.
    #[must_use]
    pub fn open(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Open the store for a run location.
    #[must_use]
    pub fn at(location: &StoreLocation) -> Self {
        Self::open(location.base_path())
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// Whether anything has been pulled into this base path.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.base.is_dir()
    }

    /// Create the base, state and log directories.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; callers treat it as fatal.
    pub fn ensure_base_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base)?;
        fs::create_dir_all(self.base.join(STATE_DIR))?;
        fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    #[must_use]
    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.base.join(kind.folder())
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.base.join(LOGS_DIR)
    }

    fn entity_path(&self, kind: EntityKind, key: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{}.json", file_stem(key)))
    }

    /// A kind folder counts as populated when it holds at least one document.
    #[must_use]
    pub fn is_populated(&self, kind: EntityKind) -> bool {
        self.count(kind) > 0
    }

    /// Number of JSON documents stored for a kind.
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        self.document_stems(&self.kind_dir(kind)).len()
    }

    /// Write one entity document, skipping the write if the content is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_entity<T: Serialize>(
        &self,
        kind: EntityKind,
        key: &str,
        value: &T,
    ) -> StoreResult<WriteOutcome> {
        let path = self.entity_path(kind, key);
        let document = to_document(&path, value)?;

        if fs::read_to_string(&path).is_ok_and(|stored| stored == document) {
            return Ok(WriteOutcome::Unchanged);
        }

        atomic_write(&path, &document)?;
        Ok(WriteOutcome::Written)
    }

    /// Read one entity document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read or parsed.
    pub fn read_entity<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        key: &str,
    ) -> StoreResult<Option<T>> {
        read_document(&self.entity_path(kind, key))
    }

    /// Read every document of a kind, ordered by key (numeric keys numerically).
    ///
    /// # Errors
    ///
    /// Returns an error on the first unreadable document.
    pub fn read_all<T: DeserializeOwned>(&self, kind: EntityKind) -> StoreResult<Vec<T>> {
        let dir = self.kind_dir(kind);
        let mut values = Vec::new();
        for stem in self.document_stems(&dir) {
            if let Some(value) = read_document(&dir.join(format!("{stem}.json")))? {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// SHA-256 fingerprint of every document of a kind, `None` when the
    /// folder holds none.
    ///
    /// # Errors
    ///
    /// Returns an error if a document cannot be read.
    pub fn kind_digest(&self, kind: EntityKind) -> StoreResult<Option<String>> {
        let dir = self.kind_dir(kind);
        let stems = self.document_stems(&dir);
        if stems.is_empty() {
            return Ok(None);
        }
        let mut documents = Vec::with_capacity(stems.len());
        for stem in stems {
            let path = dir.join(format!("{stem}.json"));
            let document = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            documents.push((stem, document));
        }
        Ok(Some(snapshot_digest(
            documents.iter().map(|(k, d)| (k.as_str(), d.as_str())),
        )))
    }

    /// Remove one entity document. Returns `true` if a file was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove_entity(&self, kind: EntityKind, key: &str) -> StoreResult<bool> {
        let path = self.entity_path(kind, key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(true)
    }

    /// Delete every document of a kind whose key is not in `keep`.
    ///
    /// Returns the number of documents removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a stale document cannot be removed.
    pub fn prune(&self, kind: EntityKind, keep: &HashSet<String>) -> StoreResult<usize> {
        self.prune_dir(&self.kind_dir(kind), keep)
    }

    fn prune_dir(&self, dir: &Path, keep: &HashSet<String>) -> StoreResult<usize> {
        let keep: HashSet<String> = keep.iter().map(|k| file_stem(k)).collect();
        let mut removed = 0;
        for stem in self.document_stems(dir) {
            if keep.contains(&stem) {
                continue;
            }
            let path = dir.join(format!("{stem}.json"));
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
            removed += 1;
        }
        Ok(removed)
    }

    fn document_stems(&self, dir: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut stems: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        stems.sort_by(|a, b| match (a.parse::<i64>(), b.parse::<i64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        });
        stems
    }

    // ── Content lists ──────────────────────────────────────────

    fn list_path(&self, container_ref: &str) -> PathBuf {
        self.base
            .join(LIST_DIR)
            .join(format!("{}.json", file_stem(&container_ref.to_lowercase())))
    }

    /// Read the stored item list for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the list exists but cannot be parsed.
    pub fn read_list(&self, container_ref: &str) -> StoreResult<Vec<ContentItem>> {
        Ok(read_document(&self.list_path(container_ref))?.unwrap_or_default())
    }

    /// Replace the stored item list for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_list(&self, container_ref: &str, items: &[ContentItem]) -> StoreResult<()> {
        let path = self.list_path(container_ref);
        atomic_write(&path, &to_document(&path, &items)?)
    }

    /// Delete every container list whose lowercased reference name is not in `keep`.
    ///
    /// # Errors
    ///
    /// Returns an error if a stale list cannot be removed.
    pub fn prune_lists(&self, keep: &HashSet<String>) -> StoreResult<usize> {
        let keep: HashSet<String> = keep.iter().map(|k| k.to_lowercase()).collect();
        self.prune_dir(&self.base.join(LIST_DIR), &keep)
    }

    // ── Sync state ─────────────────────────────────────────────

    fn sync_state_path(&self) -> PathBuf {
        self.base.join(STATE_DIR).join(SYNC_STATE_FILE)
    }

    /// The persisted delta-sync cursor, if an earlier content pull left one.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but is unreadable.
    pub fn read_sync_token(&self) -> StoreResult<Option<SyncToken>> {
        let state: Option<SyncState> = read_document(&self.sync_state_path())?;
        Ok(state.map(|s| s.token))
    }

    /// Persist the delta-sync cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_sync_token(&self, token: &SyncToken) -> StoreResult<()> {
        let path = self.sync_state_path();
        let state = SyncState {
            token: token.clone(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        atomic_write(&path, &to_document(&path, &state)?)
    }

    /// Delete the delta-sync cursor so the next content pull is a full sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear_sync_token(&self) -> StoreResult<()> {
        let path = self.sync_state_path();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        }
        Ok(())
    }

    // ── Sitemap artifact ───────────────────────────────────────

    fn sitemap_path(&self, channel: &str) -> PathBuf {
        self.base
            .join(SITEMAP_DIR)
            .join(format!("{}.json", file_stem(channel)))
    }

    /// Whether content sync has produced a sitemap for `channel`.
    ///
    /// Pages cannot be pulled without it.
    #[must_use]
    pub fn sitemap_artifact_exists(&self, channel: &str) -> bool {
        self.sitemap_path(channel).is_file()
    }

    /// Read the sitemap artifact for a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be parsed.
    pub fn read_sitemap(&self, channel: &str) -> StoreResult<Option<Vec<PageRef>>> {
        read_document(&self.sitemap_path(channel))
    }

    /// Write the sitemap artifact for a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_sitemap(&self, channel: &str, pages: &[PageRef]) -> StoreResult<()> {
        let path = self.sitemap_path(channel);
        atomic_write(&path, &to_document(&path, &pages)?)
    }

    /// Names of all sitemap channels present.
    #[must_use]
    pub fn sitemap_channels(&self) -> Vec<String> {
        self.document_stems(&self.base.join(SITEMAP_DIR))
    }

    /// Number of container list files present.
    #[must_use]
    pub fn list_count(&self) -> usize {
        self.document_stems(&self.base.join(LIST_DIR)).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Gallery;
    use tempfile::TempDir;

    fn gallery(id: i64, name: &str) -> Gallery {
        Gallery {
            id,
            name: name.to_string(),
            description: None,
            asset_ids: vec![],
        }
    }

    #[test]
    fn test_base_path_layouts() {
        let mut location = StoreLocation {
            root: PathBuf::from("/data"),
            instance: "abc".to_string(),
            locale: "en-us".to_string(),
            preview: true,
            layout: StoreLayout::Nested,
        };
        assert_eq!(location.base_path(), PathBuf::from("/data/abc/en-us/preview"));

        location.preview = false;
        assert_eq!(location.base_path(), PathBuf::from("/data/abc/en-us/live"));

        location.layout = StoreLayout::Legacy;
        assert_eq!(location.base_path(), PathBuf::from("/data"));
    }

    #[test]
    fn test_write_read_and_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());

        assert!(!store.is_populated(EntityKind::Gallery));
        let first = store
            .write_entity(EntityKind::Gallery, "2", &gallery(2, "b"))
            .unwrap();
        let second = store
            .write_entity(EntityKind::Gallery, "2", &gallery(2, "b"))
            .unwrap();
        store
            .write_entity(EntityKind::Gallery, "10", &gallery(10, "c"))
            .unwrap();

        assert_eq!(first, WriteOutcome::Written);
        assert_eq!(second, WriteOutcome::Unchanged);
        assert!(store.is_populated(EntityKind::Gallery));

        let all: Vec<Gallery> = store.read_all(EntityKind::Gallery).unwrap();
        let ids: Vec<i64> = all.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![2, 10]);
    }

    #[test]
    fn test_asset_folder_is_nested() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());
        assert!(store.kind_dir(EntityKind::Asset).ends_with("assets/json"));
    }

    #[test]
    fn test_prune_removes_stale() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());
        for id in 1..=3 {
            store
                .write_entity(EntityKind::Gallery, &id.to_string(), &gallery(id, "g"))
                .unwrap();
        }

        let keep: HashSet<String> = ["1".to_string(), "3".to_string()].into_iter().collect();
        let removed = store.prune(EntityKind::Gallery, &keep).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.count(EntityKind::Gallery), 2);
    }

    #[test]
    fn test_prune_lists_keeps_named() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());
        store.write_list("Posts", &[]).unwrap();
        store.write_list("authors", &[]).unwrap();

        let keep: HashSet<String> = ["POSTS".to_string()].into_iter().collect();
        assert_eq!(store.prune_lists(&keep).unwrap(), 1);
        assert_eq!(store.list_count(), 1);
        assert!(store.read_list("posts").unwrap().is_empty());
    }

    #[test]
    fn test_kind_digest_tracks_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());
        assert!(store.kind_digest(EntityKind::Gallery).unwrap().is_none());

        store
            .write_entity(EntityKind::Gallery, "1", &gallery(1, "a"))
            .unwrap();
        let first = store.kind_digest(EntityKind::Gallery).unwrap().unwrap();
        store
            .write_entity(EntityKind::Gallery, "1", &gallery(1, "b"))
            .unwrap();
        let second = store.kind_digest(EntityKind::Gallery).unwrap().unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_sync_token_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());

        assert!(store.read_sync_token().unwrap().is_none());
        store.write_sync_token(&SyncToken("42".into())).unwrap();
        assert_eq!(store.read_sync_token().unwrap(), Some(SyncToken("42".into())));
        store.clear_sync_token().unwrap();
        assert!(store.read_sync_token().unwrap().is_none());
    }

    #[test]
    fn test_sitemap_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());

        assert!(!store.sitemap_artifact_exists("website"));
        store
            .write_sitemap(
                "website",
                &[PageRef {
                    page_id: 1,
                    path: "/".into(),
                }],
            )
            .unwrap();
        assert!(store.sitemap_artifact_exists("website"));
        assert_eq!(store.read_sitemap("website").unwrap().unwrap().len(), 1);
        assert_eq!(store.sitemap_channels(), vec!["website".to_string()]);
    }

    #[test]
    fn test_remove_entity() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path());
        store
            .write_entity(EntityKind::Gallery, "1", &gallery(1, "a"))
            .unwrap();
        assert!(store.remove_entity(EntityKind::Gallery, "1").unwrap());
        assert!(!store.remove_entity(EntityKind::Gallery, "1").unwrap());
    }
}
