use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// On-disk document for the local store.
#[derive(Serialize, Deserialize, Default)]
struct LocalDocument {
    #[serde(default)]
    updated_ms: i64,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Synchronous on-device string key-value store used when the installation
/// storage is not provisioned. File-backed when opened with a path.
#[derive(Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    map: Arc<RwLock<BTreeMap<String, String>>>,
}

impl LocalStore {
    /// Store that lives only for the process.
    pub fn in_memory() -> Self {
        Self { path: None, map: Arc::new(RwLock::new(BTreeMap::new())) }
    }

    /// Open a file-backed store. A missing file starts empty; an unreadable or
    /// malformed one also starts empty, with a warning.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<LocalDocument>(&bytes) {
                Ok(doc) => doc.entries,
                Err(e) => {
                    warn!(target: "admin_enforcer::local", path = %path.display(), "local store is malformed, starting empty: {}", e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(target: "admin_enforcer::local", path = %path.display(), "local store unreadable, starting empty: {}", e);
                BTreeMap::new()
            }
        };
        Self { path: Some(path), map: Arc::new(RwLock::new(entries)) }
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn get(&self, key: &str) -> Option<String> { self.map.read().get(key).cloned() }

    /// Set a key and flush the whole document when file-backed.
    /// The in-memory map only changes once the flush succeeded.
    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut w = self.map.write();
        let mut next = w.clone();
        next.insert(key.to_string(), value.to_string());
        if let Some(path) = &self.path {
            let doc = LocalDocument { updated_ms: chrono::Utc::now().timestamp_millis(), entries: next };
            write_atomic(path, &serde_json::to_vec_pretty(&doc)?)?;
            debug!(target: "admin_enforcer::local", key, path = %path.display(), "local store flushed");
            next = doc.entries;
        }
        *w = next;
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
