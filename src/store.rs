//!
//! Rule store
//! ----------
//! Durable domain -> required admin mapping on top of the storage backends.
//!
//! Reads favor availability: a missing installation falls back to the local store,
//! any other failure reads as an empty set. Writes favor correctness: only the
//! missing-installation case falls back, every other failure is returned.
//!
//! Edits are whole-document read-modify-write with no version check, so two
//! concurrent editors can overwrite each other (last write wins).

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::rules::{normalize_domain, Rule, RuleSet};
use crate::storage::{BackendError, BackendResult, LocalStore, RemoteBackend};

pub const DEFAULT_STORAGE_KEY: &str = "admin_enforcer_domains";
pub const DEFAULT_LOCAL_KEY: &str = "admin_enforcer_domains_dev";

#[derive(Debug, Clone)]
pub struct StorageKeys {
    /// Key in installation storage.
    pub remote: String,
    /// Key in the local fallback store.
    pub local: String,
}

impl Default for StorageKeys {
    fn default() -> Self { Self { remote: DEFAULT_STORAGE_KEY.to_string(), local: DEFAULT_LOCAL_KEY.to_string() } }
}

#[derive(Clone)]
pub struct RuleStore {
    remote: RemoteBackend,
    local: LocalStore,
    keys: StorageKeys,
}

impl RuleStore {
    pub fn new(remote: RemoteBackend, local: LocalStore) -> Self {
        Self { remote, local, keys: StorageKeys::default() }
    }

    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn keys(&self) -> &StorageKeys { &self.keys }

    pub fn describe(&self) -> String {
        let local = match self.local.path() {
            Some(p) => p.display().to_string(),
            None => "memory".to_string(),
        };
        format!("remote={} local={}", self.remote.ident(), local)
    }

    fn load_local(&self) -> RuleSet {
        match self.local.get(&self.keys.local) {
            Some(text) => RuleSet::decode_or_empty(&text),
            None => RuleSet::new(),
        }
    }

    /// Fetch the full current mapping. Never fails.
    pub async fn load_all(&self) -> RuleSet {
        match self.remote.get(&self.keys.remote).await {
            BackendResult::Found(Some(text)) => RuleSet::decode_or_empty(&text),
            BackendResult::Found(None) => RuleSet::new(),
            BackendResult::NotProvisioned => {
                warn!(target: "admin_enforcer::store", "installation storage not provisioned; using local fallback storage");
                self.load_local()
            }
            BackendResult::Error(e) => {
                warn!(target: "admin_enforcer::store", "loading rules failed, treating as empty: {}", e);
                RuleSet::new()
            }
        }
    }

    /// Replace the persisted mapping with `rules`.
    pub async fn save_all(&self, rules: &RuleSet) -> AppResult<()> {
        let text = rules.encode();
        match self.remote.put(&self.keys.remote, &text).await {
            BackendResult::Found(()) => {
                debug!(target: "admin_enforcer::store", rules = rules.len(), "rules saved to installation storage");
                Ok(())
            }
            BackendResult::NotProvisioned => {
                warn!(target: "admin_enforcer::store", "installation storage not provisioned; saving to local fallback storage");
                self.local
                    .set(&self.keys.local, &text)
                    .map_err(|e| BackendError::Io(e.to_string()))?;
                Ok(())
            }
            BackendResult::Error(e) => {
                warn!(target: "admin_enforcer::store", "saving rules failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Normalize, validate, then upsert a rule. Invalid input never reaches storage.
    pub async fn add_or_update(&self, domain: &str, email: &str) -> AppResult<Rule> {
        let rule = Rule::new(domain, email)?;
        let mut rules = self.load_all().await;
        let previous = rules.insert(rule.clone());
        self.save_all(&rules).await?;
        info!(target: "admin_enforcer::store", domain = %rule.domain, admin = %rule.email, replaced = ?previous, "rule saved");
        Ok(rule)
    }

    /// Delete the rule for `domain`; returns whether one existed. Absent keys are not an error.
    pub async fn remove(&self, domain: &str) -> AppResult<bool> {
        let mut rules = self.load_all().await;
        let existed = rules.remove(domain);
        self.save_all(&rules).await?;
        info!(target: "admin_enforcer::store", domain = %normalize_domain(domain), existed, "rule removed");
        Ok(existed)
    }

    pub async fn clear(&self) -> AppResult<()> {
        self.save_all(&RuleSet::new()).await?;
        info!(target: "admin_enforcer::store", "all rules cleared");
        Ok(())
    }
}
