//! Runtime configuration read from `ENFORCER_*` environment variables.

use std::path::PathBuf;

use anyhow::Context;

use crate::storage::{InstallationStorage, LocalStore, MemoryRemote, RemoteBackend};
use crate::store::{RuleStore, StorageKeys, DEFAULT_LOCAL_KEY, DEFAULT_STORAGE_KEY};

#[derive(Debug, Clone)]
pub struct EnforcerConfig {
    pub http_port: u16,
    /// Base URL of the ticketing host. Unset means standalone (local storage only).
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    pub installation_id: Option<String>,
    pub local_path: PathBuf,
    pub storage_key: String,
    pub local_key: String,
    /// Whether rule edits are accepted over HTTP.
    pub edit_mode: bool,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            http_port: 7880,
            remote_url: None,
            remote_token: None,
            installation_id: None,
            local_path: PathBuf::from("enforcer_local.json"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            local_key: DEFAULT_LOCAL_KEY.to_string(),
            edit_mode: false,
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl EnforcerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; missing keys take defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let d = Self::default();
        let http_port = match non_empty(get("ENFORCER_HTTP_PORT")) {
            Some(p) => p.parse::<u16>().with_context(|| format!("invalid ENFORCER_HTTP_PORT '{}'", p))?,
            None => d.http_port,
        };
        Ok(Self {
            http_port,
            remote_url: non_empty(get("ENFORCER_REMOTE_URL")),
            remote_token: non_empty(get("ENFORCER_REMOTE_TOKEN")),
            installation_id: non_empty(get("ENFORCER_INSTALLATION_ID")),
            local_path: non_empty(get("ENFORCER_LOCAL_PATH")).map(PathBuf::from).unwrap_or(d.local_path),
            storage_key: non_empty(get("ENFORCER_STORAGE_KEY")).unwrap_or(d.storage_key),
            local_key: non_empty(get("ENFORCER_LOCAL_KEY")).unwrap_or(d.local_key),
            edit_mode: get("ENFORCER_EDIT_MODE").map(|v| parse_flag(&v)).unwrap_or(d.edit_mode),
        })
    }

    pub fn build_store(&self) -> anyhow::Result<RuleStore> {
        let remote = match &self.remote_url {
            Some(url) => RemoteBackend::Http(InstallationStorage::new(url, self.remote_token.clone(), self.installation_id.clone())?),
            None => RemoteBackend::Memory(MemoryRemote::not_provisioned()),
        };
        let local = LocalStore::open(&self.local_path);
        Ok(RuleStore::new(remote, local).with_keys(StorageKeys { remote: self.storage_key.clone(), local: self.local_key.clone() }))
    }
}
