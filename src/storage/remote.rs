use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::backend::{BackendError, BackendResult};

const METADATA_PATH: &str = "/api/v2/apps/metadata.json";

/// Client for the per-installation key-value storage of the ticketing host.
#[derive(Clone)]
pub struct InstallationStorage {
    base: Url,
    client: reqwest::Client,
    token: Option<String>,
    /// Skips the metadata lookup when set.
    installation_id: Option<String>,
}

#[derive(Deserialize)]
struct MetadataResponse {
    #[serde(rename = "installationId")]
    installation_id: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StorageValue {
    #[serde(default)]
    value: Option<String>,
}

impl InstallationStorage {
    pub fn new(base: &str, token: Option<String>, installation_id: Option<String>) -> anyhow::Result<Self> {
        let base = Url::parse(base).map_err(|e| anyhow::anyhow!("invalid storage base URL '{}': {}", base, e))?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base, client, token, installation_id })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> BackendResult<Response> {
        let resp = match self.authed(req).send().await {
            Ok(r) => r,
            Err(e) => return BackendResult::Error(e.into()),
        };
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return BackendResult::NotProvisioned;
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return BackendResult::Error(BackendError::Status { status: status.as_u16(), body });
        }
        BackendResult::Found(resp)
    }

    /// Resolve the installation identifier, either fixed or from the host metadata endpoint.
    pub async fn installation_id(&self) -> BackendResult<String> {
        if let Some(id) = &self.installation_id {
            return BackendResult::Found(id.clone());
        }
        let url = match self.base.join(METADATA_PATH) {
            Ok(u) => u,
            Err(e) => return BackendResult::Error(BackendError::Metadata(e.to_string())),
        };
        let resp = match self.send(self.client.get(url)).await {
            BackendResult::Found(r) => r,
            BackendResult::NotProvisioned => return BackendResult::NotProvisioned,
            BackendResult::Error(e) => return BackendResult::Error(e),
        };
        let meta: MetadataResponse = match resp.json().await {
            Ok(m) => m,
            Err(e) => return BackendResult::Error(BackendError::Metadata(e.to_string())),
        };
        match meta.installation_id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => BackendResult::Found(s),
            Some(serde_json::Value::Number(n)) => BackendResult::Found(n.to_string()),
            _ => BackendResult::Error(BackendError::Metadata("installationId missing".into())),
        }
    }

    fn storage_url(&self, installation_id: &str) -> Result<Url, BackendError> {
        self.base
            .join(&format!("/api/v2/apps/installations/{}/storage.json", installation_id))
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    /// Raw stored text for `key`; `Found(None)` when the key has never been written.
    pub async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let id = match self.installation_id().await {
            BackendResult::Found(id) => id,
            BackendResult::NotProvisioned => return BackendResult::NotProvisioned,
            BackendResult::Error(e) => return BackendResult::Error(e),
        };
        let mut url = match self.storage_url(&id) {
            Ok(u) => u,
            Err(e) => return BackendResult::Error(e),
        };
        url.query_pairs_mut().append_pair("key", key);
        debug!(target: "admin_enforcer::remote", installation = %id, key, "GET installation storage");
        let resp = match self.send(self.client.get(url)).await {
            BackendResult::Found(r) => r,
            BackendResult::NotProvisioned => return BackendResult::NotProvisioned,
            BackendResult::Error(e) => return BackendResult::Error(e),
        };
        match resp.json::<StorageValue>().await {
            Ok(v) => BackendResult::Found(v.value),
            Err(e) => BackendResult::Error(BackendError::Payload(e.to_string())),
        }
    }

    /// Replace the stored text for `key`.
    pub async fn put(&self, key: &str, value: &str) -> BackendResult<()> {
        let id = match self.installation_id().await {
            BackendResult::Found(id) => id,
            BackendResult::NotProvisioned => return BackendResult::NotProvisioned,
            BackendResult::Error(e) => return BackendResult::Error(e),
        };
        let url = match self.storage_url(&id) {
            Ok(u) => u,
            Err(e) => return BackendResult::Error(e),
        };
        debug!(target: "admin_enforcer::remote", installation = %id, key, "PUT installation storage");
        let body = serde_json::json!({"key": key, "value": value});
        self.send(self.client.put(url).json(&body)).await.map(|_| ())
    }
}

/// State of an in-process remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    Provisioned(Option<String>),
    NotProvisioned,
    Failing(String),
}

/// In-process stand-in for installation storage holding a single document.
/// Standalone deployments use it in the `NotProvisioned` state.
#[derive(Clone)]
pub struct MemoryRemote {
    state: Arc<RwLock<RemoteState>>,
}

impl MemoryRemote {
    pub fn new(state: RemoteState) -> Self { Self { state: Arc::new(RwLock::new(state)) } }

    pub fn provisioned() -> Self { Self::new(RemoteState::Provisioned(None)) }

    pub fn not_provisioned() -> Self { Self::new(RemoteState::NotProvisioned) }

    pub fn set_state(&self, state: RemoteState) { *self.state.write() = state; }

    pub fn state(&self) -> RemoteState { self.state.read().clone() }

    pub fn get(&self) -> BackendResult<Option<String>> {
        match &*self.state.read() {
            RemoteState::Provisioned(v) => BackendResult::Found(v.clone()),
            RemoteState::NotProvisioned => BackendResult::NotProvisioned,
            RemoteState::Failing(reason) => BackendResult::Error(BackendError::Transport(reason.clone())),
        }
    }

    pub fn put(&self, value: &str) -> BackendResult<()> {
        let mut w = self.state.write();
        match &mut *w {
            RemoteState::Provisioned(v) => {
                *v = Some(value.to_string());
                BackendResult::Found(())
            }
            RemoteState::NotProvisioned => BackendResult::NotProvisioned,
            RemoteState::Failing(reason) => BackendResult::Error(BackendError::Transport(reason.clone())),
        }
    }
}

/// Primary backend selection.
#[derive(Clone)]
pub enum RemoteBackend {
    Http(InstallationStorage),
    Memory(MemoryRemote),
}

impl RemoteBackend {
    pub async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        match self {
            RemoteBackend::Http(h) => h.get(key).await,
            RemoteBackend::Memory(m) => m.get(),
        }
    }

    pub async fn put(&self, key: &str, value: &str) -> BackendResult<()> {
        match self {
            RemoteBackend::Http(h) => h.put(key, value).await,
            RemoteBackend::Memory(m) => m.put(value),
        }
    }

    pub fn ident(&self) -> String {
        match self {
            RemoteBackend::Http(h) => format!("http:{}", h.base),
            RemoteBackend::Memory(m) => match m.state() {
                RemoteState::NotProvisioned => "standalone".to_string(),
                _ => "memory".to_string(),
            },
        }
    }
}
