use thiserror::Error;

/// Outcome of a single backend call.
#[derive(Debug)]
pub enum BackendResult<T> {
    Found(T),
    /// The backend confirmed the installation/resource does not exist (HTTP 404).
    NotProvisioned,
    Error(BackendError),
}

impl<T> BackendResult<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BackendResult<U> {
        match self {
            BackendResult::Found(v) => BackendResult::Found(f(v)),
            BackendResult::NotProvisioned => BackendResult::NotProvisioned,
            BackendResult::Error(e) => BackendResult::Error(e),
        }
    }

    pub fn is_not_provisioned(&self) -> bool { matches!(self, BackendResult::NotProvisioned) }
}

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("storage responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("storage request failed: {0}")]
    Transport(String),
    #[error("installation metadata unavailable: {0}")]
    Metadata(String),
    #[error("local storage i/o failed: {0}")]
    Io(String),
    #[error("unexpected storage payload: {0}")]
    Payload(String),
}

impl BackendError {
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Status { .. } => "backend_status",
            BackendError::Transport(_) => "backend_transport",
            BackendError::Metadata(_) => "backend_metadata",
            BackendError::Io(_) => "backend_io",
            BackendError::Payload(_) => "backend_payload",
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self { BackendError::Transport(err.to_string()) }
}
