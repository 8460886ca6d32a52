//!
//! admin_enforcer storage module
//! -----------------------------
//! Backends that hold the persisted rule document. The primary backend is the
//! remote installation storage (`remote`); when that reports the installation as
//! absent, the rule store switches to the on-device key-value store (`local`).
//!
//! Backends answer with `BackendResult` so callers branch on "not provisioned"
//! explicitly instead of inspecting transport errors.

pub mod backend;
pub mod local;
pub mod remote;

pub use backend::{BackendError, BackendResult};
pub use local::LocalStore;
pub use remote::{InstallationStorage, MemoryRemote, RemoteBackend, RemoteState};
