pub mod config;
pub mod enforce;
pub mod error;
pub mod host;
pub mod rules;
pub mod server;
pub mod storage;
pub mod store;

pub use enforce::{evaluate, AllowReason, EnforcementContext, Verdict};
pub use error::{AppError, AppResult};
pub use rules::{Rule, RuleSet};
pub use store::RuleStore;
