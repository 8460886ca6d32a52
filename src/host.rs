//!
//! Host integration
//! ----------------
//! Glue between the ticketing host and the core: reads the ticket payload the host
//! hands over on save, runs the enforcement check against the stored rules and
//! reports outcomes through a notification sink.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::enforce::{evaluate, AllowReason, Verdict};
use crate::error::AppResult;
use crate::rules::normalize_domain;
use crate::store::RuleStore;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Person {
    #[serde(default)]
    pub email: Option<String>,
}

/// Ticket fields read at save time. The host never gets anything written back.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TicketSnapshot {
    #[serde(rename = "ticket.requester", default)]
    pub requester: Option<Person>,
    #[serde(rename = "ticket.collaborators", default)]
    pub collaborators: Vec<Person>,
}

impl TicketSnapshot {
    pub fn requester_email(&self) -> Option<&str> {
        self.requester.as_ref().and_then(|p| p.email.as_deref())
    }

    pub fn collaborator_emails(&self) -> impl Iterator<Item = Option<&str>> {
        self.collaborators.iter().map(|p| p.email.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Notice,
}

/// Fire-and-forget user notifications; the core never depends on delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => error!(target: "admin_enforcer::notify", "{}", message),
            Severity::Notice => info!(target: "admin_enforcer::notify", "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

/// Buffers notices so a request handler can hand them back to the host.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl CollectingSink {
    pub fn new() -> Self { Self::default() }

    pub fn take(&self) -> Vec<Notice> { std::mem::take(&mut *self.notices.lock()) }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, message: &str, severity: Severity) {
        self.notices.lock().push(Notice { message: message.to_string(), severity });
    }
}

/// The save was rejected; `message` is what the host shows the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveBlocked {
    pub message: String,
}

impl std::fmt::Display for SaveBlocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.message) }
}

impl std::error::Error for SaveBlocked {}

/// Save hook: allow, or block and notify with the denial message.
pub async fn on_ticket_save(store: &RuleStore, ticket: &TicketSnapshot, sink: &dyn NotificationSink) -> Result<AllowReason, SaveBlocked> {
    let rules = store.load_all().await;
    match evaluate(ticket.requester_email(), ticket.collaborator_emails(), &rules) {
        Verdict::Allow(AllowReason::RequesterIsAdmin) => {
            info!(target: "admin_enforcer::host", requester = ?ticket.requester_email(), "requester is the required admin; skipping enforcement");
            Ok(AllowReason::RequesterIsAdmin)
        }
        Verdict::Allow(reason) => {
            info!(target: "admin_enforcer::host", reason = ?reason, "ticket save allowed");
            Ok(reason)
        }
        Verdict::Deny { required_admin, domain, message } => {
            info!(target: "admin_enforcer::host", admin = %required_admin, domain = %domain, "ticket save blocked");
            sink.notify(&message, Severity::Error);
            Err(SaveBlocked { message })
        }
    }
}

/// Remove a rule and tell the user it happened.
pub async fn remove_rule(store: &RuleStore, domain: &str, sink: &dyn NotificationSink) -> AppResult<bool> {
    let existed = store.remove(domain).await?;
    sink.notify(&format!("Removed rule for @{}.", normalize_domain(domain)), Severity::Notice);
    Ok(existed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalStore, MemoryRemote, RemoteBackend};

    async fn store_with_acme() -> RuleStore {
        let store = RuleStore::new(RemoteBackend::Memory(MemoryRemote::provisioned()), LocalStore::in_memory());
        store.add_or_update("acme.com", "erin@acme.com").await.unwrap();
        store
    }

    fn ticket(json: serde_json::Value) -> TicketSnapshot { serde_json::from_value(json).unwrap() }

    #[test]
    fn ticket_payload_tolerates_missing_fields() {
        let t = ticket(serde_json::json!({}));
        assert_eq!(t.requester_email(), None);
        assert_eq!(t.collaborator_emails().count(), 0);

        let t = ticket(serde_json::json!({
            "ticket.requester": {"email": "bob@acme.com", "name": "Bob"},
            "ticket.collaborators": [{"email": null}, {"name": "no email"}, {"email": "carol@acme.com"}]
        }));
        assert_eq!(t.requester_email(), Some("bob@acme.com"));
        assert_eq!(t.collaborator_emails().collect::<Vec<_>>(), vec![None, None, Some("carol@acme.com")]);
    }

    #[tokio::test]
    async fn blocked_save_notifies_error() {
        let store = store_with_acme().await;
        let sink = CollectingSink::new();
        let t = ticket(serde_json::json!({
            "ticket.requester": {"email": "Bob@Acme.com"},
            "ticket.collaborators": [{"email": "carol@acme.com"}]
        }));
        let err = on_ticket_save(&store, &t, &sink).await.unwrap_err();
        assert_eq!(err.to_string(), "Admin erin@acme.com must be CC'd before saving (for @acme.com).");
        assert_eq!(sink.take(), vec![Notice { message: err.message.clone(), severity: Severity::Error }]);
    }

    #[tokio::test]
    async fn allowed_save_is_silent() {
        let store = store_with_acme().await;
        let sink = CollectingSink::new();
        let t = ticket(serde_json::json!({
            "ticket.requester": {"email": "bob@acme.com"},
            "ticket.collaborators": [{"email": "ERIN@acme.com"}]
        }));
        assert_eq!(on_ticket_save(&store, &t, &sink).await.unwrap(), AllowReason::AdminCopied);
        let admin = ticket(serde_json::json!({"ticket.requester": {"email": "erin@acme.com"}}));
        assert_eq!(on_ticket_save(&store, &admin, &LogSink).await.unwrap(), AllowReason::RequesterIsAdmin);
        assert!(sink.take().is_empty());
    }

    #[tokio::test]
    async fn removal_sends_notice() {
        let store = store_with_acme().await;
        let sink = CollectingSink::new();
        assert!(remove_rule(&store, "@ACME.com", &sink).await.unwrap());
        assert_eq!(sink.take(), vec![Notice { message: "Removed rule for @acme.com.".into(), severity: Severity::Notice }]);
        assert!(store.load_all().await.is_empty());
    }
}
