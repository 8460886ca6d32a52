//! Save-time enforcement: decide whether a ticket may be saved given its requester,
//! its collaborators and the current rules.

use serde::Serialize;

use crate::rules::{email_domain, normalize_email, RuleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    /// Requester missing or without an `@`; no domain to check.
    NoRequester,
    NoRule,
    RequesterIsAdmin,
    AdminCopied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow(AllowReason),
    Deny { required_admin: String, domain: String, message: String },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool { matches!(self, Verdict::Allow(_)) }

    pub fn message(&self) -> Option<&str> {
        match self {
            Verdict::Allow(_) => None,
            Verdict::Deny { message, .. } => Some(message.as_str()),
        }
    }
}

pub fn deny_message(required_admin: &str, domain: &str) -> String {
    format!("Admin {} must be CC'd before saving (for @{}).", required_admin, domain)
}

/// Evaluate one save attempt. Pure; `None` collaborator entries are skipped.
pub fn evaluate<I, S>(requester: Option<&str>, collaborators: I, rules: &RuleSet) -> Verdict
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let requester = match requester.map(normalize_email) {
        Some(r) if r.contains('@') => r,
        _ => return Verdict::Allow(AllowReason::NoRequester),
    };
    let Some(domain) = email_domain(&requester) else {
        return Verdict::Allow(AllowReason::NoRequester);
    };
    let Some(required_admin) = rules.get(domain) else {
        return Verdict::Allow(AllowReason::NoRule);
    };
    if requester == required_admin {
        return Verdict::Allow(AllowReason::RequesterIsAdmin);
    }
    let copied = collaborators
        .into_iter()
        .flatten()
        .any(|cc| normalize_email(cc.as_ref()) == required_admin);
    if copied {
        return Verdict::Allow(AllowReason::AdminCopied);
    }
    Verdict::Deny {
        required_admin: required_admin.to_string(),
        domain: domain.to_string(),
        message: deny_message(required_admin, domain),
    }
}

/// Inputs of a single save attempt.
#[derive(Debug, Clone, Default)]
pub struct EnforcementContext {
    pub requester_email: Option<String>,
    pub collaborator_emails: Vec<Option<String>>,
    pub rules: RuleSet,
}

impl EnforcementContext {
    pub fn evaluate(&self) -> Verdict {
        evaluate(self.requester_email.as_deref(), self.collaborator_emails.iter().map(Option::as_deref), &self.rules)
    }
}
