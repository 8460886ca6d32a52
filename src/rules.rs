//!
//! Domain rules
//! ------------
//! Normalization and validation of (domain, required admin email) pairs and the
//! `RuleSet` map that is persisted as the JSON object `{domain: email}`.
//!
//! Keys and values are normalized on every write and again on decode, so lookups
//! are case-insensitive regardless of how a stored document was produced.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Exactly one `@` with non-empty local and domain parts.
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@]+@[^@]+$").expect("email regex"));

pub const INVALID_DOMAIN_MSG: &str = "Enter a valid domain like \"disney.com\".";
pub const INVALID_EMAIL_MSG: &str = "Enter a valid admin email.";

/// Trim, lowercase and strip a single leading `@`.
pub fn normalize_domain(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.strip_prefix('@') {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

pub fn normalize_email(raw: &str) -> String { raw.trim().to_lowercase() }

/// Domain part of an already-normalized email: everything after the first `@`.
pub fn email_domain(email: &str) -> Option<&str> {
    email.split_once('@').map(|(_, domain)| domain)
}

pub fn is_valid_domain(domain: &str) -> bool { !domain.is_empty() && domain.contains('.') }

pub fn is_valid_email(email: &str) -> bool { EMAIL_SHAPE.is_match(email) }

/// Check already-normalized inputs.
pub fn validate_rule(domain: &str, email: &str) -> AppResult<()> {
    if !is_valid_domain(domain) {
        return Err(AppError::validation("invalid_domain", INVALID_DOMAIN_MSG));
    }
    if !is_valid_email(email) {
        return Err(AppError::validation("invalid_email", INVALID_EMAIL_MSG));
    }
    Ok(())
}

/// A single normalized, validated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub domain: String,
    pub email: String,
}

impl Rule {
    pub fn new(domain: &str, email: &str) -> AppResult<Self> {
        let domain = normalize_domain(domain);
        let email = normalize_email(email);
        validate_rule(&domain, &email)?;
        Ok(Self { domain, email })
    }
}

/// Complete mapping of domain -> required admin email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeMap<String, String>);

impl RuleSet {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, domain: &str) -> Option<&str> { self.0.get(domain).map(String::as_str) }

    pub fn contains(&self, domain: &str) -> bool { self.0.contains_key(domain) }

    /// Insert a rule; returns the previous admin for the domain if any.
    pub fn insert(&mut self, rule: Rule) -> Option<String> { self.0.insert(rule.domain, rule.email) }

    /// Remove by raw domain (normalized here); returns whether a rule existed.
    pub fn remove(&mut self, domain: &str) -> bool { self.0.remove(&normalize_domain(domain)).is_some() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Rules in lexicographic domain order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(d, e)| (d.as_str(), e.as_str()))
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.iter().map(|(d, e)| Rule { domain: d.to_string(), email: e.to_string() }).collect()
    }

    pub fn encode(&self) -> String {
        // BTreeMap<String, String> always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse a stored document. Returns None when the text is not a JSON object of strings.
    /// Entries are re-normalized. Older writers only required a dotted domain and an `@`
    /// in the email, so anything of that shape is kept even when it fails `validate_rule`;
    /// only pairs no writer could have produced are dropped.
    pub fn decode(text: &str) -> Option<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(text).ok()?;
        let mut out = RuleSet::new();
        for (domain, email) in raw {
            let (domain, email) = (normalize_domain(&domain), normalize_email(&email));
            if !is_valid_domain(&domain) || !email.contains('@') {
                warn!(target: "admin_enforcer::rules", domain = %domain, "dropping unusable stored rule");
                continue;
            }
            if !is_valid_email(&email) {
                warn!(target: "admin_enforcer::rules", domain = %domain, admin = %email, "keeping stored rule with a malformed admin email");
            }
            out.0.insert(domain, email);
        }
        Some(out)
    }

    /// Like `decode`, but malformed text reads as an empty set.
    pub fn decode_or_empty(text: &str) -> Self {
        if text.trim().is_empty() { return RuleSet::new(); }
        match Self::decode(text) {
            Some(set) => set,
            None => {
                warn!(target: "admin_enforcer::rules", "stored rule document is malformed; treating as empty");
                RuleSet::new()
            }
        }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        let mut set = RuleSet::new();
        for rule in iter { set.insert(rule); }
        set
    }
}
