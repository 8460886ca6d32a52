//! HTTP surface: rule editing behind edit mode and the ticket save hook.

mod common;

use admin_enforcer::server::{router, AppState};
use admin_enforcer::storage::{LocalStore, MemoryRemote, RemoteBackend};
use admin_enforcer::store::RuleStore;
use common::spawn;
use serde_json::{json, Value};

async fn start(edit_mode: bool) -> (String, RuleStore) {
    let store = RuleStore::new(RemoteBackend::Memory(MemoryRemote::provisioned()), LocalStore::in_memory());
    let base = spawn(router(AppState { store: store.clone(), edit_mode })).await;
    (base, store)
}

async fn body(resp: reqwest::Response) -> (u16, Value) {
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn edits_and_listing() {
    let (base, store) = start(true).await;
    let client = reqwest::Client::new();

    let (status, v) = body(client.put(format!("{base}/rules")).json(&json!({"domain": "@Globex.com", "email": "Hank@Globex.com"})).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(v["rule"], json!({"domain": "globex.com", "email": "hank@globex.com"}));
    client.put(format!("{base}/rules")).json(&json!({"domain": "acme.com", "email": "erin@acme.com"})).send().await.unwrap();

    let (status, v) = body(client.get(format!("{base}/rules")).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(v["rules"], json!([
        {"domain": "acme.com", "email": "erin@acme.com"},
        {"domain": "globex.com", "email": "hank@globex.com"}
    ]));

    let (status, v) = body(client.delete(format!("{base}/rules/globex.com")).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(v["removed"], json!(true));
    assert_eq!(v["notifications"], json!([{"message": "Removed rule for @globex.com.", "severity": "notice"}]));
    assert_eq!(store.load_all().await.len(), 1);

    let (status, _) = body(client.delete(format!("{base}/rules")).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert!(store.load_all().await.is_empty());
}

#[tokio::test]
async fn invalid_rule_is_a_400() {
    let (base, store) = start(true).await;
    let client = reqwest::Client::new();
    let (status, v) = body(client.put(format!("{base}/rules")).json(&json!({"domain": "acme", "email": "erin@acme.com"})).send().await.unwrap()).await;
    assert_eq!(status, 400);
    assert_eq!(v["code"], json!("invalid_domain"));
    assert_eq!(v["error"], json!("Enter a valid domain like \"disney.com\"."));
    assert!(store.load_all().await.is_empty());
}

#[tokio::test]
async fn edits_are_refused_outside_edit_mode() {
    let (base, store) = start(false).await;
    store.add_or_update("acme.com", "erin@acme.com").await.unwrap();
    let client = reqwest::Client::new();
    let (status, v) = body(client.put(format!("{base}/rules")).json(&json!({"domain": "globex.com", "email": "hank@globex.com"})).send().await.unwrap()).await;
    assert_eq!(status, 403);
    assert_eq!(v["code"], json!("edit_disabled"));
    let (status, _) = body(client.delete(format!("{base}/rules/acme.com")).send().await.unwrap()).await;
    assert_eq!(status, 403);
    let (status, _) = body(client.delete(format!("{base}/rules")).send().await.unwrap()).await;
    assert_eq!(status, 403);
    // reads still work
    let (status, v) = body(client.get(format!("{base}/rules")).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(v["rules"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn ticket_save_blocks_until_admin_is_copied() {
    let (base, store) = start(false).await;
    store.add_or_update("acme.com", "erin@acme.com").await.unwrap();
    let client = reqwest::Client::new();
    let url = format!("{base}/ticket/save");

    let (status, v) = body(client.post(&url).json(&json!({
        "ticket.requester": {"email": "bob@acme.com"},
        "ticket.collaborators": [{"email": "carol@acme.com"}]
    })).send().await.unwrap()).await;
    assert_eq!(status, 422);
    assert_eq!(v["allow"], json!(false));
    assert_eq!(v["message"], json!("Admin erin@acme.com must be CC'd before saving (for @acme.com)."));
    assert_eq!(v["notifications"][0]["severity"], json!("error"));

    let (status, v) = body(client.post(&url).json(&json!({
        "ticket.requester": {"email": "bob@acme.com"},
        "ticket.collaborators": [{"email": "carol@acme.com"}, {"email": "Erin@Acme.com"}]
    })).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(v["reason"], json!("admin_copied"));

    let (status, v) = body(client.post(&url).json(&json!({"ticket.collaborators": []})).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(v["reason"], json!("no_requester"));

    let (status, v) = body(client.post(&url).json(&json!({"ticket.requester": {"email": "erin@acme.com"}})).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(v["reason"], json!("requester_is_admin"));
}
