//! User store behaviour over the in-memory backend
//!
//! Tests cover:
//! - Onboarding (idempotence, creating the document)
//! - Transaction and contract logs (dedup vs. append)
//! - NFT upserts and collection reads
//! - Collection titles
//! - Failure handling (absent document, offline backend)

mod common;

use openape::{Document, MemoryBackend, Nft, StoreError, UserStore, UserUpdate};
use serde_json::json;

const ALICE: &str = "0xA11CE";
const BOB: &str = "0xB0B";

fn store() -> UserStore<MemoryBackend> {
    common::init_logger();
    UserStore::new(MemoryBackend::new())
}

// ============================================================================
// Onboarding
// ============================================================================

#[tokio::test]
async fn test_onboard_creates_document_with_default_record() {
    let store = store();
    store.onboard_user(ALICE).await;

    let user = store.get_user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.username, "");
    assert!(user.transactions.is_empty());
    assert!(user.collections.is_empty());

    let stored = store.backend().snapshot().await.unwrap().to_value().unwrap();
    assert_eq!(
        stored,
        json!({ALICE: {"username": "", "transactions": [], "collections": {}}})
    );
}

#[tokio::test]
async fn test_onboard_is_idempotent() {
    let store = store();
    store.onboard_user(ALICE).await;
    store
        .update_user(ALICE, UserUpdate::username("alice"))
        .await;
    let before = store.get_user(ALICE).await.unwrap();
    let revision = store.backend().revision().await;

    store.onboard_user(ALICE).await;

    assert_eq!(store.get_user(ALICE).await.unwrap(), before);
    // Nothing was uploaded the second time
    assert_eq!(store.backend().revision().await, revision);
}

// ============================================================================
// Logs
// ============================================================================

#[tokio::test]
async fn test_log_transaction_dedups() {
    let store = store();
    store.onboard_user(ALICE).await;
    store.log_transaction(ALICE, "0xabc").await;
    store.log_transaction(ALICE, "0xabc").await;

    let user = store.get_user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.transactions, vec!["0xabc"]);
}

#[tokio::test]
async fn test_log_transaction_keeps_call_order() {
    let store = store();
    store.onboard_user(ALICE).await;
    store.log_transaction(ALICE, "0x2").await;
    store.log_transaction(ALICE, "0x1").await;

    let user = store.get_user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.transactions, vec!["0x2", "0x1"]);
}

#[tokio::test]
async fn test_log_contract_address_keeps_duplicates() {
    let store = store();
    store.onboard_user(ALICE).await;
    store.log_contract_address(ALICE, "0xC").await;
    store.log_contract_address(ALICE, "0xC").await;

    let user = store.get_user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.nfts, Some(vec!["0xC".to_string(), "0xC".to_string()]));
}

#[tokio::test]
async fn test_writes_for_unknown_address_are_noops() {
    let store = store();
    store.onboard_user(ALICE).await;
    let revision = store.backend().revision().await;

    store.log_transaction(BOB, "0xabc").await;
    store.log_contract_address(BOB, "0xC").await;
    store.update_user(BOB, UserUpdate::username("bob")).await;
    store.set_collection_title(BOB, "0xC", "Apes").await;

    assert_eq!(store.get_user(BOB).await.unwrap(), None);
    assert_eq!(store.backend().revision().await, revision);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_update_user_merges_present_fields_only() {
    let store = store();
    store.onboard_user(ALICE).await;
    store.log_transaction(ALICE, "0xabc").await;

    store
        .update_user(ALICE, UserUpdate::username("alice"))
        .await;

    let user = store.get_user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.transactions, vec!["0xabc"]);
}

#[tokio::test]
async fn test_invalid_update_is_rejected() {
    let store = store();
    store.onboard_user(ALICE).await;

    store
        .update_user(ALICE, UserUpdate::username("a".repeat(200)))
        .await;

    let user = store.get_user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.username, "");
}

#[tokio::test]
async fn test_get_user_by_username() {
    let store = store();
    store.onboard_user(BOB).await;
    store.onboard_user(ALICE).await;
    store.update_user(BOB, UserUpdate::username("ape")).await;
    store.update_user(ALICE, UserUpdate::username("ape")).await;

    // First match in onboarding order
    let profile = store.get_user_by_username("ape").await.unwrap();
    assert_eq!(profile.public_address, BOB);
    assert_eq!(profile.record.username, "ape");

    assert!(store.get_user_by_username("nobody").await.is_none());
}

// ============================================================================
// Collections
// ============================================================================

#[tokio::test]
async fn test_update_user_nfts_then_read_collections() {
    let store = store();
    store.onboard_user(ALICE).await;
    store
        .update_user_nfts(ALICE, "0xContract1", Nft::new("X", "d", "img1"))
        .await;

    let collections = store.get_all_collections(ALICE).await.unwrap();
    assert_eq!(
        serde_json::to_value(&collections).unwrap(),
        json!({"0xContract1": {"img1": {"name": "X", "description": "d", "image": "img1"}}})
    );
}

#[tokio::test]
async fn test_nft_upsert_second_value_wins() {
    let store = store();
    store.onboard_user(ALICE).await;
    store
        .update_user_nfts(ALICE, "0xC", Nft::new("First", "d", "img1"))
        .await;
    store
        .update_user_nfts(ALICE, "0xC", Nft::new("Second", "d2", "img1"))
        .await;

    let collection = store.get_nfts_of_collection(ALICE, "0xC").await.unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection["img1"].name, "Second");
    assert_eq!(collection["img1"].description, "d2");
}

#[tokio::test]
async fn test_update_user_nfts_creates_missing_user() {
    let store = store();
    store.onboard_user(ALICE).await;
    store
        .update_user_nfts(BOB, "0xC", Nft::new("X", "d", "img1"))
        .await;

    let bob = store.get_user(BOB).await.unwrap().unwrap();
    assert_eq!(bob.username, "");
    assert!(bob.collections["0xC"].contains_key("img1"));
}

#[tokio::test]
async fn test_collection_reads_for_unknown_address() {
    let store = store();
    store.onboard_user(ALICE).await;

    assert!(store.get_all_collections(BOB).await.is_none());
    assert!(store.get_nfts_of_collection(BOB, "0xC").await.is_none());
    assert!(store.get_nfts_of_collection(ALICE, "0xC").await.is_none());
}

#[tokio::test]
async fn test_collection_by_title() {
    let store = store();
    store.onboard_user(ALICE).await;
    store
        .update_user_nfts(ALICE, "0xC", Nft::new("X", "d", "img1"))
        .await;

    assert!(store
        .get_collection_by_collection_title(ALICE, "Apes")
        .await
        .is_none());

    store.set_collection_title(ALICE, "0xC", "Apes").await;
    let collection = store
        .get_collection_by_collection_title(ALICE, "Apes")
        .await
        .unwrap();
    assert!(collection.contains_key("img1"));
}

#[tokio::test]
async fn test_documents_from_other_clients_stay_usable() {
    common::init_logger();
    let document = Document::from_value(json!({
        ALICE: {
            "username": "alice",
            "transactions": null,
            "collections": {
                "0xC": {
                    "title": "Apes",
                    "img1": {"name": "X", "description": "d", "image": "img1"}
                }
            }
        },
        BOB: {"username": ["not", "a", "string"]}
    }))
    .unwrap();
    let store = UserStore::new(MemoryBackend::with_document(document));

    let alice = store.get_user(ALICE).await.unwrap().unwrap();
    assert!(alice.transactions.is_empty());
    let collection = store
        .get_collection_by_collection_title(ALICE, "Apes")
        .await
        .unwrap();
    assert!(collection.contains_key("img1"));

    // Writes elsewhere leave the odd record alone
    store.log_transaction(ALICE, "0xabc").await;
    store
        .update_user_nfts(BOB, "0xC", Nft::new("X", "d", "img1"))
        .await;
    assert_eq!(store.get_user(BOB).await.unwrap(), None);

    let stored = store.backend().snapshot().await.unwrap().to_value().unwrap();
    assert_eq!(stored[ALICE]["transactions"], json!(["0xabc"]));
    assert_eq!(stored[ALICE]["collections"]["0xC"]["title"], json!("Apes"));
    assert_eq!(stored[BOB], json!({"username": ["not", "a", "string"]}));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_get_user_on_absent_document() {
    let store = store();
    assert!(matches!(
        store.get_user(ALICE).await,
        Err(StoreError::DocumentMissing)
    ));
    assert!(store.get_document().await.is_none());
    assert!(store.get_all_collections(ALICE).await.is_none());
    assert!(store.get_user_by_username("ape").await.is_none());
}

#[tokio::test]
async fn test_offline_backend_is_swallowed() {
    common::init_logger();
    let mut document = Document::new();
    document.onboard(ALICE);
    let store = UserStore::new(MemoryBackend::with_document(document.clone()));

    store.backend().set_offline(true).await;

    // Reads degrade to "no data", writes to no-ops
    assert!(store.get_document().await.is_none());
    assert!(store.get_user_by_username("").await.is_none());
    store.onboard_user(BOB).await;
    store
        .update_user_nfts(BOB, "0xC", Nft::new("X", "d", "img1"))
        .await;
    store.log_transaction(ALICE, "0xabc").await;

    store.backend().set_offline(false).await;
    assert_eq!(store.backend().snapshot().await, Some(document));
}

#[tokio::test]
async fn test_end_to_end_transaction_log() {
    let store = store();
    store.onboard_user(ALICE).await;
    store.log_transaction(ALICE, "0xabc").await;
    store.log_transaction(ALICE, "0xabc").await;

    let user = store.get_user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.transactions, vec!["0xabc"]);
    // onboard + one accepted log + duplicate log rewrite
    assert_eq!(store.backend().revision().await, 2);
}
