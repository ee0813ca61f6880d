/// User Store - per-user records in the shared document
///
/// Every operation is one full round trip: fetch the whole document, change a
/// local copy, upload the whole document. Nothing coordinates concurrent
/// callers, so two writers racing on the same document end up with the last
/// upload winning. Network and decoding failures are logged and swallowed; the
/// caller sees "no data" or a silent no-op.
use std::sync::Arc;

use crate::backend::{DocumentBackend, SkyDbBackend};
use crate::config::SkyDbConfig;
use crate::document::{Collection, Collections, Document, Nft, UserProfile, UserRecord, UserUpdate};
use crate::error::StoreError;

pub struct UserStore<B: DocumentBackend> {
    backend: Arc<B>,
}

impl<B: DocumentBackend> Clone for UserStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl UserStore<SkyDbBackend> {
    /// Store over SkyDB using portal, seed and data key from the environment
    pub fn from_env() -> Self {
        Self::new(SkyDbBackend::from_config(&SkyDbConfig::from_env()))
    }
}

impl<B: DocumentBackend> UserStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_shared(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // ============================================================================
    // Raw document access
    // ============================================================================

    /// Upload the whole document. Does not check what it overwrites.
    pub async fn upload_document(&self, document: &Document) {
        if let Err(e) = self.backend.upload(document).await {
            log::error!("Failed to upload document: {}", e);
        }
    }

    /// The whole document, or `None` if it is absent or could not be read
    pub async fn get_document(&self) -> Option<Document> {
        match self.backend.fetch().await {
            Ok(Some(fetched)) => {
                // Revision is not used for conflict detection
                log::debug!("Fetched document at revision {}", fetched.revision);
                Some(fetched.document)
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to fetch document: {}", e);
                None
            }
        }
    }

    // ============================================================================
    // Users
    // ============================================================================

    /// Record for `address`, `Ok(None)` if there is none
    ///
    /// Fails with `DocumentMissing` when the document itself cannot be read.
    pub async fn get_user(&self, address: &str) -> Result<Option<UserRecord>, StoreError> {
        let document = self.get_document().await.ok_or(StoreError::DocumentMissing)?;
        Ok(document.user(address).cloned())
    }

    /// First user with this username, with their address attached
    pub async fn get_user_by_username(&self, username: &str) -> Option<UserProfile> {
        let Some(document) = self.get_document().await else {
            log::info!("No document to search for username '{}'", username);
            return None;
        };
        let profile = document.find_by_username(username);
        if profile.is_none() {
            log::info!("There is no user with username '{}'", username);
        }
        profile
    }

    /// Insert an empty record for `address` unless one exists
    pub async fn onboard_user(&self, address: &str) {
        let Some(mut document) = self.document_for_write().await else {
            return;
        };
        if !document.onboard(address) {
            log::info!("Address {} is already onboarded", address);
            return;
        }
        log::info!("Onboarding {}", address);
        self.upload_document(&document).await;
    }

    /// Merge `updates` into an existing record; no-op for unknown addresses
    pub async fn update_user(&self, address: &str, updates: UserUpdate) {
        if let Err(e) = updates.validate() {
            log::error!("Rejected update for {}: {}", address, e);
            return;
        }
        if updates.is_empty() {
            return;
        }
        self.mutate_existing(address, |record| updates.apply_to(record))
            .await;
    }

    /// Append a transaction hash unless it is already logged
    pub async fn log_transaction(&self, address: &str, hash: &str) {
        self.mutate_existing(address, |record| {
            if !record.log_transaction(hash) {
                log::debug!("Transaction {} already logged for {}", hash, address);
            }
        })
        .await;
    }

    /// Append to the legacy `NFTs` contract log, duplicates included
    pub async fn log_contract_address(&self, address: &str, contract_address: &str) {
        self.mutate_existing(address, |record| record.log_contract_address(contract_address))
            .await;
    }

    // ============================================================================
    // Collections
    // ============================================================================

    /// Insert or replace `nft` in the user's collection for `contract_address`
    ///
    /// Creates the user record if the address was never onboarded.
    pub async fn update_user_nfts(&self, address: &str, contract_address: &str, nft: Nft) {
        let Some(mut document) = self.document_for_write().await else {
            return;
        };
        let Some(record) = document.user_or_default(address) else {
            log::error!("Record for {} is unreadable, not adding NFT", address);
            return;
        };
        record.upsert_nft(contract_address, nft);
        self.upload_document(&document).await;
    }

    /// NFTs of one collection; `None` for unknown addresses or contracts
    pub async fn get_nfts_of_collection(
        &self,
        address: &str,
        contract_address: &str,
    ) -> Option<Collection> {
        let document = self.get_document().await?;
        document
            .user(address)?
            .collections
            .get(contract_address)
            .cloned()
    }

    /// All collections of a user; `None` for unknown addresses
    pub async fn get_all_collections(&self, address: &str) -> Option<Collections> {
        let document = self.get_document().await?;
        document.user(address).map(|user| user.collections.clone())
    }

    /// Name a collection so it can be found with `get_collection_by_collection_title`
    pub async fn set_collection_title(&self, address: &str, contract_address: &str, title: &str) {
        self.mutate_existing(address, |record| {
            record
                .collection_titles
                .insert(contract_address.to_string(), title.to_string());
        })
        .await;
    }

    pub async fn get_collection_by_collection_title(
        &self,
        address: &str,
        title: &str,
    ) -> Option<Collection> {
        let document = self.get_document().await?;
        let found = document
            .user(address)
            .and_then(|user| user.collection_by_title(title))
            .map(|(_, collection)| collection.clone());
        if found.is_none() {
            log::error!("The user has no collection titled {}", title);
        }
        found
    }

    /// Document to build on for writes that may create it
    ///
    /// An absent document starts empty. A failed fetch yields `None` so the
    /// caller skips the write instead of replacing the stored document.
    async fn document_for_write(&self) -> Option<Document> {
        match self.backend.fetch().await {
            Ok(Some(fetched)) => Some(fetched.document),
            Ok(None) => Some(Document::new()),
            Err(e) => {
                log::error!("Failed to fetch document, skipping write: {}", e);
                None
            }
        }
    }

    /// Fetch, apply `f` to the record for `address` if present, upload
    async fn mutate_existing<F>(&self, address: &str, f: F)
    where
        F: FnOnce(&mut UserRecord) + Send,
    {
        let Some(mut document) = self.get_document().await else {
            log::info!("No document, {} is not in the database", address);
            return;
        };
        let Some(record) = document.user_mut(address) else {
            if document.contains(address) {
                log::error!("Record for {} is unreadable, leaving it untouched", address);
            } else {
                log::info!("Address {} is not in the database", address);
            }
            return;
        };
        f(record);
        self.upload_document(&document).await;
    }
}
