//! Where the shared document lives
//!
//! - `SkyDbBackend`: the document published in SkyDB under a seed-derived key pair
//! - `MemoryBackend`: process-local copy, for tests and offline use

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::SkyDbConfig;
use crate::crypto::{KeyPair, PublicKey};
use crate::document::Document;
use crate::error::StoreError;
use crate::skynet::SkynetClient;

/// A fetched document and the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub document: Document,
    pub revision: u64,
}

/// Whole-document get and put
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Current document, `None` if it was never written
    async fn fetch(&self) -> Result<Option<Fetched>, StoreError>;

    /// Replace the whole document
    async fn upload(&self, document: &Document) -> Result<(), StoreError>;
}

pub struct SkyDbBackend {
    client: SkynetClient,
    keys: KeyPair,
    data_key: String,
}

impl SkyDbBackend {
    pub fn new(client: SkynetClient, keys: KeyPair, data_key: impl Into<String>) -> Self {
        Self {
            client,
            keys,
            data_key: data_key.into(),
        }
    }

    /// Client, key pair and data key from configuration
    pub fn from_config(config: &SkyDbConfig) -> Self {
        Self::new(
            SkynetClient::new(&config.portal_url),
            KeyPair::from_seed(&config.seed),
            config.data_key.clone(),
        )
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    pub fn data_key(&self) -> &str {
        &self.data_key
    }
}

#[async_trait]
impl DocumentBackend for SkyDbBackend {
    async fn fetch(&self) -> Result<Option<Fetched>, StoreError> {
        let Some(json) = self
            .client
            .get_json(&self.keys.public_key(), &self.data_key)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(Fetched {
            document: Document::from_value(json.data)?,
            revision: json.revision,
        }))
    }

    async fn upload(&self, document: &Document) -> Result<(), StoreError> {
        let value = document.to_value()?;
        self.client.set_json(&self.keys, &self.data_key, &value).await?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    document: Option<Document>,
    revision: u64,
    offline: bool,
}

/// In-process backend with the same whole-document semantics
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                document: Some(document),
                ..Default::default()
            }),
        }
    }

    /// Make every fetch and upload fail until turned back on
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    /// Stored document without going through the failure switch
    pub async fn snapshot(&self) -> Option<Document> {
        self.state.read().await.document.clone()
    }

    /// Revision of the stored document, counted like the registry (first write is 0)
    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn fetch(&self) -> Result<Option<Fetched>, StoreError> {
        let state = self.state.read().await;
        if state.offline {
            return Err(StoreError::Unavailable("memory backend offline".to_string()));
        }
        Ok(state.document.clone().map(|document| Fetched {
            document,
            revision: state.revision,
        }))
    }

    async fn upload(&self, document: &Document) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.offline {
            return Err(StoreError::Unavailable("memory backend offline".to_string()));
        }
        if state.document.is_some() {
            state.revision += 1;
        }
        state.document = Some(document.clone());
        Ok(())
    }
}
