//! OpenApe: user datastore on SkyDB and wallet connection
//!
//! One JSON document, keyed by Ethereum address, lives in SkyDB under a key
//! pair derived from a shared seed. This crate reads and rewrites it and
//! connects an injected Ethereum wallet whose account is then onboarded.
//!
//! # Architecture
//!
//! - **Skynet client**: registry entries, skyfile upload/download and the
//!   SkyDB JSON layer on top of them
//! - **User store**: fetch-mutate-upload operations on the shared document,
//!   over a pluggable `DocumentBackend` (SkyDB or in-memory)
//! - **Wallet**: injected-provider connector, connection state machine and
//!   the connect button controller
//!
//! # Example
//!
//! ```ignore
//! use openape::{Nft, UserStore};
//!
//! let store = UserStore::from_env();
//! store.onboard_user("0xA").await;
//! store.log_transaction("0xA", "0xabc").await;
//! store
//!     .update_user_nfts("0xA", "0xContract1", Nft::new("X", "d", "img1"))
//!     .await;
//!
//! let collections = store.get_all_collections("0xA").await;
//! ```

// Public modules
pub mod backend;
pub mod config;
pub mod crypto;
pub mod document;
pub mod error;
pub mod skynet;
pub mod store;
pub mod wallet;

// Re-exports for convenience
pub use backend::{DocumentBackend, Fetched, MemoryBackend, SkyDbBackend};
pub use config::{SkyDbConfig, WalletConfig};
pub use crypto::{hash_data_key, hash_registry_entry, KeyPair, PublicKey};
pub use document::{Collection, Collections, Document, Nft, UserProfile, UserRecord, UserUpdate};
pub use error::{ConfigError, ConnectorError, SkynetError, StoreError};
pub use skynet::{JsonData, Skylink, SkynetClient};
pub use store::UserStore;
pub use wallet::{
    ButtonView, ConnectButton, ConnectionState, EthereumProvider, HttpProvider, InjectedConnector,
    LogNotifier, Notifier, ProviderEvent,
};

// Common result type
pub type Result<T> = std::result::Result<T, StoreError>;
