//! Error types for OpenApe operations
//!
//! One enum per concern: portal transport, user store, configuration and the
//! wallet connector taxonomy shown to users.

use thiserror::Error;

/// Failures talking to a Skynet portal or validating what it returns
#[derive(Error, Debug)]
pub enum SkynetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Portal returned {status}: {body}")]
    Portal { status: u16, body: String },

    #[error("Invalid skylink: {0}")]
    InvalidSkylink(String),

    #[error("Invalid registry entry: {0}")]
    InvalidEntry(String),

    #[error("Registry entry signature does not verify")]
    InvalidSignature,

    #[error("Registry revision overflow")]
    RevisionOverflow,
}

impl SkynetError {
    /// Create a portal status error
    pub fn portal(status: u16, body: impl Into<String>) -> Self {
        Self::Portal {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid entry error
    pub fn invalid_entry(msg: impl Into<String>) -> Self {
        Self::InvalidEntry(msg.into())
    }
}

/// Failures of the user document store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Skynet error: {0}")]
    Skynet(#[from] SkynetError),

    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document not found under the configured data key")]
    DocumentMissing,

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Wallet connection failures, classified the way users see them
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("No Ethereum provider detected")]
    NoEthereumProvider,

    #[error("Unsupported chain id {chain_id} (supported: {supported:?})")]
    UnsupportedChainId { chain_id: u64, supported: Vec<u64> },

    #[error("User rejected the request")]
    UserRejectedRequest,

    #[error("Unknown connector error: {0}")]
    Unknown(String),
}

impl ConnectorError {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    pub fn is_unsupported_chain(&self) -> bool {
        matches!(self, Self::UnsupportedChainId { .. })
    }
}
