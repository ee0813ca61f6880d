/// OpenApe configuration from environment variables
///
/// Controls the Skynet portal, the SkyDB seed and data key, and which wallet
/// provider and chains the connect flow accepts.

use std::env;

use crate::error::ConfigError;

/// Portal used when `SKYNET_PORTAL_URL` is not set
pub const DEFAULT_PORTAL_URL: &str = "https://siasky.net/";

/// Data key the shared document lives under
pub const DEFAULT_DATA_KEY: &str = "Open Ape datastore";

/// Mainnet, Ropsten, Matic, Mumbai
pub const DEFAULT_SUPPORTED_CHAIN_IDS: [u64; 4] = [1, 3, 137, 80001];

#[derive(Clone, Debug)]
pub struct SkyDbConfig {
    /// Skynet portal base URL
    pub portal_url: String,
    /// Seed the document key pair is derived from
    pub seed: String,
    /// Fixed data key of the shared document
    pub data_key: String,
}

impl SkyDbConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SKYDB_SEED`: key pair seed (falls back to `NEXT_PUBLIC_SKYDB_SEED`, then "")
    /// - `SKYNET_PORTAL_URL`: portal base URL (default `https://siasky.net/`)
    /// - `SKYDB_DATA_KEY`: document data key (default `Open Ape datastore`)
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let seed = env::var("SKYDB_SEED")
            .or_else(|_| env::var("NEXT_PUBLIC_SKYDB_SEED"))
            .unwrap_or_else(|_| {
                log::warn!("SKYDB_SEED not set, deriving SkyDB keys from an empty seed");
                String::new()
            });

        let portal_url =
            env::var("SKYNET_PORTAL_URL").unwrap_or_else(|_| DEFAULT_PORTAL_URL.to_string());
        log::info!("📡 Skynet portal: {}", portal_url);

        let data_key = env::var("SKYDB_DATA_KEY").unwrap_or_else(|_| DEFAULT_DATA_KEY.to_string());
        log::debug!("SkyDB data key: {}", data_key);

        Self {
            portal_url,
            seed,
            data_key,
        }
    }

    /// Configuration for a given portal and seed with the default data key
    pub fn new(portal_url: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            portal_url: portal_url.into(),
            seed: seed.into(),
            data_key: DEFAULT_DATA_KEY.to_string(),
        }
    }

    pub fn with_data_key(mut self, data_key: impl Into<String>) -> Self {
        self.data_key = data_key.into();
        self
    }
}

impl Default for SkyDbConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORTAL_URL, "")
    }
}

#[derive(Clone, Debug)]
pub struct WalletConfig {
    /// JSON-RPC endpoint of the injected provider, if any
    pub provider_url: Option<String>,
    /// Chains the connector accepts
    pub supported_chain_ids: Vec<u64>,
}

impl WalletConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ETH_PROVIDER_URL`: provider endpoint (unset means no provider detected)
    /// - `SUPPORTED_CHAIN_IDS`: comma-separated chain ids (default `1,3,137,80001`)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let provider_url = env::var("ETH_PROVIDER_URL").ok().filter(|url| !url.is_empty());
        match provider_url {
            Some(ref url) => log::info!("🔗 Ethereum provider: {}", url),
            None => log::info!("No ETH_PROVIDER_URL set, wallet connect will report no provider"),
        }

        let supported_chain_ids = match env::var("SUPPORTED_CHAIN_IDS") {
            Ok(raw) => parse_chain_ids(&raw)?,
            Err(_) => DEFAULT_SUPPORTED_CHAIN_IDS.to_vec(),
        };

        Ok(Self {
            provider_url,
            supported_chain_ids,
        })
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            provider_url: None,
            supported_chain_ids: DEFAULT_SUPPORTED_CHAIN_IDS.to_vec(),
        }
    }
}

/// Parse a comma-separated list of decimal or `0x`-prefixed chain ids
pub fn parse_chain_ids(raw: &str) -> Result<Vec<u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let parsed = match s.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse::<u64>(),
            };
            parsed.map_err(|e| ConfigError::InvalidValue {
                name: "SUPPORTED_CHAIN_IDS",
                reason: format!("'{}': {}", s, e),
            })
        })
        .collect()
}
