//! Common test utilities for OpenApe integration tests
//!
//! - Logger setup
//! - A SkyDB-backed store pointed at an in-process mock portal
//! - A scripted Ethereum provider for wallet connection tests

#![allow(dead_code)]

use async_trait::async_trait;
use openape::wallet::provider::{EthereumProvider, ProviderError};
use openape::{KeyPair, SkyDbBackend, SkynetClient, UserStore};
use serde_json::{json, Value};
use skynet_mock::MockPortal;
use std::sync::Mutex;

pub const TEST_SEED: &str = "open ape integration seed";
pub const TEST_DATA_KEY: &str = "Open Ape datastore";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Mock portal plus a store writing to it
pub struct SkyDbEnvironment {
    pub portal: MockPortal,
    pub client: SkynetClient,
    pub keys: KeyPair,
    pub store: UserStore<SkyDbBackend>,
}

impl SkyDbEnvironment {
    pub async fn new() -> anyhow::Result<Self> {
        init_logger();
        let portal = skynet_mock::spawn_ephemeral().await?;
        let client = SkynetClient::new(&portal.url());
        let keys = KeyPair::from_seed(TEST_SEED);
        let store = UserStore::new(SkyDbBackend::new(
            client.clone(),
            keys.clone(),
            TEST_DATA_KEY,
        ));
        log::info!("📡 Mock portal at {}", portal.url());

        Ok(Self {
            portal,
            client,
            keys,
            store,
        })
    }
}

/// Provider answering from mutable, scripted state
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

struct FakeState {
    accounts: Vec<String>,
    chain_id: u64,
    request_accounts_error: Option<ProviderError>,
    calls: Vec<String>,
}

impl FakeProvider {
    pub fn new(accounts: &[&str], chain_id: u64) -> Self {
        Self {
            state: Mutex::new(FakeState {
                accounts: accounts.iter().map(|a| a.to_string()).collect(),
                chain_id,
                request_accounts_error: None,
                calls: Vec::new(),
            }),
        }
    }

    /// Fail `eth_requestAccounts` with this error
    pub fn rejecting(self, error: ProviderError) -> Self {
        self.state.lock().unwrap().request_accounts_error = Some(error);
        self
    }

    pub fn set_accounts(&self, accounts: &[&str]) {
        self.state.lock().unwrap().accounts = accounts.iter().map(|a| a.to_string()).collect();
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl EthereumProvider for FakeProvider {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method.to_string());
        match method {
            "eth_requestAccounts" => match &state.request_accounts_error {
                Some(error) => Err(error.clone()),
                None => Ok(json!(state.accounts)),
            },
            "eth_accounts" => Ok(json!(state.accounts)),
            "eth_chainId" => Ok(json!(format!("0x{:x}", state.chain_id))),
            other => Err(ProviderError::new(-32601, format!("method {} not found", other))),
        }
    }
}
