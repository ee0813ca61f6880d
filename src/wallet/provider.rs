//! Injected Ethereum providers
//!
//! A provider exposes the EIP-1193 `request(method, params)` surface. The
//! HTTP provider speaks JSON-RPC 2.0 to a wallet's local RPC bridge.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::config::WalletConfig;

/// EIP-1193 code for a request the user declined
pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;

/// Error returned by a provider request
#[derive(Error, Debug, Clone, PartialEq, Eq, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Transport-level failure, no RPC code
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_REQUEST_CODE
    }
}

#[async_trait]
pub trait EthereumProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// Provider reached over JSON-RPC 2.0 on HTTP
pub struct HttpProvider {
    url: String,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[async_trait]
impl EthereumProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        log::debug!("→ {} (id {})", method, id);

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(format!("invalid JSON-RPC response: {}", e)))?;

        match (rpc.result, rpc.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// The provider the environment injects, if any
pub fn detect_injected_provider(config: &WalletConfig) -> Option<Arc<dyn EthereumProvider>> {
    config
        .provider_url
        .as_ref()
        .map(|url| Arc::new(HttpProvider::new(url.clone())) as Arc<dyn EthereumProvider>)
}
