//! Injected-provider connector
//!
//! Turns a provider's raw RPC answers into an activation (account + chain) or
//! one of the `ConnectorError` categories.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::WalletConfig;
use crate::error::ConnectorError;

use super::provider::{detect_injected_provider, EthereumProvider, ProviderError};

/// Shortest interval the polling bridge runs at
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of a successful activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub account: String,
    pub chain_id: u64,
}

/// Events a provider pushes after activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(u64),
    Disconnected,
}

pub struct InjectedConnector {
    provider: Option<Arc<dyn EthereumProvider>>,
    supported_chain_ids: Vec<u64>,
}

impl InjectedConnector {
    pub fn new(provider: Option<Arc<dyn EthereumProvider>>, supported_chain_ids: Vec<u64>) -> Self {
        Self {
            provider,
            supported_chain_ids,
        }
    }

    /// Connector over whatever provider the environment injects
    pub fn from_config(config: &WalletConfig) -> Self {
        Self::new(
            detect_injected_provider(config),
            config.supported_chain_ids.clone(),
        )
    }

    pub fn supported_chain_ids(&self) -> &[u64] {
        &self.supported_chain_ids
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.supported_chain_ids.contains(&chain_id)
    }

    /// Ask the provider for an account, then check the chain it is on
    pub async fn activate(&self) -> Result<Activation, ConnectorError> {
        let provider = self.provider()?;

        let accounts = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(classify_provider_error)?;
        let account = parse_accounts(&accounts)?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::unknown("provider returned no accounts"))?;

        let chain_id = self.current_chain_id(provider.as_ref()).await?;
        self.check_chain(chain_id)?;

        log::info!("Activated {} on chain {}", account, chain_id);
        Ok(Activation { account, chain_id })
    }

    /// Injected providers have no disconnect call; forgetting the session is enough
    pub fn deactivate(&self) {
        log::debug!("Injected connector deactivated");
    }

    /// `UnsupportedChainId` unless `chain_id` is in the supported set
    pub fn check_chain(&self, chain_id: u64) -> Result<(), ConnectorError> {
        if self.is_supported(chain_id) {
            Ok(())
        } else {
            Err(ConnectorError::UnsupportedChainId {
                chain_id,
                supported: self.supported_chain_ids.clone(),
            })
        }
    }

    /// Current accounts and chain, without prompting the user
    pub async fn poll(&self) -> Result<(Vec<String>, u64), ConnectorError> {
        let provider = self.provider()?;
        let accounts = provider
            .request("eth_accounts", json!([]))
            .await
            .map_err(classify_provider_error)?;
        let accounts = parse_accounts(&accounts)?;
        let chain_id = self.current_chain_id(provider.as_ref()).await?;
        Ok((accounts, chain_id))
    }

    /// Poll the provider and emit events whenever accounts or chain change
    ///
    /// For providers that cannot push events themselves. Stops when the
    /// receiver is dropped; a failed poll is reported as `Disconnected` once.
    /// Intervals below `MIN_POLL_INTERVAL` are raised to it.
    pub fn spawn_event_bridge(
        self: &Arc<Self>,
        interval: Duration,
    ) -> mpsc::Receiver<ProviderEvent> {
        let (tx, rx) = mpsc::channel(16);
        let connector = Arc::clone(self);
        if interval < MIN_POLL_INTERVAL {
            log::warn!(
                "Poll interval {:?} is too short, using {:?}",
                interval,
                MIN_POLL_INTERVAL
            );
        }
        let interval = interval.max(MIN_POLL_INTERVAL);

        tokio::spawn(async move {
            let mut last: Option<(Vec<String>, u64)> = None;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let events = match connector.poll().await {
                    Ok(current) => {
                        let events = diff_poll(last.as_ref(), &current);
                        last = Some(current);
                        events
                    }
                    Err(e) => {
                        log::debug!("Provider poll failed: {}", e);
                        if last.take().is_some() {
                            vec![ProviderEvent::Disconnected]
                        } else {
                            Vec::new()
                        }
                    }
                };
                for event in events {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                if tx.is_closed() {
                    return;
                }
            }
        });

        rx
    }

    fn provider(&self) -> Result<&Arc<dyn EthereumProvider>, ConnectorError> {
        self.provider
            .as_ref()
            .ok_or(ConnectorError::NoEthereumProvider)
    }

    async fn current_chain_id(
        &self,
        provider: &dyn EthereumProvider,
    ) -> Result<u64, ConnectorError> {
        let value = provider
            .request("eth_chainId", json!([]))
            .await
            .map_err(classify_provider_error)?;
        parse_chain_id(&value)
    }
}

fn classify_provider_error(error: ProviderError) -> ConnectorError {
    if error.is_user_rejection() {
        ConnectorError::UserRejectedRequest
    } else {
        ConnectorError::Unknown(error.to_string())
    }
}

fn parse_accounts(value: &Value) -> Result<Vec<String>, ConnectorError> {
    let list = value.as_array().ok_or_else(|| {
        ConnectorError::unknown(format!("unexpected accounts response: {}", value))
    })?;
    list.iter()
        .map(|account| {
            account
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ConnectorError::unknown(format!("unexpected account: {}", account)))
        })
        .collect()
}

/// Chain id as `0x`-prefixed hex string (or a bare number from lenient providers)
pub fn parse_chain_id(value: &Value) -> Result<u64, ConnectorError> {
    match value {
        Value::String(s) => {
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse(),
            };
            parsed.map_err(|_| ConnectorError::unknown(format!("invalid chain id '{}'", s)))
        }
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ConnectorError::unknown(format!("invalid chain id {}", n))),
        other => Err(ConnectorError::unknown(format!("invalid chain id {}", other))),
    }
}

fn diff_poll(
    previous: Option<&(Vec<String>, u64)>,
    current: &(Vec<String>, u64),
) -> Vec<ProviderEvent> {
    let Some((prev_accounts, prev_chain)) = previous else {
        return Vec::new();
    };
    let (accounts, chain_id) = current;
    let mut events = Vec::new();
    if prev_chain != chain_id {
        events.push(ProviderEvent::ChainChanged(*chain_id));
    }
    if prev_accounts != accounts {
        events.push(ProviderEvent::AccountsChanged(accounts.clone()));
    }
    events
}
