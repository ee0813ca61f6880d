//! Wallet connection state machine
//!
//! ```text
//!   Idle      --click-------------------> Connecting
//!   Connecting --activated--------------> Connected
//!   Connecting --failed-----------------> Errored
//!   Connected --click / disconnected----> Idle
//!   Connected --accounts emptied--------> Idle
//!   Connected --account/chain switch----> Connected
//!   Connected --unsupported chain-------> Errored
//!   Errored   --click-------------------> Connecting
//! ```
//!
//! `transition` is pure; events that make no sense in the current state
//! return `None` and leave the state alone.

use crate::error::ConnectorError;

use super::connector::{Activation, ProviderEvent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected {
        account: String,
        chain_id: u64,
    },
    Errored(ConnectorError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Click,
    Activated(Activation),
    ActivationFailed(ConnectorError),
    Provider(ProviderEvent),
}

impl ConnectionState {
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn account(&self) -> Option<&str> {
        match self {
            Self::Connected { account, .. } => Some(account),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ConnectorError> {
        match self {
            Self::Errored(e) => Some(e),
            _ => None,
        }
    }

    /// Next state for `event`, `None` if the event is ignored here
    ///
    /// `supported_chain_ids` decides whether a chain switch keeps the
    /// connection or errors it.
    pub fn transition(
        &self,
        event: &ConnectionEvent,
        supported_chain_ids: &[u64],
    ) -> Option<ConnectionState> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self, event) {
            (S::Idle | S::Errored(_), E::Click) => Some(S::Connecting),
            (S::Connected { .. }, E::Click) => Some(S::Idle),

            (S::Connecting, E::Activated(activation)) => Some(S::Connected {
                account: activation.account.clone(),
                chain_id: activation.chain_id,
            }),
            (S::Connecting, E::ActivationFailed(error)) => Some(S::Errored(error.clone())),

            (S::Connected { chain_id, .. }, E::Provider(ProviderEvent::AccountsChanged(accounts))) => {
                match accounts.first() {
                    Some(account) => Some(S::Connected {
                        account: account.clone(),
                        chain_id: *chain_id,
                    }),
                    None => Some(S::Idle),
                }
            }
            (S::Connected { account, .. }, E::Provider(ProviderEvent::ChainChanged(chain_id))) => {
                if supported_chain_ids.contains(chain_id) {
                    Some(S::Connected {
                        account: account.clone(),
                        chain_id: *chain_id,
                    })
                } else {
                    Some(S::Errored(ConnectorError::UnsupportedChainId {
                        chain_id: *chain_id,
                        supported: supported_chain_ids.to_vec(),
                    }))
                }
            }
            (S::Connected { .. }, E::Provider(ProviderEvent::Disconnected)) => Some(S::Idle),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORTED: &[u64] = &[1, 3, 137, 80001];

    fn connected(account: &str, chain_id: u64) -> ConnectionState {
        ConnectionState::Connected {
            account: account.to_string(),
            chain_id,
        }
    }

    #[test]
    fn test_click_transitions() {
        let click = ConnectionEvent::Click;
        assert_eq!(
            ConnectionState::Idle.transition(&click, SUPPORTED),
            Some(ConnectionState::Connecting)
        );
        assert_eq!(
            ConnectionState::Errored(ConnectorError::UserRejectedRequest)
                .transition(&click, SUPPORTED),
            Some(ConnectionState::Connecting)
        );
        assert_eq!(
            connected("0xA", 1).transition(&click, SUPPORTED),
            Some(ConnectionState::Idle)
        );
        assert_eq!(ConnectionState::Connecting.transition(&click, SUPPORTED), None);
    }

    #[test]
    fn test_activation_outcomes() {
        let activated = ConnectionEvent::Activated(Activation {
            account: "0xA".to_string(),
            chain_id: 137,
        });
        assert_eq!(
            ConnectionState::Connecting.transition(&activated, SUPPORTED),
            Some(connected("0xA", 137))
        );
        assert_eq!(ConnectionState::Idle.transition(&activated, SUPPORTED), None);

        let failed = ConnectionEvent::ActivationFailed(ConnectorError::NoEthereumProvider);
        assert_eq!(
            ConnectionState::Connecting.transition(&failed, SUPPORTED),
            Some(ConnectionState::Errored(ConnectorError::NoEthereumProvider))
        );
    }

    #[test]
    fn test_provider_events_while_connected() {
        let state = connected("0xA", 1);

        let switched =
            ConnectionEvent::Provider(ProviderEvent::AccountsChanged(vec!["0xB".into()]));
        assert_eq!(state.transition(&switched, SUPPORTED), Some(connected("0xB", 1)));

        let emptied = ConnectionEvent::Provider(ProviderEvent::AccountsChanged(vec![]));
        assert_eq!(state.transition(&emptied, SUPPORTED), Some(ConnectionState::Idle));

        let gone = ConnectionEvent::Provider(ProviderEvent::Disconnected);
        assert_eq!(state.transition(&gone, SUPPORTED), Some(ConnectionState::Idle));

        let matic = ConnectionEvent::Provider(ProviderEvent::ChainChanged(137));
        assert_eq!(state.transition(&matic, SUPPORTED), Some(connected("0xA", 137)));

        let unsupported = ConnectionEvent::Provider(ProviderEvent::ChainChanged(56));
        let next = state.transition(&unsupported, SUPPORTED).unwrap();
        assert!(next.error().is_some_and(ConnectorError::is_unsupported_chain));
    }

    #[test]
    fn test_provider_events_ignored_when_not_connected() {
        let event = ConnectionEvent::Provider(ProviderEvent::ChainChanged(56));
        assert_eq!(ConnectionState::Idle.transition(&event, SUPPORTED), None);
        assert_eq!(ConnectionState::Connecting.transition(&event, SUPPORTED), None);
    }
}
