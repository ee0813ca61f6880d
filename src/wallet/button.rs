//! Connect/disconnect toggle
//!
//! Drives `ConnectionState` from clicks and provider events, publishes every
//! change on a watch channel and turns connector errors into notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use crate::error::ConnectorError;

use super::connection::{ConnectionEvent, ConnectionState};
use super::connector::{InjectedConnector, ProviderEvent};
use super::notify::Notifier;

pub const CONNECT_LABEL: &str = "Connect to Metamask";
pub const DISCONNECT_LABEL: &str = "Disconnect";

pub const NO_PROVIDER_MESSAGE: &str =
    "No Ethereum browser extension detected, install MetaMask on desktop or visit from a dApp browser on mobile.";
pub const UNSUPPORTED_CHAIN_MESSAGE: &str =
    "You're connected to an unsupported network. Networks supported: Mainnet, Matic, Ropsten, Mumbai.";
pub const USER_REJECTED_MESSAGE: &str =
    "Please authorize this website to access your Ethereum account.";
pub const UNKNOWN_ERROR_MESSAGE: &str =
    "An unknown error occurred. Check the console for more details.";

/// What the button shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonView {
    pub label: &'static str,
    pub is_loading: bool,
}

impl ButtonView {
    pub fn of(state: &ConnectionState) -> Self {
        Self {
            label: if state.is_connected() {
                DISCONNECT_LABEL
            } else {
                CONNECT_LABEL
            },
            is_loading: state.is_connecting(),
        }
    }
}

/// User-facing text for a connector error
pub fn error_message(error: &ConnectorError) -> &'static str {
    match error {
        ConnectorError::NoEthereumProvider => NO_PROVIDER_MESSAGE,
        ConnectorError::UnsupportedChainId { .. } => UNSUPPORTED_CHAIN_MESSAGE,
        ConnectorError::UserRejectedRequest => USER_REJECTED_MESSAGE,
        ConnectorError::Unknown(_) => UNKNOWN_ERROR_MESSAGE,
    }
}

pub struct ConnectButton {
    connector: Arc<InjectedConnector>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<ConnectionState>,
    /// Set once the unsupported-network notice was shown, cleared by an account
    unsupported_notice_shown: AtomicBool,
    /// Serializes clicks and provider events
    events: Mutex<()>,
}

impl ConnectButton {
    pub fn new(connector: Arc<InjectedConnector>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            connector,
            notifier,
            state,
            unsupported_notice_shown: AtomicBool::new(false),
            events: Mutex::new(()),
        }
    }

    pub fn connector(&self) -> &Arc<InjectedConnector> {
        &self.connector
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn view(&self) -> ButtonView {
        ButtonView::of(&self.state.borrow())
    }

    /// Connect when idle or errored, disconnect when connected
    pub async fn click(&self) -> ConnectionState {
        let _guard = self.events.lock().await;

        match self.apply(ConnectionEvent::Click) {
            Some(ConnectionState::Connecting) => {
                log::info!("Connecting");
                let outcome = match self.connector.activate().await {
                    Ok(activation) => ConnectionEvent::Activated(activation),
                    Err(e) => ConnectionEvent::ActivationFailed(e),
                };
                self.apply(outcome);
            }
            Some(ConnectionState::Idle) => {
                log::info!("Disconnecting");
                self.connector.deactivate();
            }
            _ => {}
        }

        self.state()
    }

    pub async fn handle_provider_event(&self, event: ProviderEvent) -> ConnectionState {
        let _guard = self.events.lock().await;
        self.apply(ConnectionEvent::Provider(event));
        self.state()
    }

    /// Feed provider events until the sender side closes
    pub async fn listen(&self, mut events: mpsc::Receiver<ProviderEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_provider_event(event).await;
        }
        log::debug!("Provider event stream closed");
    }

    fn apply(&self, event: ConnectionEvent) -> Option<ConnectionState> {
        let current = self.state();
        let Some(next) = current.transition(&event, self.connector.supported_chain_ids()) else {
            log::debug!("Ignoring {:?} while {:?}", event, current);
            return None;
        };

        self.state.send_replace(next.clone());

        if next.account().is_some() {
            self.unsupported_notice_shown.store(false, Ordering::SeqCst);
        }
        if let ConnectionState::Errored(error) = &next {
            self.report(error);
        }
        Some(next)
    }

    fn report(&self, error: &ConnectorError) {
        if let ConnectorError::Unknown(_) = error {
            log::error!("{}", error);
        }

        if error.is_unsupported_chain() {
            // Only the first unsupported-network notice per account is shown
            if self.unsupported_notice_shown.swap(true, Ordering::SeqCst) {
                log::debug!("Unsupported network notice already shown");
                return;
            }
        }
        self.notifier.notify(error_message(error));
    }
}
