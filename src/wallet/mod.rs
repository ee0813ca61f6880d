//! Wallet connection
//!
//! An injected Ethereum provider, the connector that activates it, the
//! connection state machine and the connect button that ties them to user
//! notifications.

pub mod button;
pub mod connection;
pub mod connector;
pub mod notify;
pub mod provider;

pub use button::{error_message, ButtonView, ConnectButton};
pub use connection::{ConnectionEvent, ConnectionState};
pub use connector::{Activation, InjectedConnector, ProviderEvent};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use provider::{EthereumProvider, HttpProvider, ProviderError};
