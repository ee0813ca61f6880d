// Skynet integration module
// Provides an HTTP client for a Skynet portal: registry entries, skyfiles and
// the SkyDB JSON layer built on top of them

pub mod client;
pub mod skydb;
pub mod skylink;
pub mod types;

pub use client::SkynetClient;
pub use skydb::JsonData;
pub use skylink::Skylink;
pub use types::*;
