/// Skynet Mock Portal Library
///
/// In-memory stand-in for the parts of a Skynet portal the SkyDB client uses:
/// the registry and skyfile upload/download. Usable as a standalone binary
/// or spawned in-process by tests.

pub mod handlers;
pub mod server;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use server::{create_router, run_server, spawn_ephemeral, MockPortal};
pub use state::{PortalState, RegistryError, StoredEntry};
pub use types::*;
