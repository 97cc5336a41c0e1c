/*!
 * Podstore - sharded calendar store pod
 *
 * A pod owns some calendar homes and reaches the rest through proxies:
 * - Local in-memory engine for the homes this pod owns
 * - Foreign-owned homes loaded as capability-gated proxies
 * - Pod directory mapping owners to pods
 * - In-process loopback conduit between pods
 * - Attachment migration from a foreign home into a local one
 * - TOML configuration and structured logging
 */

pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod loopback;
pub mod migration;
pub mod store;
pub mod system;

// Re-export commonly used types
pub use config::{LogLevel, PodConfig};
pub use directory::{HomeLocation, PodDirectory};
pub use error::{PodstoreError, Result};
pub use loopback::LoopbackConduit;
pub use migration::{migrate_attachments, MigrationReport};
pub use store::{Store, Transaction};
pub use system::{LocalCalendarHome, LocalStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
