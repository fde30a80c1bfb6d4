//! EDV Core - Encrypted Data Vault server building blocks
//!
//! This crate provides the foundational components for the EDV server:
//! - Wire data model for the EDV REST protocol
//! - Identifier and payload validation
//! - Storage provider abstraction (in-memory and document-store back-ends)
//! - The REST operation engine (vault registry, documents, query, batch)

pub mod messages;
pub mod models;
pub mod operation;
pub mod provider;
pub mod validation;

pub use operation::{
    AuthService, Config, EdvResponse, EnabledExtensions, Operation,
    DATA_VAULT_CONFIGURATION_STORE_NAME, EDV_RESOURCE_PATH,
};
pub use provider::{memory::MemEdvProvider, persistent::PersistentEdvProvider};
pub use provider::{EdvProvider, EdvStore, StorageError};
