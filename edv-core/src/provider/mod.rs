//! Storage provider abstraction for the EDV server
//!
//! The server is polymorphic over a provider exposing named per-vault
//! stores plus one well-known configuration store. Two implementations are
//! provided:
//! - `memory`: a non-persistent provider that does not support querying
//! - `persistent`: a document-store provider with attribute querying

pub mod memory;
pub mod persistent;

use crate::models::{DataVaultConfiguration, EncryptedDocument, Query};
use thiserror::Error;

/// Errors reported by storage providers.
///
/// The REST layer maps these onto status codes; the display text of the
/// conflict and query variants is surfaced to clients verbatim.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The named store does not exist.
    #[error("store not found")]
    StoreNotFound,

    /// The store exists but holds no value under the given key.
    #[error("value not found")]
    ValueNotFound,

    /// A store with the given name already exists.
    #[error("store already exists")]
    DuplicateStore,

    /// A vault configuration with the same reference ID already exists.
    #[error("vault already exists")]
    DuplicateVault,

    /// A document with the same ID already exists in the store.
    #[error("a document with the given ID already exists")]
    DuplicateDocument,

    /// The provider cannot evaluate queries.
    #[error("querying is not supported by this provider")]
    QueryingNotSupported,

    /// Failure while checking reference-ID uniqueness during
    /// `store_data_vault_configuration`.
    #[error("an error occurred while querying reference IDs: {0}")]
    ReferenceIdQuery(#[source] Box<StorageError>),

    /// An indexed attribute flagged unique is already held by another
    /// document in the same vault.
    #[error("attribute {name} with value {value} is marked unique and is already in use")]
    UniqueAttributeInUse { name: String, value: String },

    /// Any other back-end failure, surfaced with the back-end's text.
    #[error("{0}")]
    Backend(String),
}

impl StorageError {
    /// True when the error chain denotes a duplicate vault reference ID.
    pub fn is_duplicate_vault(&self) -> bool {
        match self {
            StorageError::DuplicateVault => true,
            StorageError::ReferenceIdQuery(inner) => inner.is_duplicate_vault(),
            _ => false,
        }
    }
}

/// A storage provider that can create and open named stores.
///
/// `create_store` fails with `DuplicateStore` when the name is taken;
/// `open_store` fails with `StoreNotFound` for unknown names.
pub trait EdvProvider: Send + Sync {
    fn create_store(&self, name: &str) -> Result<(), StorageError>;

    fn open_store(&self, name: &str) -> Result<Box<dyn EdvStore>, StorageError>;
}

/// A single store holding encrypted documents, or (for the well-known
/// configuration store) data vault configurations.
pub trait EdvStore: Send + Sync {
    /// Stores a new document. Fails with `DuplicateDocument` if the ID is
    /// already present.
    fn put(&self, document: &EncryptedDocument) -> Result<(), StorageError>;

    /// Creates or replaces every given document in one call. This is the
    /// back-end's create-or-replace primitive, used by the batch engine.
    fn upsert_bulk(&self, documents: &[EncryptedDocument]) -> Result<(), StorageError>;

    /// Returns the exact bytes previously stored for `id`.
    fn get(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// Returns the stored bytes of every document in this store.
    fn get_all(&self) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Replaces an existing document. Fails with `ValueNotFound` if the
    /// document is missing.
    fn update(&self, document: &EncryptedDocument) -> Result<(), StorageError>;

    /// Removes a document. Fails with `ValueNotFound` if it is missing.
    fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Returns every document carrying an attribute matching the query.
    /// Providers without query support report `QueryingNotSupported`.
    fn query(&self, query: &Query) -> Result<Vec<EncryptedDocument>, StorageError>;

    /// Prepares the attribute index for a vault store.
    fn create_edv_index(&self) -> Result<(), StorageError>;

    /// Prepares the document-ID index for a vault store.
    fn create_encrypted_doc_id_index(&self) -> Result<(), StorageError>;

    /// Prepares the reference-ID index on the configuration store.
    fn create_reference_id_index(&self) -> Result<(), StorageError>;

    /// Atomically verifies reference-ID uniqueness and persists the
    /// configuration under `vault_id`. A conflicting reference ID fails
    /// with a `ReferenceIdQuery(DuplicateVault)` chain.
    fn store_data_vault_configuration(
        &self,
        config: &DataVaultConfiguration,
        vault_id: &str,
    ) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_vault_detection_through_chain() {
        let err = StorageError::ReferenceIdQuery(Box::new(StorageError::DuplicateVault));
        assert!(err.is_duplicate_vault());
        assert_eq!(
            err.to_string(),
            "an error occurred while querying reference IDs: vault already exists"
        );

        assert!(!StorageError::StoreNotFound.is_duplicate_vault());
    }
}
