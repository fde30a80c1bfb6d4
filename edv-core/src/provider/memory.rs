//! In-memory storage provider
//!
//! Non-persistent provider intended for tests and single-node deployments
//! that can afford to lose state on restart. Stores live in a DashMap so
//! concurrent requests touch different stores without contention; each
//! store serializes its own mutations behind an RwLock, which also makes
//! the reference-ID uniqueness check atomic.
//!
//! This provider does not support querying and reports the stable
//! querying-not-supported error, which the REST surface maps to 400.

use crate::models::{DataVaultConfiguration, EncryptedDocument, Query};
use crate::provider::{EdvProvider, EdvStore, StorageError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory implementation of `EdvProvider`.
#[derive(Default)]
pub struct MemEdvProvider {
    stores: DashMap<String, MemEdvStore>,
}

impl MemEdvProvider {
    pub fn new() -> Self {
        Self {
            stores: DashMap::new(),
        }
    }
}

impl EdvProvider for MemEdvProvider {
    fn create_store(&self, name: &str) -> Result<(), StorageError> {
        match self.stores.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateStore),
            Entry::Vacant(entry) => {
                entry.insert(MemEdvStore::new());
                Ok(())
            }
        }
    }

    fn open_store(&self, name: &str) -> Result<Box<dyn EdvStore>, StorageError> {
        self.stores
            .get(name)
            .map(|store| Box::new(store.value().clone()) as Box<dyn EdvStore>)
            .ok_or(StorageError::StoreNotFound)
    }
}

/// One named store. Cloning yields a handle onto the same entries.
#[derive(Clone)]
struct MemEdvStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemEdvStore {
    fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl EdvStore for MemEdvStore {
    fn put(&self, document: &EncryptedDocument) -> Result<(), StorageError> {
        let bytes =
            serde_json::to_vec(document).map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut entries = self.entries.write();
        if entries.contains_key(&document.id) {
            return Err(StorageError::DuplicateDocument);
        }
        entries.insert(document.id.clone(), bytes);

        Ok(())
    }

    fn upsert_bulk(&self, documents: &[EncryptedDocument]) -> Result<(), StorageError> {
        let mut serialized = Vec::with_capacity(documents.len());
        for document in documents {
            let bytes =
                serde_json::to_vec(document).map_err(|e| StorageError::Backend(e.to_string()))?;
            serialized.push((document.id.clone(), bytes));
        }

        let mut entries = self.entries.write();
        for (id, bytes) in serialized {
            entries.insert(id, bytes);
        }

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or(StorageError::ValueNotFound)
    }

    fn get_all(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn update(&self, document: &EncryptedDocument) -> Result<(), StorageError> {
        let bytes =
            serde_json::to_vec(document).map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut entries = self.entries.write();
        match entries.get_mut(&document.id) {
            Some(entry) => {
                *entry = bytes;
                Ok(())
            }
            None => Err(StorageError::ValueNotFound),
        }
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        match self.entries.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(StorageError::ValueNotFound),
        }
    }

    fn query(&self, _query: &Query) -> Result<Vec<EncryptedDocument>, StorageError> {
        Err(StorageError::QueryingNotSupported)
    }

    fn create_edv_index(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn create_encrypted_doc_id_index(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn create_reference_id_index(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn store_data_vault_configuration(
        &self,
        config: &DataVaultConfiguration,
        vault_id: &str,
    ) -> Result<(), StorageError> {
        let bytes =
            serde_json::to_vec(config).map_err(|e| StorageError::Backend(e.to_string()))?;

        // Holding the write lock across the scan keeps the uniqueness
        // check atomic against concurrent vault creations.
        let mut entries = self.entries.write();

        for stored in entries.values() {
            let existing: DataVaultConfiguration = serde_json::from_slice(stored).map_err(|e| {
                StorageError::ReferenceIdQuery(Box::new(StorageError::Backend(e.to_string())))
            })?;

            if existing.reference_id == config.reference_id {
                return Err(StorageError::ReferenceIdQuery(Box::new(
                    StorageError::DuplicateVault,
                )));
            }
        }

        entries.insert(vault_id.to_owned(), bytes);

        Ok(())
    }
}
