//! Document-store storage provider backed by RocksDB
//!
//! Note: RocksDB requires LLVM/Clang to be installed on Windows.
//! Enable with the "rocksdb-storage" feature flag; without it the provider
//! keeps the same semantics on in-memory maps, which is what the test
//! suite exercises.
//!
//! Unlike the in-memory provider, this back-end supports attribute
//! queries and enforces the unique-attribute invariant on writes.

use crate::models::{DataVaultConfiguration, EncryptedDocument, Query};
use crate::provider::{EdvProvider, EdvStore, StorageError};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "rocksdb-storage")]
use rocksdb::{ColumnFamilyDescriptor, Options, DB};

#[cfg(not(feature = "rocksdb-storage"))]
use parking_lot::RwLock;
#[cfg(not(feature = "rocksdb-storage"))]
use std::collections::HashMap;

/// Document-store implementation of `EdvProvider`.
pub struct PersistentEdvProvider {
    inner: Arc<Inner>,
}

struct Inner {
    #[cfg(feature = "rocksdb-storage")]
    /// RocksDB database instance
    db: DB,

    #[cfg(not(feature = "rocksdb-storage"))]
    /// In-memory document storage (fallback when RocksDB is not available)
    documents: RwLock<HashMap<Vec<u8>, Vec<u8>>>,

    #[cfg(not(feature = "rocksdb-storage"))]
    /// In-memory metadata storage
    metadata: RwLock<HashMap<String, Vec<u8>>>,

    /// Serializes read-modify-write sequences: duplicate-ID checks,
    /// unique-attribute checks and reference-ID uniqueness scans.
    write_lock: Mutex<()>,

    /// Data directory path
    data_dir: PathBuf,
}

impl PersistentEdvProvider {
    /// Opens (or creates) the provider rooted at `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        #[cfg(feature = "rocksdb-storage")]
        {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            opts.create_missing_column_families(true);
            opts.set_max_open_files(1000);
            opts.set_keep_log_file_num(10);

            let cf_descriptors = vec![
                ColumnFamilyDescriptor::new("default", Options::default()),
                ColumnFamilyDescriptor::new("documents", Options::default()),
                ColumnFamilyDescriptor::new("metadata", Options::default()),
            ];

            let db = DB::open_cf_descriptors(&opts, &data_dir, cf_descriptors)
                .context("Failed to open RocksDB")?;

            Ok(Self {
                inner: Arc::new(Inner {
                    db,
                    write_lock: Mutex::new(()),
                    data_dir,
                }),
            })
        }

        #[cfg(not(feature = "rocksdb-storage"))]
        {
            Ok(Self {
                inner: Arc::new(Inner {
                    documents: RwLock::new(HashMap::new()),
                    metadata: RwLock::new(HashMap::new()),
                    write_lock: Mutex::new(()),
                    data_dir,
                }),
            })
        }
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }
}

impl EdvProvider for PersistentEdvProvider {
    fn create_store(&self, name: &str) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock();

        let marker_key = store_marker_key(name);
        if self.inner.meta_get(&marker_key)?.is_some() {
            return Err(StorageError::DuplicateStore);
        }

        self.inner.meta_put(&marker_key, &[])
    }

    fn open_store(&self, name: &str) -> Result<Box<dyn EdvStore>, StorageError> {
        if self.inner.meta_get(&store_marker_key(name))?.is_none() {
            return Err(StorageError::StoreNotFound);
        }

        Ok(Box::new(PersistentEdvStore {
            inner: self.inner.clone(),
            name: name.to_owned(),
        }))
    }
}

struct PersistentEdvStore {
    inner: Arc<Inner>,
    name: String,
}

impl PersistentEdvStore {
    fn document_key(&self, id: &str) -> Vec<u8> {
        format!("{}:{}", self.name, id).into_bytes()
    }

    fn prefix(&self) -> Vec<u8> {
        format!("{}:", self.name).into_bytes()
    }

    /// Rejects a write that would give two distinct documents the same
    /// `(name, value)` pair for an attribute flagged unique.
    ///
    /// Caller must hold the write lock.
    fn check_unique_attributes(&self, document: &EncryptedDocument) -> Result<(), StorageError> {
        let Some(collections) = &document.indexed else {
            return Ok(());
        };

        let unique_attributes: Vec<_> = collections
            .iter()
            .flat_map(|collection| collection.attributes.iter())
            .filter(|attribute| attribute.unique)
            .collect();
        if unique_attributes.is_empty() {
            return Ok(());
        }

        for stored in self.inner.doc_scan_prefix(&self.prefix())? {
            let existing: EncryptedDocument = serde_json::from_slice(&stored)
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            if existing.id == document.id {
                continue;
            }

            let existing_attributes: Vec<_> = existing
                .indexed
                .iter()
                .flatten()
                .flat_map(|collection| collection.attributes.iter())
                .collect();

            for attribute in &unique_attributes {
                let in_use = existing_attributes.iter().any(|existing_attribute| {
                    existing_attribute.name == attribute.name
                        && existing_attribute.value == attribute.value
                });

                if in_use {
                    return Err(StorageError::UniqueAttributeInUse {
                        name: attribute.name.clone(),
                        value: attribute.value.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Caller must hold the write lock.
    fn write_document(&self, document: &EncryptedDocument) -> Result<(), StorageError> {
        let bytes =
            serde_json::to_vec(document).map_err(|e| StorageError::Backend(e.to_string()))?;
        self.inner.doc_put(&self.document_key(&document.id), &bytes)
    }

    fn record_index(&self, index_name: &str) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock();

        let key = format!("indexes:{}", self.name);
        let mut indexes: Vec<String> = match self.inner.meta_get(&key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Backend(e.to_string()))?,
            None => Vec::new(),
        };

        if !indexes.iter().any(|existing| existing == index_name) {
            indexes.push(index_name.to_owned());
            let bytes =
                serde_json::to_vec(&indexes).map_err(|e| StorageError::Backend(e.to_string()))?;
            self.inner.meta_put(&key, &bytes)?;
        }

        Ok(())
    }
}

impl EdvStore for PersistentEdvStore {
    fn put(&self, document: &EncryptedDocument) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock();

        if self
            .inner
            .doc_get(&self.document_key(&document.id))?
            .is_some()
        {
            return Err(StorageError::DuplicateDocument);
        }

        self.check_unique_attributes(document)?;
        self.write_document(document)
    }

    fn upsert_bulk(&self, documents: &[EncryptedDocument]) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock();

        for document in documents {
            self.check_unique_attributes(document)?;
        }
        for document in documents {
            self.write_document(document)?;
        }

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        self.inner
            .doc_get(&self.document_key(id))?
            .ok_or(StorageError::ValueNotFound)
    }

    fn get_all(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        self.inner.doc_scan_prefix(&self.prefix())
    }

    fn update(&self, document: &EncryptedDocument) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock();

        if self
            .inner
            .doc_get(&self.document_key(&document.id))?
            .is_none()
        {
            return Err(StorageError::ValueNotFound);
        }

        self.check_unique_attributes(document)?;
        self.write_document(document)
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock();

        let key = self.document_key(id);
        if self.inner.doc_get(&key)?.is_none() {
            return Err(StorageError::ValueNotFound);
        }

        self.inner.doc_delete(&key)
    }

    fn query(&self, query: &Query) -> Result<Vec<EncryptedDocument>, StorageError> {
        let mut matches = Vec::new();

        for stored in self.inner.doc_scan_prefix(&self.prefix())? {
            let document: EncryptedDocument = serde_json::from_slice(&stored)
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            let is_match = document
                .indexed
                .iter()
                .flatten()
                .flat_map(|collection| collection.attributes.iter())
                .any(|attribute| attribute.name == query.index && attribute.value == query.equals);

            if is_match {
                matches.push(document);
            }
        }

        Ok(matches)
    }

    fn create_edv_index(&self) -> Result<(), StorageError> {
        self.record_index("attributes")
    }

    fn create_encrypted_doc_id_index(&self) -> Result<(), StorageError> {
        self.record_index("document_ids")
    }

    fn create_reference_id_index(&self) -> Result<(), StorageError> {
        self.record_index("reference_ids")
    }

    fn store_data_vault_configuration(
        &self,
        config: &DataVaultConfiguration,
        vault_id: &str,
    ) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock();

        for stored in self.inner.doc_scan_prefix(&self.prefix())? {
            let existing: DataVaultConfiguration = serde_json::from_slice(&stored).map_err(|e| {
                StorageError::ReferenceIdQuery(Box::new(StorageError::Backend(e.to_string())))
            })?;

            if existing.reference_id == config.reference_id {
                return Err(StorageError::ReferenceIdQuery(Box::new(
                    StorageError::DuplicateVault,
                )));
            }
        }

        let bytes =
            serde_json::to_vec(config).map_err(|e| StorageError::Backend(e.to_string()))?;
        self.inner.doc_put(&self.document_key(vault_id), &bytes)
    }
}

fn store_marker_key(name: &str) -> String {
    format!("store:{name}")
}

impl Inner {
    #[cfg(feature = "rocksdb-storage")]
    fn documents_cf(&self) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle("documents")
            .ok_or_else(|| StorageError::Backend("documents column family not found".to_owned()))
    }

    #[cfg(feature = "rocksdb-storage")]
    fn metadata_cf(&self) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle("metadata")
            .ok_or_else(|| StorageError::Backend("metadata column family not found".to_owned()))
    }

    fn doc_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        #[cfg(feature = "rocksdb-storage")]
        {
            self.db
                .get_cf(self.documents_cf()?, key)
                .map_err(|e| StorageError::Backend(e.to_string()))
        }

        #[cfg(not(feature = "rocksdb-storage"))]
        {
            Ok(self.documents.read().get(key).cloned())
        }
    }

    fn doc_put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        #[cfg(feature = "rocksdb-storage")]
        {
            self.db
                .put_cf(self.documents_cf()?, key, value)
                .map_err(|e| StorageError::Backend(e.to_string()))
        }

        #[cfg(not(feature = "rocksdb-storage"))]
        {
            self.documents.write().insert(key.to_vec(), value.to_vec());
            Ok(())
        }
    }

    fn doc_delete(&self, key: &[u8]) -> Result<(), StorageError> {
        #[cfg(feature = "rocksdb-storage")]
        {
            self.db
                .delete_cf(self.documents_cf()?, key)
                .map_err(|e| StorageError::Backend(e.to_string()))
        }

        #[cfg(not(feature = "rocksdb-storage"))]
        {
            self.documents.write().remove(key);
            Ok(())
        }
    }

    fn doc_scan_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        #[cfg(feature = "rocksdb-storage")]
        {
            let mut values = Vec::new();

            let iter = self.db.prefix_iterator_cf(self.documents_cf()?, prefix);
            for item in iter {
                let (key, value) = item.map_err(|e| StorageError::Backend(e.to_string()))?;

                // The iterator can run past the prefix range.
                if !key.starts_with(prefix) {
                    break;
                }

                values.push(value.to_vec());
            }

            Ok(values)
        }

        #[cfg(not(feature = "rocksdb-storage"))]
        {
            let documents = self.documents.read();
            Ok(documents
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(_, value)| value.clone())
                .collect())
        }
    }

    fn meta_get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        #[cfg(feature = "rocksdb-storage")]
        {
            self.db
                .get_cf(self.metadata_cf()?, key.as_bytes())
                .map_err(|e| StorageError::Backend(e.to_string()))
        }

        #[cfg(not(feature = "rocksdb-storage"))]
        {
            Ok(self.metadata.read().get(key).cloned())
        }
    }

    fn meta_put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        #[cfg(feature = "rocksdb-storage")]
        {
            self.db
                .put_cf(self.metadata_cf()?, key.as_bytes(), value)
                .map_err(|e| StorageError::Backend(e.to_string()))
        }

        #[cfg(not(feature = "rocksdb-storage"))]
        {
            self.metadata.write().insert(key.to_owned(), value.to_vec());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_provider() -> (PersistentEdvProvider, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let provider = PersistentEdvProvider::new(temp_dir.path()).unwrap();
        (provider, temp_dir)
    }

    fn document_with_attributes(id: &str, attributes_json: &str) -> EncryptedDocument {
        serde_json::from_str(&format!(
            r#"{{"id":"{id}","sequence":0,"indexed":[{{"sequence":0,"hmac":{{"id":"","type":""}},"attributes":{attributes_json}}}],"jwe":{{"protected":"eyJlbmMiOiJDMjBQIn0"}}}}"#
        ))
        .unwrap()
    }

    fn plain_document(id: &str) -> EncryptedDocument {
        serde_json::from_str(&format!(
            r#"{{"id":"{id}","sequence":0,"indexed":null,"jwe":{{"protected":"eyJlbmMiOiJDMjBQIn0"}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_provider_creation() {
        let (provider, _temp_dir) = create_test_provider();
        assert!(provider.data_dir().exists());
    }

    #[test]
    fn test_store_lifecycle() {
        let (provider, _temp_dir) = create_test_provider();

        assert!(matches!(
            provider.open_store("vault1"),
            Err(StorageError::StoreNotFound)
        ));

        provider.create_store("vault1").unwrap();
        assert!(matches!(
            provider.create_store("vault1"),
            Err(StorageError::DuplicateStore)
        ));

        provider.open_store("vault1").unwrap();
    }

    #[test]
    fn test_put_get_update_delete() {
        let (provider, _temp_dir) = create_test_provider();
        provider.create_store("vault1").unwrap();
        let store = provider.open_store("vault1").unwrap();

        let doc = plain_document("VJYHHJx4C8J9Fsgz7rZqSp");
        store.put(&doc).unwrap();
        assert!(matches!(
            store.put(&doc),
            Err(StorageError::DuplicateDocument)
        ));

        let stored = store.get("VJYHHJx4C8J9Fsgz7rZqSp").unwrap();
        assert_eq!(stored, serde_json::to_vec(&doc).unwrap());

        store.update(&doc).unwrap();
        store.delete("VJYHHJx4C8J9Fsgz7rZqSp").unwrap();

        assert!(matches!(
            store.get("VJYHHJx4C8J9Fsgz7rZqSp"),
            Err(StorageError::ValueNotFound)
        ));
        assert!(matches!(
            store.update(&doc),
            Err(StorageError::ValueNotFound)
        ));
        assert!(matches!(
            store.delete("VJYHHJx4C8J9Fsgz7rZqSp"),
            Err(StorageError::ValueNotFound)
        ));
    }

    #[test]
    fn test_stores_are_isolated() {
        let (provider, _temp_dir) = create_test_provider();
        provider.create_store("vault1").unwrap();
        provider.create_store("vault2").unwrap();

        let store1 = provider.open_store("vault1").unwrap();
        let store2 = provider.open_store("vault2").unwrap();

        store1.put(&plain_document("VJYHHJx4C8J9Fsgz7rZqSp")).unwrap();

        assert!(matches!(
            store2.get("VJYHHJx4C8J9Fsgz7rZqSp"),
            Err(StorageError::ValueNotFound)
        ));
        assert_eq!(store2.get_all().unwrap().len(), 0);
        assert_eq!(store1.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_query_matches_indexed_attributes() {
        let (provider, _temp_dir) = create_test_provider();
        provider.create_store("vault1").unwrap();
        let store = provider.open_store("vault1").unwrap();

        store
            .put(&document_with_attributes(
                "VJYHHJx4C8J9Fsgz7rZqSp",
                r#"[{"name":"indexName1","value":"testVal","unique":false}]"#,
            ))
            .unwrap();
        store
            .put(&document_with_attributes(
                "AJYHHJx4C8J9Fsgz7rZqSp",
                r#"[{"name":"indexName2","value":"otherVal","unique":false}]"#,
            ))
            .unwrap();

        let matches = store
            .query(&Query {
                return_full_documents: false,
                index: "indexName1".to_owned(),
                equals: "testVal".to_owned(),
            })
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "VJYHHJx4C8J9Fsgz7rZqSp");
    }

    #[test]
    fn test_unique_attribute_rejected_across_documents() {
        let (provider, _temp_dir) = create_test_provider();
        provider.create_store("vault1").unwrap();
        let store = provider.open_store("vault1").unwrap();

        store
            .put(&document_with_attributes(
                "VJYHHJx4C8J9Fsgz7rZqSp",
                r#"[{"name":"indexName1","value":"testVal","unique":true}]"#,
            ))
            .unwrap();

        let err = store
            .put(&document_with_attributes(
                "AJYHHJx4C8J9Fsgz7rZqSp",
                r#"[{"name":"indexName1","value":"testVal","unique":true}]"#,
            ))
            .unwrap_err();

        assert!(matches!(err, StorageError::UniqueAttributeInUse { .. }));

        // Re-upserting the same document is not a violation.
        store
            .upsert_bulk(&[document_with_attributes(
                "VJYHHJx4C8J9Fsgz7rZqSp",
                r#"[{"name":"indexName1","value":"testVal","unique":true}]"#,
            )])
            .unwrap();
    }

    #[test]
    fn test_store_config_reference_id_uniqueness() {
        let (provider, _temp_dir) = create_test_provider();
        provider.create_store("configs").unwrap();
        let store = provider.open_store("configs").unwrap();
        store.create_reference_id_index().unwrap();

        let config = DataVaultConfiguration {
            reference_id: "testReferenceID".to_owned(),
            ..Default::default()
        };

        store
            .store_data_vault_configuration(&config, "vaultID1")
            .unwrap();

        let err = store
            .store_data_vault_configuration(&config, "vaultID2")
            .unwrap_err();
        assert!(err.is_duplicate_vault());
    }
}
