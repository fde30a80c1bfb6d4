//! REST operations for the EDV server
//!
//! This module is the control plane: it maps decoded requests onto the
//! storage provider while enforcing the EDV identity, uniqueness and
//! ordering rules. Every handler takes raw (still percent-encoded) path
//! variables plus body bytes and returns a transport-free `EdvResponse`,
//! so the HTTP layer stays a thin router.

use crate::messages;
use crate::models::{
    Batch, DataVaultConfiguration, EncryptedDocument, Query, VaultOperation,
    DELETE_VAULT_OPERATION, UPSERT_VAULT_OPERATION,
};
use crate::provider::{EdvProvider, EdvStore, StorageError};
use crate::validation::{
    generate_edv_compatible_id, unescape_path_var, validate_data_vault_configuration,
    validate_encrypted_document,
};
use http::StatusCode;
use serde_json::value::RawValue;
use std::sync::Arc;
use tracing::{debug, error};

/// Path under which all vault resources live.
pub const EDV_RESOURCE_PATH: &str = "/encrypted-data-vaults";

/// Name of the well-known store holding data vault configurations.
pub const DATA_VAULT_CONFIGURATION_STORE_NAME: &str = "data_vault_configurations";

/// Path variable names, used in unescape error messages.
pub const VAULT_ID_PATH_VARIABLE: &str = "vaultID";
pub const DOC_ID_PATH_VARIABLE: &str = "docID";

/// External collaborator minting resource tokens during vault creation.
///
/// The returned bytes are forwarded verbatim as the create-vault response
/// body and are opaque to this server.
pub trait AuthService: Send + Sync {
    fn create(&self, resource_id: &str, verification_method: &str) -> anyhow::Result<Vec<u8>>;
}

/// Optional endpoints. Routes for disabled extensions are not registered,
/// so requests to them answer 404.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnabledExtensions {
    pub return_full_documents_on_query: bool,
    pub read_all_documents_endpoint: bool,
    pub batch: bool,
}

/// Server configuration.
pub struct Config {
    pub provider: Arc<dyn EdvProvider>,
    pub auth_enable: bool,
    pub auth_service: Option<Arc<dyn AuthService>>,
    pub enabled_extensions: EnabledExtensions,
    /// Host prefix prepended to Location headers and query result URLs.
    pub base_url: String,
}

/// Outcome of one REST operation, ready for the transport to write out.
#[derive(Debug)]
pub struct EdvResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl EdvResponse {
    fn text(status: StatusCode, message: String) -> Self {
        Self {
            status,
            location: None,
            body: message.into_bytes(),
        }
    }

    fn ok(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            location: None,
            body,
        }
    }

    fn created(location: String, body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::CREATED,
            location: Some(location),
            body,
        }
    }
}

/// The EDV operation engine. One instance serves every request; all
/// mutable state lives in the storage provider.
pub struct Operation {
    provider: Arc<dyn EdvProvider>,
    auth_enable: bool,
    auth_service: Option<Arc<dyn AuthService>>,
    enabled_extensions: EnabledExtensions,
    base_url: String,
}

impl Operation {
    pub fn new(config: Config) -> Self {
        Self {
            provider: config.provider,
            auth_enable: config.auth_enable,
            auth_service: config.auth_service,
            enabled_extensions: config.enabled_extensions,
            base_url: config.base_url,
        }
    }

    pub fn enabled_extensions(&self) -> EnabledExtensions {
        self.enabled_extensions
    }

    /// Creates the well-known configuration store and its reference-ID
    /// index. Called once at process initialization; tolerant of the
    /// store already existing.
    pub fn create_config_store(&self) -> Result<(), StorageError> {
        match self
            .provider
            .create_store(DATA_VAULT_CONFIGURATION_STORE_NAME)
        {
            Ok(()) | Err(StorageError::DuplicateStore) => {}
            Err(e) => return Err(e),
        }

        let store = self
            .provider
            .open_store(DATA_VAULT_CONFIGURATION_STORE_NAME)?;
        store.create_reference_id_index()
    }

    /// POST /encrypted-data-vaults
    pub fn create_data_vault(&self, body: &[u8]) -> EdvResponse {
        let config: DataVaultConfiguration = match serde_json::from_slice(body) {
            Ok(config) => config,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::invalid_vault_config(&e.to_string()),
                )
            }
        };

        if let Err(e) = validate_data_vault_configuration(&config) {
            return EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::invalid_vault_config(&e.to_string()),
            );
        }

        let vault_id = generate_edv_compatible_id();

        if let Err((status, reason)) = self.store_vault_configuration(&config, &vault_id) {
            return EdvResponse::text(status, messages::vault_creation_failure(&reason));
        }

        if let Err(e) = self.provider.create_store(&vault_id) {
            return EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::vault_creation_failure(&e.to_string()),
            );
        }

        let store = match self.provider.open_store(&vault_id) {
            Ok(store) => store,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::vault_creation_failure(&e.to_string()),
                )
            }
        };

        if let Err(e) = store.create_edv_index() {
            return EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::vault_creation_failure(&e.to_string()),
            );
        }

        if let Err(e) = store.create_encrypted_doc_id_index() {
            return EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::vault_creation_failure(&e.to_string()),
            );
        }

        let mut body = Vec::new();
        if self.auth_enable {
            if let Some(auth_service) = &self.auth_service {
                match auth_service.create(&vault_id, &config.controller) {
                    Ok(payload) => body = payload,
                    Err(e) => {
                        return EdvResponse::text(
                            StatusCode::BAD_REQUEST,
                            messages::vault_creation_failure(&e.to_string()),
                        )
                    }
                }
            }
        }

        debug!("Created vault {}", vault_id);

        EdvResponse::created(
            format!("{}{}/{}", self.base_url, EDV_RESOURCE_PATH, vault_id),
            body,
        )
    }

    fn store_vault_configuration(
        &self,
        config: &DataVaultConfiguration,
        vault_id: &str,
    ) -> Result<(), (StatusCode, String)> {
        let store = match self
            .provider
            .open_store(DATA_VAULT_CONFIGURATION_STORE_NAME)
        {
            Ok(store) => store,
            Err(StorageError::StoreNotFound) => {
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    messages::store_vault_config_failure(messages::CONFIG_STORE_NOT_FOUND),
                ))
            }
            Err(e) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    messages::store_vault_config_failure(&e.to_string()),
                ))
            }
        };

        match store.store_data_vault_configuration(config, vault_id) {
            Ok(()) => Ok(()),
            Err(e) if e.is_duplicate_vault() => Err((
                StatusCode::CONFLICT,
                messages::store_vault_config_failure(&e.to_string()),
            )),
            Err(e) => Err((
                StatusCode::BAD_REQUEST,
                messages::store_vault_config_failure(&e.to_string()),
            )),
        }
    }

    /// POST /encrypted-data-vaults/{vaultID}/query
    pub fn query_vault(&self, vault_id: &str, body: &[u8]) -> EdvResponse {
        let vault_id = match unescape_path_var(vault_id) {
            Ok(vault_id) => vault_id,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::unescape_failure(VAULT_ID_PATH_VARIABLE, &e.to_string()),
                )
            }
        };

        let query: Query = match serde_json::from_slice(body) {
            Ok(query) => query,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::invalid_query(&vault_id, &e.to_string()),
                )
            }
        };

        let store = match self.provider.open_store(&vault_id) {
            Ok(store) => store,
            Err(StorageError::StoreNotFound) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::query_failure(&vault_id, messages::ERR_VAULT_NOT_FOUND),
                )
            }
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::query_failure(&vault_id, &e.to_string()),
                )
            }
        };

        let matches = match store.query(&query) {
            Ok(matches) => matches,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::query_failure(&vault_id, &e.to_string()),
                )
            }
        };

        let full_documents =
            self.enabled_extensions.return_full_documents_on_query && query.return_full_documents;

        self.build_query_response(&vault_id, &matches, full_documents)
    }

    fn build_query_response(
        &self,
        vault_id: &str,
        matches: &[EncryptedDocument],
        full_documents: bool,
    ) -> EdvResponse {
        let serialized = if full_documents {
            serde_json::to_vec(matches)
        } else {
            let urls: Vec<String> = matches
                .iter()
                .map(|document| self.document_location(vault_id, &document.id))
                .collect();
            serde_json::to_vec(&urls)
        };

        match serialized {
            Ok(body) => EdvResponse::ok(body),
            Err(e) => EdvResponse::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::fail_to_marshal_query_results(vault_id, &e.to_string()),
            ),
        }
    }

    /// POST /encrypted-data-vaults/{vaultID}/documents
    pub fn create_document(&self, vault_id: &str, body: &[u8]) -> EdvResponse {
        let vault_id = match unescape_path_var(vault_id) {
            Ok(vault_id) => vault_id,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::unescape_failure(VAULT_ID_PATH_VARIABLE, &e.to_string()),
                )
            }
        };

        let document: EncryptedDocument = match serde_json::from_slice(body) {
            Ok(document) => document,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::invalid_document_for_doc_creation(&vault_id, &e.to_string()),
                )
            }
        };

        if let Err(reason) = validate_encrypted_document(&document) {
            return EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::invalid_document_for_doc_creation(&vault_id, &reason),
            );
        }

        let store = match self.provider.open_store(&vault_id) {
            Ok(store) => store,
            Err(StorageError::StoreNotFound) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::create_document_failure(&vault_id, messages::ERR_VAULT_NOT_FOUND),
                )
            }
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::create_document_failure(&vault_id, &e.to_string()),
                )
            }
        };

        match store.put(&document) {
            Ok(()) => {
                debug!("Created document {} in vault {}", document.id, vault_id);
                EdvResponse::created(self.document_location(&vault_id, &document.id), Vec::new())
            }
            Err(e @ StorageError::DuplicateDocument) => EdvResponse::text(
                StatusCode::CONFLICT,
                messages::create_document_failure(&vault_id, &e.to_string()),
            ),
            Err(e) => EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::create_document_failure(&vault_id, &e.to_string()),
            ),
        }
    }

    /// GET /encrypted-data-vaults/{vaultID}/documents/{docID}
    pub fn read_document(&self, vault_id: &str, doc_id: &str) -> EdvResponse {
        let (vault_id, doc_id) = match self.unescape_vault_and_doc_id(vault_id, doc_id) {
            Ok(ids) => ids,
            Err(response) => return response,
        };

        let store = match self.provider.open_store(&vault_id) {
            Ok(store) => store,
            Err(StorageError::StoreNotFound) => {
                return EdvResponse::text(
                    StatusCode::NOT_FOUND,
                    messages::read_document_failure(
                        &doc_id,
                        &vault_id,
                        messages::ERR_VAULT_NOT_FOUND,
                    ),
                )
            }
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::read_document_failure(&doc_id, &vault_id, &e.to_string()),
                )
            }
        };

        match store.get(&doc_id) {
            Ok(bytes) => EdvResponse::ok(bytes),
            Err(StorageError::ValueNotFound) => EdvResponse::text(
                StatusCode::NOT_FOUND,
                messages::read_document_failure(
                    &doc_id,
                    &vault_id,
                    messages::ERR_DOCUMENT_NOT_FOUND,
                ),
            ),
            Err(e) => EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::read_document_failure(&doc_id, &vault_id, &e.to_string()),
            ),
        }
    }

    /// GET /encrypted-data-vaults/{vaultID}/documents
    pub fn read_all_documents(&self, vault_id: &str) -> EdvResponse {
        let vault_id = match unescape_path_var(vault_id) {
            Ok(vault_id) => vault_id,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::unescape_failure(VAULT_ID_PATH_VARIABLE, &e.to_string()),
                )
            }
        };

        let store = match self.provider.open_store(&vault_id) {
            Ok(store) => store,
            Err(StorageError::StoreNotFound) => {
                return EdvResponse::text(
                    StatusCode::NOT_FOUND,
                    messages::read_all_documents_failure(
                        &vault_id,
                        messages::ERR_VAULT_NOT_FOUND,
                    ),
                )
            }
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::read_all_documents_failure(&vault_id, &e.to_string()),
                )
            }
        };

        let all_documents = match store.get_all() {
            Ok(all_documents) => all_documents,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    messages::read_all_documents_failure(
                        &vault_id,
                        &messages::fail_while_get_all_docs_from_store(&e.to_string()),
                    ),
                )
            }
        };

        let mut raw_documents: Vec<Box<RawValue>> = Vec::with_capacity(all_documents.len());
        for document_bytes in &all_documents {
            match serde_json::from_slice::<Box<RawValue>>(document_bytes) {
                Ok(raw) => raw_documents.push(raw),
                Err(e) => {
                    return EdvResponse::text(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        messages::fail_to_marshal_all_documents(&vault_id, &e.to_string()),
                    )
                }
            }
        }

        match serde_json::to_vec(&raw_documents) {
            Ok(body) => EdvResponse::ok(body),
            Err(e) => EdvResponse::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::fail_to_marshal_all_documents(&vault_id, &e.to_string()),
            ),
        }
    }

    /// POST /encrypted-data-vaults/{vaultID}/documents/{docID}
    pub fn update_document(&self, vault_id: &str, doc_id: &str, body: &[u8]) -> EdvResponse {
        let (vault_id, doc_id) = match self.unescape_vault_and_doc_id(vault_id, doc_id) {
            Ok(ids) => ids,
            Err(response) => return response,
        };

        let document: EncryptedDocument = match serde_json::from_slice(body) {
            Ok(document) => document,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::invalid_document_for_doc_update(&doc_id, &vault_id, &e.to_string()),
                )
            }
        };

        if document.id != doc_id {
            return EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::invalid_document_for_doc_update(
                    &doc_id,
                    &vault_id,
                    messages::MISMATCHED_DOC_IDS,
                ),
            );
        }

        if let Err(reason) = validate_encrypted_document(&document) {
            return EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::invalid_document_for_doc_update(&doc_id, &vault_id, &reason),
            );
        }

        let store = match self.provider.open_store(&vault_id) {
            Ok(store) => store,
            Err(StorageError::StoreNotFound) => {
                return EdvResponse::text(
                    StatusCode::NOT_FOUND,
                    messages::update_document_failure(
                        &doc_id,
                        &vault_id,
                        messages::ERR_VAULT_NOT_FOUND,
                    ),
                )
            }
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::update_document_failure(&doc_id, &vault_id, &e.to_string()),
                )
            }
        };

        match store.update(&document) {
            Ok(()) => {
                debug!("Updated document {} in vault {}", doc_id, vault_id);
                EdvResponse::ok(Vec::new())
            }
            Err(StorageError::ValueNotFound) => EdvResponse::text(
                StatusCode::NOT_FOUND,
                messages::update_document_failure(
                    &doc_id,
                    &vault_id,
                    messages::ERR_DOCUMENT_NOT_FOUND,
                ),
            ),
            Err(e) => EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::update_document_failure(&doc_id, &vault_id, &e.to_string()),
            ),
        }
    }

    /// DELETE /encrypted-data-vaults/{vaultID}/documents/{docID}
    pub fn delete_document(&self, vault_id: &str, doc_id: &str) -> EdvResponse {
        let (vault_id, doc_id) = match self.unescape_vault_and_doc_id(vault_id, doc_id) {
            Ok(ids) => ids,
            Err(response) => return response,
        };

        let store = match self.provider.open_store(&vault_id) {
            Ok(store) => store,
            Err(StorageError::StoreNotFound) => {
                return EdvResponse::text(
                    StatusCode::NOT_FOUND,
                    messages::delete_document_failure(
                        &doc_id,
                        &vault_id,
                        messages::ERR_VAULT_NOT_FOUND,
                    ),
                )
            }
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::delete_document_failure(&doc_id, &vault_id, &e.to_string()),
                )
            }
        };

        match store.delete(&doc_id) {
            Ok(()) => {
                debug!("Deleted document {} in vault {}", doc_id, vault_id);
                EdvResponse::ok(Vec::new())
            }
            Err(StorageError::ValueNotFound) => EdvResponse::text(
                StatusCode::NOT_FOUND,
                messages::delete_document_failure(
                    &doc_id,
                    &vault_id,
                    messages::ERR_DOCUMENT_NOT_FOUND,
                ),
            ),
            Err(e) => EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::delete_document_failure(&doc_id, &vault_id, &e.to_string()),
            ),
        }
    }

    /// POST /encrypted-data-vaults/{vaultID}/batch
    ///
    /// Validates every item before executing any of them, then executes in
    /// input order collecting per-slot results. Batches are not
    /// transactional: a failing item does not roll back earlier ones.
    pub fn batch(&self, vault_id: &str, body: &[u8]) -> EdvResponse {
        let vault_id = match unescape_path_var(vault_id) {
            Ok(vault_id) => vault_id,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::unescape_failure(VAULT_ID_PATH_VARIABLE, &e.to_string()),
                )
            }
        };

        let batch: Batch = match serde_json::from_slice(body) {
            Ok(batch) => batch,
            Err(e) => {
                return EdvResponse::text(
                    StatusCode::BAD_REQUEST,
                    messages::invalid_batch(&vault_id, &e.to_string()),
                )
            }
        };

        let mut responses = vec![String::new(); batch.len()];

        for (index, operation) in batch.iter().enumerate() {
            if let Err(reason) = validate_vault_operation(operation) {
                for (slot_index, slot) in responses.iter_mut().enumerate() {
                    if slot_index != index {
                        *slot = messages::BATCH_VALIDATED_NOT_EXECUTED.to_owned();
                    }
                }
                responses[index] = reason;

                return batch_response(StatusCode::BAD_REQUEST, &responses, &vault_id);
            }
        }

        let mut any_failed = false;

        for (index, operation) in batch.iter().enumerate() {
            let outcome = if operation
                .operation
                .eq_ignore_ascii_case(UPSERT_VAULT_OPERATION)
            {
                match &operation.encrypted_document {
                    Some(document) => self.execute_batch_upsert(&vault_id, document),
                    None => Err(messages::ERR_DOCUMENT_NOT_FOUND.to_owned()),
                }
            } else {
                self.execute_batch_delete(&vault_id, &operation.document_id)
            };

            match outcome {
                Ok(slot) => responses[index] = slot,
                Err(reason) => {
                    responses[index] = reason;
                    any_failed = true;
                }
            }
        }

        let status = if any_failed {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };

        batch_response(status, &responses, &vault_id)
    }

    /// Runs one upsert through the back-end's create-or-replace primitive.
    /// Returns the resource URL on success.
    fn execute_batch_upsert(
        &self,
        vault_id: &str,
        document: &EncryptedDocument,
    ) -> Result<String, String> {
        let store = self.open_vault_store_for_batch(vault_id)?;

        store
            .upsert_bulk(std::slice::from_ref(document))
            .map_err(|e| e.to_string())?;

        Ok(self.document_location(vault_id, &document.id))
    }

    /// Runs one delete. Returns the empty string on success.
    fn execute_batch_delete(&self, vault_id: &str, doc_id: &str) -> Result<String, String> {
        let store = self.open_vault_store_for_batch(vault_id)?;

        match store.delete(doc_id) {
            Ok(()) => Ok(String::new()),
            Err(StorageError::ValueNotFound) => Err(messages::ERR_DOCUMENT_NOT_FOUND.to_owned()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn open_vault_store_for_batch(&self, vault_id: &str) -> Result<Box<dyn EdvStore>, String> {
        match self.provider.open_store(vault_id) {
            Ok(store) => Ok(store),
            Err(StorageError::StoreNotFound) => Err(messages::ERR_VAULT_NOT_FOUND.to_owned()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn unescape_vault_and_doc_id(
        &self,
        vault_id: &str,
        doc_id: &str,
    ) -> Result<(String, String), EdvResponse> {
        let vault_id = unescape_path_var(vault_id).map_err(|e| {
            EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::unescape_failure(VAULT_ID_PATH_VARIABLE, &e.to_string()),
            )
        })?;

        let doc_id = unescape_path_var(doc_id).map_err(|e| {
            EdvResponse::text(
                StatusCode::BAD_REQUEST,
                messages::unescape_failure(DOC_ID_PATH_VARIABLE, &e.to_string()),
            )
        })?;

        Ok((vault_id, doc_id))
    }

    fn document_location(&self, vault_id: &str, doc_id: &str) -> String {
        format!(
            "{}{}/{}/documents/{}",
            self.base_url, EDV_RESOURCE_PATH, vault_id, doc_id
        )
    }
}

/// Validates a single batch item without touching storage.
fn validate_vault_operation(operation: &VaultOperation) -> Result<(), String> {
    if operation
        .operation
        .eq_ignore_ascii_case(UPSERT_VAULT_OPERATION)
    {
        match &operation.encrypted_document {
            Some(document) => validate_encrypted_document(document),
            None => validate_encrypted_document(&EncryptedDocument::default()),
        }
    } else if operation
        .operation
        .eq_ignore_ascii_case(DELETE_VAULT_OPERATION)
    {
        if operation.document_id.is_empty() {
            Err(messages::BLANK_DOCUMENT_ID_FOR_DELETE.to_owned())
        } else {
            Ok(())
        }
    } else {
        Err(messages::invalid_vault_operation(&operation.operation))
    }
}

fn batch_response(status: StatusCode, responses: &[String], vault_id: &str) -> EdvResponse {
    match serde_json::to_vec(responses) {
        Ok(body) => EdvResponse {
            status,
            location: None,
            body,
        },
        Err(e) => {
            error!(
                "Failed to marshal batch responses for vault {}: {}",
                vault_id, e
            );
            EdvResponse::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::invalid_batch(vault_id, &e.to_string()),
            )
        }
    }
}
