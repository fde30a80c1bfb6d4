//! Response message table for the EDV REST protocol
//!
//! Clients and the conformance suite pin the exact text of these messages,
//! so they are part of the wire contract. Changing any of them is a
//! breaking change even when the status code stays the same.

/// Returned when an operation targets a vault this server does not hold.
pub const ERR_VAULT_NOT_FOUND: &str = "specified vault does not exist";

/// Returned when an operation targets a document not present in the vault.
pub const ERR_DOCUMENT_NOT_FOUND: &str = "specified document does not exist";

/// Reported by the vault registry when the configuration store is missing.
pub const CONFIG_STORE_NOT_FOUND: &str = "data vault configuration store not found";

/// Sentinel placed in every non-failing batch slot when validation of the
/// batch fails. Kept verbatim for wire compatibility.
pub const BATCH_VALIDATED_NOT_EXECUTED: &str = "validated but not executed";

/// Batch validation error for a delete item without a document ID.
pub const BLANK_DOCUMENT_ID_FOR_DELETE: &str =
    "document ID cannot be empty for a delete operation";

/// Update validation error for a body ID that disagrees with the URL.
pub const MISMATCHED_DOC_IDS: &str =
    "document ID in the request body does not match the document ID in the URL";

pub fn invalid_vault_config(reason: &str) -> String {
    format!("Received invalid data vault configuration: {reason}.")
}

pub fn vault_creation_failure(reason: &str) -> String {
    format!("Failed to create a new data vault: {reason}.")
}

pub fn store_vault_config_failure(reason: &str) -> String {
    format!("failed to store data vault configuration: {reason}")
}

pub fn unescape_failure(path_variable: &str, reason: &str) -> String {
    format!("Unable to unescape {path_variable} path variable: {reason}.")
}

pub fn invalid_document_for_doc_creation(vault_id: &str, reason: &str) -> String {
    format!("Received a request to create a document in vault {vault_id}, but the document is invalid: {reason}.")
}

pub fn create_document_failure(vault_id: &str, reason: &str) -> String {
    format!("Failed to create a document in vault {vault_id}: {reason}.")
}

pub fn read_document_failure(doc_id: &str, vault_id: &str, reason: &str) -> String {
    format!("Failed to read document {doc_id} in vault {vault_id}: {reason}.")
}

pub fn read_all_documents_failure(vault_id: &str, reason: &str) -> String {
    format!("Failed to read all documents in vault {vault_id}: {reason}.")
}

pub fn fail_while_get_all_docs_from_store(reason: &str) -> String {
    format!("failure while getting all documents from the store: {reason}")
}

pub fn fail_to_marshal_all_documents(vault_id: &str, reason: &str) -> String {
    format!("Failed to marshal all documents stored in vault {vault_id}: {reason}.")
}

pub fn invalid_document_for_doc_update(doc_id: &str, vault_id: &str, reason: &str) -> String {
    format!("Received a request to update document {doc_id} in vault {vault_id}, but the document is invalid: {reason}.")
}

pub fn update_document_failure(doc_id: &str, vault_id: &str, reason: &str) -> String {
    format!("Failed to update document {doc_id} in vault {vault_id}: {reason}.")
}

pub fn delete_document_failure(doc_id: &str, vault_id: &str, reason: &str) -> String {
    format!("Failed to delete document {doc_id} in vault {vault_id}: {reason}.")
}

pub fn invalid_query(vault_id: &str, reason: &str) -> String {
    format!("Received invalid query for data vault {vault_id}: {reason}.")
}

pub fn query_failure(vault_id: &str, reason: &str) -> String {
    format!("Failed to query data vault {vault_id}: {reason}.")
}

pub fn fail_to_marshal_query_results(vault_id: &str, reason: &str) -> String {
    format!("Failed to marshal query results for data vault {vault_id}: {reason}.")
}

pub fn invalid_batch(vault_id: &str, reason: &str) -> String {
    format!("Received invalid batch request for data vault {vault_id}: {reason}.")
}

pub fn invalid_vault_operation(name: &str) -> String {
    format!("{name} is not a valid vault operation")
}

pub fn invalid_raw_jwe(reason: &str) -> String {
    format!("invalid raw JWE: {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_vault_composite_message() {
        // This composite is pinned by the conformance suite.
        let inner = "an error occurred while querying reference IDs: vault already exists";
        let body = vault_creation_failure(&store_vault_config_failure(inner));

        assert_eq!(
            body,
            "Failed to create a new data vault: failed to store data vault configuration: \
             an error occurred while querying reference IDs: vault already exists."
        );
    }

    #[test]
    fn test_invalid_vault_operation_message() {
        assert_eq!(
            invalid_vault_operation("invalidOperationName"),
            "invalidOperationName is not a valid vault operation"
        );
    }
}
