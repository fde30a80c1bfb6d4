//! Wire data model for the EDV REST protocol
//!
//! This module provides the JSON structures exchanged with clients:
//! - DataVaultConfiguration: client-supplied vault configuration
//! - EncryptedDocument: opaque encrypted document with indexed attributes
//! - Query: equality query over indexed attributes
//! - VaultOperation / Batch: ordered mixed-operation batches
//!
//! JWE payloads are kept as raw JSON so a stored document re-serializes
//! byte-identically to what the client sent.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Batch operation name for create-or-replace.
pub const UPSERT_VAULT_OPERATION: &str = "upsert";

/// Batch operation name for delete.
pub const DELETE_VAULT_OPERATION: &str = "delete";

/// A URI paired with a key type, used for the KEK and HMAC descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdTypePair {
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
}

/// Client-supplied configuration for a new data vault.
///
/// The `sequence` is chosen by the client and opaque to the server.
/// `reference_id` must be unique across all vaults on this server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataVaultConfiguration {
    pub sequence: u64,
    pub controller: String,
    pub invoker: Vec<String>,
    pub delegator: Vec<String>,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
    pub kek: IdTypePair,
    pub hmac: IdTypePair,
}

/// A single encrypted attribute used for equality queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexedAttribute {
    pub name: String,
    pub value: String,
    pub unique: bool,
}

/// A set of indexed attributes along with the HMAC used to produce them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexedAttributeCollection {
    pub sequence: u64,
    pub hmac: IdTypePair,
    pub attributes: Vec<IndexedAttribute>,
}

/// An opaque encrypted document stored in a vault.
///
/// The `id` is a base58-encoded 128-bit value chosen by the client. The
/// `jwe` field is the raw ciphertext object and is never interpreted
/// beyond shape validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptedDocument {
    pub id: String,
    pub sequence: u64,
    pub indexed: Option<Vec<IndexedAttributeCollection>>,
    pub jwe: Option<Box<RawValue>>,
}

/// An equality query over indexed attributes.
///
/// Matches any document carrying an attribute with `name == index` and
/// `value == equals`. `return_full_documents` only takes effect when the
/// server has the corresponding extension enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    #[serde(rename = "returnFullDocuments")]
    pub return_full_documents: bool,
    pub index: String,
    pub equals: String,
}

/// One item of a batch request: an upsert or a delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultOperation {
    pub operation: String,
    #[serde(rename = "documentID", skip_serializing_if = "String::is_empty")]
    pub document_id: String,
    #[serde(rename = "encryptedDocument", skip_serializing_if = "Option::is_none")]
    pub encrypted_document: Option<EncryptedDocument>,
}

/// An ordered sequence of vault operations.
pub type Batch = Vec<VaultOperation>;

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_JWE: &str = r#"{"protected":"eyJlbmMiOiJDMjBQIn0","recipients":[{"header":{"alg":"A256KW","kid":"https://example.com/kms/z7BgF536GaR"},"encrypted_key":"OR1vdCNvf_B68mfUxFQVT-vyXVrBembuiM40mAAjDC1-Qu5iArDbug"}],"iv":"i8Nins2vTI3PlrYW","ciphertext":"Cb-963UCXblINT8F6MDHzMJN9EAhK3I","tag":"pfZO0JulJcrc3trOZy8rjA"}"#;

    #[test]
    fn test_encrypted_document_round_trip_is_byte_identical() {
        let doc_json = format!(
            r#"{{"id":"VJYHHJx4C8J9Fsgz7rZqSp","sequence":0,"indexed":null,"jwe":{}}}"#,
            TEST_JWE
        );

        let doc: EncryptedDocument = serde_json::from_str(&doc_json).unwrap();
        let round_tripped = serde_json::to_string(&doc).unwrap();

        assert_eq!(doc_json, round_tripped);
    }

    #[test]
    fn test_encrypted_document_with_indexed_attributes_round_trip() {
        let doc_json = format!(
            r#"{{"id":"VJYHHJx4C8J9Fsgz7rZqSp","sequence":0,"indexed":[{{"sequence":0,"hmac":{{"id":"","type":""}},"attributes":[{{"name":"indexName1","value":"testVal","unique":true}}]}}],"jwe":{}}}"#,
            TEST_JWE
        );

        let doc: EncryptedDocument = serde_json::from_str(&doc_json).unwrap();
        let round_tripped = serde_json::to_string(&doc).unwrap();

        assert_eq!(doc_json, round_tripped);
    }

    #[test]
    fn test_data_vault_configuration_optional_fields_default() {
        let config_json = r#"{
  "sequence": 0,
  "controller": "did:example:123456789",
  "referenceId": "testReferenceID",
  "kek": {"id": "https://example.com/kms/12345", "type": "AesKeyWrappingKey2019"},
  "hmac": {"id": "https://example.com/kms/67891", "type": "Sha256HmacKey2019"}
}"#;

        let config: DataVaultConfiguration = serde_json::from_str(config_json).unwrap();
        assert_eq!(config.controller, "did:example:123456789");
        assert_eq!(config.reference_id, "testReferenceID");
        assert_eq!(config.kek.key_type, "AesKeyWrappingKey2019");
        assert!(config.invoker.is_empty());
        assert!(config.delegator.is_empty());
    }

    #[test]
    fn test_query_defaults_to_document_urls() {
        let query: Query = serde_json::from_str(r#"{"index":"a","equals":"b"}"#).unwrap();
        assert!(!query.return_full_documents);
        assert_eq!(query.index, "a");
        assert_eq!(query.equals, "b");
    }

    #[test]
    fn test_vault_operation_without_document() {
        let op: VaultOperation =
            serde_json::from_str(r#"{"operation":"delete","documentID":"abc"}"#).unwrap();
        assert_eq!(op.operation, "delete");
        assert_eq!(op.document_id, "abc");
        assert!(op.encrypted_document.is_none());
    }
}
