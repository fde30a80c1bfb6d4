//! Identifier and payload validation for EDV requests
//!
//! This module enforces the EDV identifier rules (base58, 128 bits before
//! encoding), well-formedness of vault configuration URIs, the minimum
//! shape of a raw JWE, and strict unescaping of URL path variables.

use crate::models::{DataVaultConfiguration, EncryptedDocument};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;
use uuid::Uuid;

/// Decoded length, in bytes, of a valid EDV identifier.
pub const EDV_ID_BYTE_LENGTH: usize = 16;

/// Document ID validation errors. The text of both variants is pinned by
/// the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentIdError {
    #[error("document ID must be a base58-encoded value")]
    NotBase58Encoded,

    #[error("document ID is not a base58-encoded 128-bit value")]
    Not128BitValue,
}

/// Checks that `id` is base58 and decodes to exactly 128 bits.
///
/// An empty ID fails the base58 check, matching the behavior expected for
/// zero-value documents in batch requests.
pub fn validate_document_id(id: &str) -> Result<(), DocumentIdError> {
    let decoded = bs58::decode(id)
        .into_vec()
        .map_err(|_| DocumentIdError::NotBase58Encoded)?;

    if decoded.is_empty() {
        return Err(DocumentIdError::NotBase58Encoded);
    }

    if decoded.len() != EDV_ID_BYTE_LENGTH {
        return Err(DocumentIdError::Not128BitValue);
    }

    Ok(())
}

/// Generates a new EDV-compatible identifier: base58 over 128 random bits.
pub fn generate_edv_compatible_id() -> String {
    bs58::encode(Uuid::new_v4().as_bytes()).into_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{uri}\" is not a valid URI")]
pub struct UriError {
    uri: String,
}

fn validate_uri(uri: &str) -> Result<(), UriError> {
    url::Url::parse(uri).map(|_| ()).map_err(|_| UriError {
        uri: uri.to_owned(),
    })
}

/// Vault configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultConfigError {
    #[error("controller cannot be blank")]
    BlankController,

    #[error("KEK ID cannot be blank")]
    BlankKekId,

    #[error("KEK type cannot be blank")]
    BlankKekType,

    #[error("HMAC ID cannot be blank")]
    BlankHmacId,

    #[error("HMAC type cannot be blank")]
    BlankHmacType,

    #[error("controller is invalid: {0}")]
    InvalidController(UriError),

    #[error("KEK ID is invalid: {0}")]
    InvalidKekId(UriError),

    #[error("HMAC ID is invalid: {0}")]
    InvalidHmacId(UriError),

    #[error("invoker contains an invalid URI: {0}")]
    InvalidInvoker(UriError),

    #[error("delegator contains an invalid URI: {0}")]
    InvalidDelegator(UriError),
}

/// Validates an incoming data vault configuration.
///
/// All blank checks run before any URI parsing so a missing field is
/// reported as missing rather than as a malformed URI.
pub fn validate_data_vault_configuration(
    config: &DataVaultConfiguration,
) -> Result<(), VaultConfigError> {
    if config.controller.is_empty() {
        return Err(VaultConfigError::BlankController);
    }
    if config.kek.id.is_empty() {
        return Err(VaultConfigError::BlankKekId);
    }
    if config.kek.key_type.is_empty() {
        return Err(VaultConfigError::BlankKekType);
    }
    if config.hmac.id.is_empty() {
        return Err(VaultConfigError::BlankHmacId);
    }
    if config.hmac.key_type.is_empty() {
        return Err(VaultConfigError::BlankHmacType);
    }

    validate_uri(&config.controller).map_err(VaultConfigError::InvalidController)?;
    validate_uri(&config.kek.id).map_err(VaultConfigError::InvalidKekId)?;
    validate_uri(&config.hmac.id).map_err(VaultConfigError::InvalidHmacId)?;

    for invoker in &config.invoker {
        validate_uri(invoker).map_err(VaultConfigError::InvalidInvoker)?;
    }
    for delegator in &config.delegator {
        validate_uri(delegator).map_err(VaultConfigError::InvalidDelegator)?;
    }

    Ok(())
}

/// Raw JWE validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JweError {
    #[error("JWE cannot be empty")]
    Blank,

    #[error("JWE protected header must specify an alg or enc value")]
    BlankAlg,

    #[error("{0}")]
    Malformed(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawJweHeaders {
    #[serde(default)]
    protected: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProtectedHeaders {
    #[serde(default)]
    alg: String,
    #[serde(default)]
    enc: String,
}

/// Validates the minimum shape of a raw JWE: a non-empty object whose
/// protected header decodes to JSON carrying a non-blank `alg` or `enc`.
/// The ciphertext itself is never inspected.
pub fn validate_raw_jwe(jwe: Option<&RawValue>) -> Result<(), JweError> {
    let raw = jwe.ok_or(JweError::Blank)?;

    let text = raw.get().trim();
    if text.is_empty() || text == "null" {
        return Err(JweError::Blank);
    }

    let headers: RawJweHeaders =
        serde_json::from_str(text).map_err(|e| JweError::Malformed(e.to_string()))?;
    if headers.protected.is_empty() {
        return Err(JweError::BlankAlg);
    }

    let decoded = URL_SAFE_NO_PAD
        .decode(headers.protected.as_bytes())
        .map_err(|e| JweError::Malformed(e.to_string()))?;
    let protected: ProtectedHeaders =
        serde_json::from_slice(&decoded).map_err(|e| JweError::Malformed(e.to_string()))?;

    if protected.alg.is_empty() && protected.enc.is_empty() {
        return Err(JweError::BlankAlg);
    }

    Ok(())
}

/// Validates an encrypted document for create/update/batch-upsert: ID rules
/// first, then JWE shape. Returns the wire-contract error text.
pub fn validate_encrypted_document(document: &EncryptedDocument) -> Result<(), String> {
    validate_document_id(&document.id).map_err(|e| e.to_string())?;

    validate_raw_jwe(document.jwe.as_deref())
        .map_err(|e| crate::messages::invalid_raw_jwe(&e.to_string()))?;

    Ok(())
}

/// Strict percent-decoding failure. Rendered as the offending escape
/// sequence in quotes, e.g. `invalid URL escape "%"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid URL escape {sequence:?}")]
pub struct UnescapeError {
    sequence: String,
}

/// Strictly percent-decodes a URL path variable.
///
/// Unlike the lenient decoders in the HTTP ecosystem, a dangling `%` or a
/// non-hex escape is an error, which the REST surface maps to 400.
pub fn unescape_path_var(escaped: &str) -> Result<String, UnescapeError> {
    fn hex_val(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&hi), Some(&lo)) => hex_val(hi).zip(hex_val(lo)),
                _ => None,
            };

            match escape {
                Some((hi, lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                None => {
                    let end = (i + 3).min(bytes.len());
                    return Err(UnescapeError {
                        sequence: String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                    });
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| UnescapeError {
        sequence: escaped.to_owned(),
    })
}
