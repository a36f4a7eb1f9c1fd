//! The self-describing envelope produced by encryption.
//!
//! Envelopes are serialised as JSON objects. Only `iv`, `salt` and `value`
//! are required on input; every parameter field is optional so that
//! envelopes written before a field existed still decrypt.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::KryptError;

/// Message for text input that is not JSON at all.
pub const PARSE_ERROR: &str = "unable to parse input as JSON";

/// Message for input lacking any of the three required fields.
pub const MISSING_FIELDS_ERROR: &str = "input must contain iv, salt, and value";

/// Names of the fields owned by the codec. Context fields with these names
/// are never merged into an envelope.
pub const CORE_FIELDS: [&str; 9] = [
    "cipher",
    "keyDerivation",
    "keyLength",
    "iterations",
    "digest",
    "iv",
    "salt",
    "value",
    "mac",
];

/// A persisted or transmitted encrypted value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Symmetric cipher identifier, e.g. `"aes-256-cbc"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,

    /// Key-derivation function identifier, e.g. `"pbkdf2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_derivation: Option<String>,

    /// Derived key length in bits. A value of `32` is the legacy byte form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_length: Option<u32>,

    /// Key-derivation work factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,

    /// Digest used by the key-derivation function. Absent on legacy envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Base64 initialization vector.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub iv: String,

    /// Base64 key-derivation salt.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub salt: String,

    /// Base64 ciphertext.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,

    /// Base64 HMAC-SHA256 integrity tag, present only on authenticated envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// Caller-supplied context fields carried alongside the core fields.
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

/// `null` reads as an empty string so that it is reported as a missing field.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
    /// Returns `true` when `iv`, `salt` and `value` are all present and non-empty.
    pub fn has_required_fields(&self) -> bool {
        !self.iv.is_empty() && !self.salt.is_empty() && !self.value.is_empty()
    }

    /// Parse an envelope from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`KryptError::InvalidArgument`] if `text` is not valid JSON or
    /// does not describe an envelope object.
    pub fn from_json(text: &str) -> Result<Self, KryptError> {
        let value: Value =
            serde_json::from_str(text).map_err(|_| KryptError::invalid(PARSE_ERROR))?;
        Self::from_value(value)
    }

    /// Convert an already-parsed JSON value into an envelope.
    ///
    /// Non-object values are reported as missing the required fields, since
    /// they cannot carry `iv`, `salt` or `value`.
    pub fn from_value(value: Value) -> Result<Self, KryptError> {
        if !value.is_object() {
            return Err(KryptError::invalid(MISSING_FIELDS_ERROR));
        }
        serde_json::from_value(value)
            .map_err(|e| KryptError::invalid(format!("input is not a valid envelope: {e}")))
    }

    /// Compact JSON encoding.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Pretty JSON encoding with two-space indentation.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Merge context fields into this envelope without touching core fields
    /// or fields already present in the context.
    pub fn merge_context(&mut self, context: &Map<String, Value>) {
        for (key, value) in context {
            if CORE_FIELDS.contains(&key.as_str()) {
                continue;
            }
            self.context
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}
