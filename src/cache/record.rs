//! Cache record: a flat, extensible key-value document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fingerprint::{Fingerprint, FingerprintResult, Method};

/// Decimal string of the 64-bit fingerprint.
pub const FIELD_FINGERPRINT: &str = "fingerprint";
/// Name of the algorithm that produced the fingerprint.
pub const FIELD_FINGERPRINT_METHOD: &str = "fingerprint_method";
/// `data:` URL of the encoded thumbnail.
pub const FIELD_THUMBNAIL: &str = "thumbnail";
/// Page count of the document.
pub const FIELD_PAGE_COUNT: &str = "page_count";

/// One persisted record.
///
/// Fields written by different producers coexist; [`CacheRecord::merge`]
/// overwrites only the fields present in the incoming record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheRecord(Map<String, Value>);

impl CacheRecord {
    /// An empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Read a raw field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: fields of `newer` replace same-named fields here.
    pub fn merge(&mut self, newer: CacheRecord) {
        for (name, value) in newer.0 {
            self.0.insert(name, value);
        }
    }

    /// Record carrying only a fingerprint.
    #[must_use]
    pub fn with_fingerprint(self, result: FingerprintResult) -> Self {
        self.with_field(FIELD_FINGERPRINT, result.value.value().to_string())
            .with_field(FIELD_FINGERPRINT_METHOD, result.method.as_str())
    }

    /// The stored fingerprint, if present and parseable.
    ///
    /// Records written without a method name are considered valid unless
    /// their value is the `0` sentinel.
    #[must_use]
    pub fn fingerprint(&self) -> Option<FingerprintResult> {
        let value = match self.0.get(FIELD_FINGERPRINT)? {
            Value::String(s) => s.trim().parse::<u64>().ok()?,
            Value::Number(n) => n.as_u64()?,
            _ => return None,
        };
        let value = Fingerprint::new(value);

        let method = self
            .0
            .get(FIELD_FINGERPRINT_METHOD)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Method>().ok())
            .unwrap_or(if value.is_zero() {
                Method::Unavailable
            } else {
                Method::Perceptual
            });

        Some(FingerprintResult { value, method })
    }

    /// Attach a thumbnail `data:` URL.
    #[must_use]
    pub fn with_thumbnail(self, data_url: impl Into<String>) -> Self {
        self.with_field(FIELD_THUMBNAIL, data_url.into())
    }

    /// The stored thumbnail `data:` URL.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.0
            .get(FIELD_THUMBNAIL)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Attach a page count.
    #[must_use]
    pub fn with_page_count(self, pages: u32) -> Self {
        self.with_field(FIELD_PAGE_COUNT, pages)
    }

    /// The stored page count.
    #[must_use]
    pub fn page_count(&self) -> Option<u32> {
        self.0
            .get(FIELD_PAGE_COUNT)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }
}
