//! Content-addressed cache keys and their on-disk file names.

use std::fmt;
use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::scanner::DocumentMeta;

/// Extension of cache record files.
pub const RECORD_EXTENSION: &str = "json";

/// Identity of a document version: `path|modified|size`.
///
/// Two documents share a key iff path, modification time and size are all
/// identical. This stands in for "same content"; file bytes are never
/// hashed. The modification time is written as signed nanoseconds since
/// the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from its three components.
    #[must_use]
    pub fn new(path: &Path, modified_nanos: i128, size: u64) -> Self {
        Self(format!(
            "{}|{}|{}",
            path.to_string_lossy(),
            modified_nanos,
            size
        ))
    }

    /// Key for a listed document.
    #[must_use]
    pub fn for_document(meta: &DocumentMeta) -> Self {
        Self::new(&meta.path, meta.modified_nanos(), meta.size)
    }

    /// Wrap an already formatted key string.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the record for this key.
    ///
    /// URL-safe base64 of the UTF-8 key without padding, plus `.json`.
    /// The encoding is injective and reversible via [`CacheKey::from_file_name`].
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", URL_SAFE_NO_PAD.encode(self.0.as_bytes()), RECORD_EXTENSION)
    }

    /// Recover the key from a record file name.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(RECORD_EXTENSION)?.strip_suffix('.')?;
        let bytes = URL_SAFE_NO_PAD.decode(stem).ok()?;
        String::from_utf8(bytes).ok().map(Self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
