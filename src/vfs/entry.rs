use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A member of a zip that has not been expanded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZippedFile {
    pub hash: String,
}

/// What the in-memory backend knows about a tracked file.
///
/// Deserializes from a catalog file descriptor (`{"hash": ..., "size": ...}`); fields the
/// record does not model are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unzipped_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zipped_files: Option<BTreeMap<String, ZippedFile>>,
}

impl FileRecord {
    pub fn new() -> FileRecord {
        FileRecord::default()
    }

    pub fn with_hash<S: Into<String>>(hash: S) -> FileRecord {
        FileRecord {
            hash: Some(hash.into()),
            ..FileRecord::default()
        }
    }

    /// Builds a record from a catalog file descriptor.
    pub fn from_descriptor(descriptor: &Value) -> serde_json::Result<FileRecord> {
        FileRecord::deserialize(descriptor)
    }

    /// Attaches a decoded JSON payload that `load_dict_from_file` will hand out once.
    pub fn unzipped_json(mut self, value: Value) -> FileRecord {
        self.unzipped_json = Some(value);
        self
    }

    /// Attaches the manifest of a zip that `unzip_contents` will expand.
    pub fn zipped_files<I, K, H>(mut self, members: I) -> FileRecord
    where
        I: IntoIterator<Item = (K, H)>,
        K: Into<String>,
        H: Into<String>,
    {
        let manifest = members
            .into_iter()
            .map(|(path, hash)| (path.into(), ZippedFile { hash: hash.into() }))
            .collect();
        self.zipped_files = Some(manifest);
        self
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn set_content(&mut self, content: &str) {
        self.content = Some(content.to_owned());
    }

    pub fn has_pending_json(&self) -> bool {
        self.unzipped_json.is_some()
    }

    pub fn has_pending_manifest(&self) -> bool {
        self.zipped_files.is_some()
    }

    pub(crate) fn take_unzipped_json(&mut self) -> Option<Value> {
        self.unzipped_json.take()
    }

    pub(crate) fn take_zipped_files(&mut self) -> Option<BTreeMap<String, ZippedFile>> {
        self.zipped_files.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_descriptor_ignores_extra_fields() {
        let record = FileRecord::from_descriptor(&json!({
            "hash": "4b2b8a2b0b5e3c1b",
            "size": 2915040,
            "url": "https://example.org/MiSTer",
            "reboot": true
        }))
        .unwrap();

        assert_eq!(record, FileRecord::with_hash("4b2b8a2b0b5e3c1b"));
    }

    #[test]
    fn test_from_descriptor_with_manifest() {
        let record = FileRecord::from_descriptor(&json!({
            "hash": "z",
            "zipped_files": {"x": {"hash": "h1"}}
        }))
        .unwrap();

        assert_eq!(record, FileRecord::with_hash("z").zipped_files([("x", "h1")]));
        assert!(record.has_pending_manifest());
        assert!(!record.has_pending_json());
    }

    #[test]
    fn test_from_descriptor_wrong_hash_type() {
        assert!(FileRecord::from_descriptor(&json!({"hash": 12})).is_err());
    }

    #[test]
    fn test_set_content_keeps_hash() {
        let mut record = FileRecord::with_hash("h");
        record.set_content("hello");
        assert_eq!(record.hash(), Some("h"));
        assert_eq!(record.content(), Some("hello"));
    }
}
