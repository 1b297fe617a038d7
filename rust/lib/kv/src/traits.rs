use crate::error::KVError;

/// Namespaced key-value storage.
///
/// Keys are slash-separated and prefixed by the owning module:
/// `access/sessions/<sid>`, `task/assignments/<id>`. Values are opaque bytes;
/// modules store serde_json documents.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Insert or overwrite a key.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. No-op if the key does not exist.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// All (key, value) pairs whose key starts with `prefix`, sorted by key.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}
