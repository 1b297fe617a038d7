use crate::error::BlobError;

/// Metadata for a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub key: String,
    pub size: u64,
}

/// Hierarchical blob storage.
///
/// Keys are `/`-separated paths such as `EQU-0000001/Manual/manual.pdf`.
/// Directories are first-class: they can exist without any blob inside,
/// which is how freshly provisioned equipment folders look.
pub trait BlobStore: Send + Sync {
    /// Store a blob, creating parent directories. Overwrites an existing blob.
    fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError>;

    /// Retrieve a blob. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;

    /// Create a directory and its parents. No-op if it already exists.
    fn create_dir(&self, key: &str) -> Result<(), BlobError>;

    /// Whether `key` names an existing directory.
    fn dir_exists(&self, key: &str) -> Result<bool, BlobError>;

    /// Names of the immediate subdirectories of `key` ("" for the root), sorted.
    fn children(&self, key: &str) -> Result<Vec<String>, BlobError>;

    /// Blobs under the directory `key`, recursively, sorted by key.
    fn list(&self, key: &str) -> Result<Vec<BlobMeta>, BlobError>;
}
