use std::collections::HashMap;

use cumulo_core::time::DateTime;

/// A blob container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobContainer {
    /// Container name.
    pub name: String,
    /// Full URL of the container.
    pub url: String,
    /// Version marker from the service.
    pub etag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime>,
    /// User metadata attached to the container.
    pub metadata: HashMap<String, String>,
}

/// A blob within a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blob {
    /// Blob name, which may contain `/` separators.
    pub name: String,
    /// Name of the owning container.
    pub container: String,
    /// MIME content type.
    pub content_type: Option<String>,
    /// Size of the content in bytes.
    pub content_length: Option<u64>,
    /// Version marker from the service.
    pub etag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime>,
}
