use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Metadata of one file part as announced by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Multipart field name
    pub field_name: String,
    /// Filename sent by the client
    pub original_name: String,
    /// Declared MIME type
    pub mime_type: String,
}

/// A file accepted and written to the destination directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Multipart field name
    pub field_name: String,
    /// Filename sent by the client
    pub original_name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Directory the file was written to
    pub destination: PathBuf,
    /// Generated filename inside `destination`
    pub file_name: String,
    /// Full path of the stored file
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Everything the upload middleware extracted from one request.
///
/// Inserted into the request extensions before downstream handlers run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFiles {
    /// Stored files in arrival order
    pub files: Vec<StoredFile>,
    /// Non-file form fields
    pub fields: HashMap<String, String>,
}

impl UploadedFiles {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Total bytes written for this request
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|file| file.size_bytes).sum()
    }
}
