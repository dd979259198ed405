use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory used when no destination is configured
pub const DEFAULT_DESTINATION: &str = "./uploads";

/// Per-file size limit used when none is configured
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_000;

/// Configuration of a single upload handler.
///
/// Immutable once handed to [`crate::create_upload_handler`]; the handler keeps
/// it behind an `Arc` and only ever reads from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Where accepted files are written. Falls back to [`DEFAULT_DESTINATION`].
    #[serde(default)]
    pub destination_directory: Option<PathBuf>,
    /// Maximum size of a single file part in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Maximum number of file parts per request (unlimited when absent)
    #[serde(default)]
    pub max_file_count: Option<usize>,
    /// Accepted MIME types. An empty list accepts nothing.
    pub allowed_mime_types: Vec<String>,
    /// Maximum size of a non-file text field in bytes
    #[serde(default = "default_max_field_size")]
    pub max_field_size_bytes: u64,
}

impl UploadConfig {
    pub fn new<I, S>(allowed_mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            destination_directory: None,
            max_file_size_bytes: default_max_file_size(),
            max_file_count: None,
            allowed_mime_types: allowed_mime_types.into_iter().map(Into::into).collect(),
            max_field_size_bytes: default_max_field_size(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination_directory = Some(destination.into());
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    pub fn with_max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = Some(count);
        self
    }

    pub fn with_max_field_size(mut self, bytes: u64) -> Self {
        self.max_field_size_bytes = bytes;
        self
    }

    /// Destination directory with the default applied
    pub fn destination(&self) -> &Path {
        self.destination_directory
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_DESTINATION))
    }
}

/// Configuration of the standalone upload server binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload handler configuration
    pub upload: UploadConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON logging
    #[serde(default = "default_false")]
    pub json_format: bool,
}

// Default value functions

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_field_size() -> u64 {
    1024 * 1024 // 1MB
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8085
}

fn default_max_request_size() -> usize {
    100 * 1024 * 1024 // 100MB
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_request_size: default_max_request_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: default_false(),
        }
    }
}
