//! Upload handler and the disk storage it writes through

use axum::{
    body::Body,
    extract::Request,
    http::header,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::{
    config_types::UploadConfig,
    error::{FileUploadError, FileUploadResult},
    models::{FilePart, StoredFile, UploadedFiles},
    utils::{
        file_type,
        path::storage_filename,
        time::{Clock, SystemClock},
    },
};

/// Prefix of in-flight files inside the destination directory
pub const TEMP_UPLOAD_PREFIX: &str = ".upload-";
/// Suffix of in-flight files inside the destination directory
pub const TEMP_UPLOAD_SUFFIX: &str = ".part";

/// Local disk storage rooted at the destination directory
#[derive(Debug)]
pub struct DiskStorage {
    destination: PathBuf,
}

impl DiskStorage {
    /// Create the destination directory (and missing ancestors)
    pub fn new(destination: &Path) -> FileUploadResult<Self> {
        std::fs::create_dir_all(destination).map_err(|e| {
            FileUploadError::configuration(format!(
                "cannot create upload directory {}: {}",
                destination.display(),
                e
            ))
        })?;

        Ok(Self {
            destination: destination.to_path_buf(),
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Stream a file part to `destination/file_name`.
    ///
    /// Bytes go to a temporary file first and are renamed into place once the
    /// part is complete. The temporary file is deleted when this future fails
    /// or is dropped.
    pub async fn write_part(
        &self,
        mut field: multer::Field<'static>,
        part: &FilePart,
        file_name: String,
        max_size: u64,
    ) -> FileUploadResult<StoredFile> {
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(TEMP_UPLOAD_PREFIX)
            .suffix(TEMP_UPLOAD_SUFFIX)
            .tempfile_in(&self.destination)?
            .into_parts();
        let mut file = fs::File::from_std(file);

        let mut size_bytes: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size_bytes += chunk.len() as u64;
            if size_bytes > max_size {
                return Err(FileUploadError::file_too_large(
                    &part.original_name,
                    max_size,
                ));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let path = self.destination.join(&file_name);
        temp_path
            .persist(&path)
            .map_err(|e| FileUploadError::from(e.error))?;

        Ok(StoredFile {
            field_name: part.field_name.clone(),
            original_name: part.original_name.clone(),
            mime_type: part.mime_type.clone(),
            destination: self.destination.clone(),
            file_name,
            path,
            size_bytes,
        })
    }
}

/// Pre-configured upload handler.
///
/// Cheap to clone; all clones share the same read-only configuration.
#[derive(Debug, Clone)]
pub struct UploadHandler {
    config: Arc<UploadConfig>,
    storage: Arc<DiskStorage>,
    clock: Arc<dyn Clock>,
}

impl UploadHandler {
    /// Build a handler using the wall clock
    pub fn new(config: UploadConfig) -> FileUploadResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a handler with a custom timestamp source
    pub fn with_clock(config: UploadConfig, clock: Arc<dyn Clock>) -> FileUploadResult<Self> {
        let storage = DiskStorage::new(config.destination())?;

        info!(
            destination = %storage.destination().display(),
            max_file_size = config.max_file_size_bytes,
            max_file_count = ?config.max_file_count,
            allowed_types = ?config.allowed_mime_types,
            "Upload handler ready"
        );

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            clock,
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn destination(&self) -> &Path {
        self.storage.destination()
    }

    /// Consume the multipart body of `request` and attach the result.
    ///
    /// Requests that are not `multipart/form-data` pass through unchanged with
    /// an empty [`UploadedFiles`]. Otherwise the returned request has an empty
    /// body and carries the stored files in its extensions.
    pub async fn handle(&self, request: Request) -> FileUploadResult<Request> {
        let (mut parts, body) = request.into_parts();

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let (uploads, body) = if file_type::is_multipart_form(&content_type) {
            let boundary = multer::parse_boundary(&content_type)?;
            let multipart = multer::Multipart::new(body.into_data_stream(), boundary);
            (self.receive(multipart).await?, Body::empty())
        } else {
            (UploadedFiles::default(), body)
        };

        parts.extensions.insert(uploads);
        Ok(Request::from_parts(parts, body))
    }

    /// Store every file part of `multipart`.
    ///
    /// On the first violation the files already stored for this request are
    /// removed and that violation is returned. The same happens when this
    /// future is dropped before it completes.
    pub async fn receive(
        &self,
        mut multipart: multer::Multipart<'static>,
    ) -> FileUploadResult<UploadedFiles> {
        let mut pending = PendingUploads::default();

        match self.receive_parts(&mut multipart, &mut pending.uploads).await {
            Ok(()) => {
                let uploads = pending.keep();
                debug!(
                    files = uploads.len(),
                    bytes = uploads.total_size(),
                    "Multipart upload stored"
                );
                Ok(uploads)
            }
            Err(error) => {
                debug!(
                    error = %error,
                    discarded = pending.uploads.len(),
                    "Multipart upload rejected"
                );
                Err(error)
            }
        }
    }

    async fn receive_parts(
        &self,
        multipart: &mut multer::Multipart<'static>,
        uploads: &mut UploadedFiles,
    ) -> FileUploadResult<()> {
        let mut file_count = 0usize;

        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();

            let Some(original_name) = field.file_name().map(str::to_string) else {
                let value = self.read_text_field(field, &field_name).await?;
                uploads.fields.insert(field_name, value);
                continue;
            };

            file_count += 1;
            let part = FilePart {
                field_name,
                original_name,
                mime_type: field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_else(|| file_type::DEFAULT_MIME_TYPE.to_string()),
            };
            let file_name = storage_filename(&part.original_name, self.clock.now_millis());

            self.check_part(&part, file_count)?;

            let stored = self
                .storage
                .write_part(field, &part, file_name, self.config.max_file_size_bytes)
                .await?;

            debug!(
                field = %stored.field_name,
                original = %stored.original_name,
                path = %stored.path.display(),
                size = stored.size_bytes,
                "Stored uploaded file"
            );
            uploads.files.push(stored);
        }

        Ok(())
    }

    /// Count and type checks, run before any byte of the part is read
    fn check_part(&self, part: &FilePart, file_count: usize) -> FileUploadResult<()> {
        if let Some(max) = self.config.max_file_count {
            if file_count > max {
                return Err(FileUploadError::TooManyFiles { max });
            }
        }

        if !file_type::is_allowed_file_type(&part.mime_type, &self.config.allowed_mime_types) {
            return Err(FileUploadError::unsupported_type(
                &part.mime_type,
                self.config.allowed_mime_types.clone(),
            ));
        }

        Ok(())
    }

    async fn read_text_field(
        &self,
        mut field: multer::Field<'static>,
        name: &str,
    ) -> FileUploadResult<String> {
        let max_size = self.config.max_field_size_bytes;
        let mut value = Vec::new();

        while let Some(chunk) = field.chunk().await? {
            if (value.len() + chunk.len()) as u64 > max_size {
                return Err(FileUploadError::FieldTooLarge {
                    field: name.to_string(),
                    max_size,
                });
            }
            value.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&value).into_owned())
    }
}

/// Files stored for a request that has not completed yet.
///
/// Dropping it removes every stored file unless [`PendingUploads::keep`] was
/// called first.
#[derive(Debug, Default)]
struct PendingUploads {
    uploads: UploadedFiles,
    kept: bool,
}

impl PendingUploads {
    fn keep(mut self) -> UploadedFiles {
        self.kept = true;
        std::mem::take(&mut self.uploads)
    }
}

impl Drop for PendingUploads {
    fn drop(&mut self) {
        if self.kept {
            return;
        }

        for file in &self.uploads.files {
            if let Err(e) = std::fs::remove_file(&file.path) {
                warn!(
                    path = %file.path.display(),
                    error = %e,
                    "Failed to remove file of rejected upload"
                );
            }
        }
    }
}
