//! Pre-configured multipart upload handler for axum servers.
//!
//! [`create_upload_handler`] is called once at startup. It creates the
//! destination directory and returns an [`UploadHandler`] that is installed as
//! middleware:
//!
//! ```no_run
//! use axum::{middleware, routing::post, Router};
//! use file_upload::{create_upload_handler, upload_middleware, UploadConfig, UploadedFiles};
//!
//! # fn main() -> Result<(), file_upload::FileUploadError> {
//! let handler = create_upload_handler(
//!     UploadConfig::new(["image/png", "image/jpeg"])
//!         .with_destination("./uploads/avatars")
//!         .with_max_file_size(1024 * 1024)
//!         .with_max_file_count(1),
//! )?;
//!
//! let app: Router = Router::new()
//!     .route("/avatar", post(|uploads: UploadedFiles| async move { uploads.len().to_string() }))
//!     .route_layer(middleware::from_fn_with_state(handler, upload_middleware));
//! # Ok(())
//! # }
//! ```
//!
//! Each file part is written to `<destination>/<stem>-<epoch-ms><ext>` where the
//! stem is the lowercased original stem with spaces replaced by hyphens and the
//! extension is kept as sent.

pub mod config_types;
pub mod error;
pub mod handlers;
pub mod middleware_upload;
pub mod models;
pub mod services;
pub mod utils;


pub use config_types::{UploadConfig, DEFAULT_DESTINATION, DEFAULT_MAX_FILE_SIZE};
pub use error::{FileUploadError, FileUploadResult};
pub use middleware_upload::upload_middleware;
pub use models::{StoredFile, UploadedFiles};
pub use services::UploadHandler;
pub use utils::time::{Clock, SystemClock};

/// Create an upload handler from `config`.
///
/// Creates the destination directory and any missing ancestors before
/// returning. Fails with [`FileUploadError::ConfigurationError`] when the
/// directory cannot be created.
pub fn create_upload_handler(config: UploadConfig) -> FileUploadResult<UploadHandler> {
    UploadHandler::new(config)
}
