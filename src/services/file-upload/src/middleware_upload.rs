use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{error::FileUploadError, models::UploadedFiles, services::UploadHandler};

#[async_trait]
impl<S> FromRequestParts<S> for UploadedFiles
where
    S: Send + Sync,
{
    type Rejection = FileUploadError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UploadedFiles>()
            .cloned()
            .ok_or(FileUploadError::MissingUploads)
    }
}

/// Upload middleware.
///
/// Install with `middleware::from_fn_with_state(handler, upload_middleware)`.
/// Stores the files of a multipart request before the route handler runs; the
/// route handler reads them through the [`UploadedFiles`] extractor. A
/// rejected upload short-circuits with the error response.
pub async fn upload_middleware(
    State(handler): State<UploadHandler>,
    request: Request,
    next: Next,
) -> Result<Response, FileUploadError> {
    let path = request.uri().path().to_string();
    let request = handler.handle(request).await?;

    if let Some(uploads) = get_uploaded_files(&request) {
        debug!("Upload middleware stored {} files for {}", uploads.len(), path);
    }

    Ok(next.run(request).await)
}

/// Helper to get the stored files from a request
pub fn get_uploaded_files(request: &Request) -> Option<&UploadedFiles> {
    request.extensions().get::<UploadedFiles>()
}
