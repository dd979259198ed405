use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use thiserror::Error;

/// Result type alias for upload operations
pub type FileUploadResult<T> = Result<T, FileUploadError>;

/// Status reported for every rejected upload.
///
/// All constraint violations share one status; the variant carries the kind.
pub const REJECTION_STATUS: StatusCode = StatusCode::NOT_FOUND;

/// Main error type for the upload handler
#[derive(Error, Debug)]
pub enum FileUploadError {
    // Startup errors
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    // Constraint violations
    #[error("Maximum {max} files are allowed")]
    TooManyFiles { max: usize },

    #[error("{}", unsupported_type_message(.allowed))]
    UnsupportedType {
        mime_type: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {file_name} exceeds {max_size} bytes")]
    FileTooLarge { file_name: String, max_size: u64 },

    #[error("Field value too long: {field} exceeds {max_size} bytes")]
    FieldTooLarge { field: String, max_size: u64 },

    // Transport errors
    #[error("Malformed multipart body: {message}")]
    MalformedMultipart { message: String },

    #[error("Request body too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Upload middleware is not installed on this route")]
    MissingUploads,
}

fn unsupported_type_message(allowed: &[String]) -> String {
    if allowed.is_empty() {
        "No file types are allowed".to_string()
    } else {
        format!("Only {} are allowed", allowed.join(", "))
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Numeric status hint
    pub status_hint: u16,
    /// Additional error details
    pub details: Option<serde_json::Value>,
    /// Timestamp of the error
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl FileUploadError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            FileUploadError::TooManyFiles { .. }
            | FileUploadError::UnsupportedType { .. }
            | FileUploadError::FileTooLarge { .. }
            | FileUploadError::FieldTooLarge { .. } => REJECTION_STATUS,

            FileUploadError::MalformedMultipart { .. } => StatusCode::BAD_REQUEST,
            FileUploadError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            FileUploadError::ConfigurationError { .. }
            | FileUploadError::IoError { .. }
            | FileUploadError::MissingUploads => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Numeric status hint handed to the host's error path
    pub fn status_hint(&self) -> u16 {
        self.status_code().as_u16()
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            FileUploadError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            FileUploadError::TooManyFiles { .. } => "TOO_MANY_FILES",
            FileUploadError::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            FileUploadError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            FileUploadError::FieldTooLarge { .. } => "FIELD_TOO_LARGE",
            FileUploadError::MalformedMultipart { .. } => "MALFORMED_MULTIPART",
            FileUploadError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            FileUploadError::IoError { .. } => "IO_ERROR",
            FileUploadError::MissingUploads => "MISSING_UPLOADS",
        }
    }

    /// True for violations of the configured upload constraints
    pub fn is_rejection(&self) -> bool {
        self.status_code() == REJECTION_STATUS
    }

    /// Create error response for API
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
            status_hint: self.status_hint(),
            details: self.get_details(),
            timestamp: chrono::Utc::now(),
        }
    }

    fn get_details(&self) -> Option<serde_json::Value> {
        match self {
            FileUploadError::TooManyFiles { max } => Some(serde_json::json!({
                "max_file_count": max
            })),
            FileUploadError::UnsupportedType { mime_type, allowed } => Some(serde_json::json!({
                "mime_type": mime_type,
                "allowed_types": allowed
            })),
            FileUploadError::FileTooLarge {
                file_name,
                max_size,
            } => Some(serde_json::json!({
                "file_name": file_name,
                "max_size": max_size
            })),
            FileUploadError::FieldTooLarge { field, max_size } => Some(serde_json::json!({
                "field": field,
                "max_size": max_size
            })),
            _ => None,
        }
    }
}

impl IntoResponse for FileUploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl From<std::io::Error> for FileUploadError {
    fn from(err: std::io::Error) -> Self {
        FileUploadError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<multer::Error> for FileUploadError {
    fn from(err: multer::Error) -> Self {
        if let multer::Error::StreamReadFailed(source) = &err {
            if exceeds_body_limit(source.as_ref()) {
                return FileUploadError::PayloadTooLarge {
                    message: err.to_string(),
                };
            }
        }

        FileUploadError::MalformedMultipart {
            message: err.to_string(),
        }
    }
}

/// True when a body read failed on the host's request size limit
fn exceeds_body_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}

impl FileUploadError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn unsupported_type<S: Into<String>>(mime_type: S, allowed: Vec<String>) -> Self {
        Self::UnsupportedType {
            mime_type: mime_type.into(),
            allowed,
        }
    }

    pub fn file_too_large<S: Into<String>>(file_name: S, max_size: u64) -> Self {
        Self::FileTooLarge {
            file_name: file_name.into(),
            max_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_errors_share_status() {
        let errors = [
            FileUploadError::TooManyFiles { max: 2 },
            FileUploadError::unsupported_type("text/plain", vec!["image/png".to_string()]),
            FileUploadError::file_too_large("big.bin", 500),
            FileUploadError::FieldTooLarge {
                field: "note".to_string(),
                max_size: 10,
            },
        ];

        for error in &errors {
            assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
            assert_eq!(error.status_hint(), 404);
            assert!(error.is_rejection());
        }
    }

    #[test]
    fn test_other_error_statuses() {
        assert_eq!(
            FileUploadError::MalformedMultipart {
                message: "boundary".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FileUploadError::configuration("denied").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!FileUploadError::MissingUploads.is_rejection());

        let too_large = FileUploadError::PayloadTooLarge {
            message: "length limit exceeded".to_string(),
        };
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.error_code(), "PAYLOAD_TOO_LARGE");
        assert!(!too_large.is_rejection());
    }

    #[test]
    fn test_stream_failure_without_limit_is_malformed() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let error = FileUploadError::from(multer::Error::StreamReadFailed(Box::new(io)));

        assert_eq!(error.error_code(), "MALFORMED_MULTIPART");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            FileUploadError::TooManyFiles { max: 1 }.error_code(),
            "TOO_MANY_FILES"
        );
        assert_eq!(
            FileUploadError::unsupported_type("a/b", vec![]).error_code(),
            "UNSUPPORTED_TYPE"
        );
        assert_eq!(
            FileUploadError::file_too_large("x", 1).error_code(),
            "FILE_TOO_LARGE"
        );
        assert_eq!(
            FileUploadError::configuration("x").error_code(),
            "CONFIGURATION_ERROR"
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FileUploadError::TooManyFiles { max: 2 }.to_string(),
            "Maximum 2 files are allowed"
        );
        assert_eq!(
            FileUploadError::unsupported_type(
                "text/plain",
                vec!["image/png".to_string(), "image/jpeg".to_string()]
            )
            .to_string(),
            "Only image/png, image/jpeg are allowed"
        );
        assert_eq!(
            FileUploadError::unsupported_type("text/plain", vec![]).to_string(),
            "No file types are allowed"
        );
    }

    #[test]
    fn test_error_response() {
        let error = FileUploadError::file_too_large("video.mp4", 500);
        let response = error.to_error_response();

        assert_eq!(response.error, "FILE_TOO_LARGE");
        assert_eq!(response.status_hint, 404);
        assert!(response.message.contains("video.mp4"));
        assert!(response.details.is_some());
    }
}
