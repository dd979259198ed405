//! Utility functions for the upload handler
//!
//! Filename generation, MIME type filtering and the clock used to timestamp
//! stored files.

/// Path and filename utilities
pub mod path {
    /// Final component of a client-supplied filename.
    ///
    /// Clients may send either separator, so both are stripped.
    pub fn base_name(filename: &str) -> &str {
        filename
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(filename)
    }

    /// Split a filename into stem and extension (extension keeps its dot).
    ///
    /// A dot inside a leading run of dots does not start an extension, so
    /// `.env` has no extension while `archive.tar.gz` has `.gz`.
    pub fn split_extension(filename: &str) -> (&str, &str) {
        match filename.rfind('.') {
            Some(index) if filename[..index].chars().any(|c| c != '.') => {
                filename.split_at(index)
            }
            _ => (filename, ""),
        }
    }

    /// Name under which an upload is stored.
    ///
    /// The stem is lowercased with spaces turned into hyphens, followed by a
    /// hyphen and the epoch milliseconds. The extension is appended unchanged.
    pub fn storage_filename(original_name: &str, epoch_millis: i64) -> String {
        let (stem, extension) = split_extension(base_name(original_name));
        let stem = stem.to_lowercase().replace(' ', "-");
        format!("{}-{}{}", stem, epoch_millis, extension)
    }
}

/// MIME type utilities
pub mod file_type {
    /// Fallback type for parts that do not declare one
    pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

    /// Exact-match lookup. An empty allow-list accepts nothing.
    pub fn is_allowed_file_type(mime_type: &str, allowed_types: &[String]) -> bool {
        allowed_types.iter().any(|allowed| allowed == mime_type)
    }

    /// Whether a `Content-Type` header value announces a multipart form
    pub fn is_multipart_form(content_type: &str) -> bool {
        content_type
            .parse::<mime::Mime>()
            .map(|mime| mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA)
            .unwrap_or(false)
    }
}

/// Time utilities
pub mod time {
    use chrono::Utc;
    use std::fmt::Debug;

    /// Source of the timestamp embedded in stored filenames
    pub trait Clock: Send + Sync + Debug {
        /// Milliseconds since the Unix epoch
        fn now_millis(&self) -> i64;
    }

    /// Wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now_millis(&self) -> i64 {
            Utc::now().timestamp_millis()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_storage_filename() {
        assert_eq!(
            path::storage_filename("My Photo.JPG", 1_700_000_000_000),
            "my-photo-1700000000000.JPG"
        );
        assert_eq!(
            path::storage_filename("Vacation Pic.png", 42),
            "vacation-pic-42.png"
        );
    }

    #[test]
    fn test_storage_filename_only_spaces_become_hyphens() {
        assert_eq!(
            path::storage_filename("Tax  Return_2023 Final.PDF", 1),
            "tax--return_2023-final-1.PDF"
        );
        assert_eq!(
            path::storage_filename("tab\tname.txt", 1),
            "tab\tname-1.txt"
        );
    }

    #[test]
    fn test_storage_filename_extension_edge_cases() {
        assert_eq!(path::storage_filename("README", 7), "readme-7");
        assert_eq!(path::storage_filename(".env", 7), ".env-7");
        assert_eq!(
            path::storage_filename("Archive.Tar.GZ", 7),
            "archive.tar-7.GZ"
        );
        assert_eq!(path::storage_filename("notes.", 7), "notes-7.");
        assert_eq!(path::storage_filename("", 7), "-7");
    }

    #[test]
    fn test_storage_filename_strips_directories() {
        assert_eq!(
            path::storage_filename("../../etc/Passwd.txt", 3),
            "passwd-3.txt"
        );
        assert_eq!(
            path::storage_filename("C:\\Users\\Me\\Cat Pic.jpeg", 3),
            "cat-pic-3.jpeg"
        );
    }

    #[test]
    fn test_storage_filename_differs_per_millisecond() {
        let first = path::storage_filename("Report.pdf", 1_000);
        let second = path::storage_filename("Report.pdf", 1_001);
        assert_ne!(first, second);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(path::split_extension("photo.JPG"), ("photo", ".JPG"));
        assert_eq!(path::split_extension("a.b.c"), ("a.b", ".c"));
        assert_eq!(path::split_extension("..hidden"), ("..hidden", ""));
        assert_eq!(path::split_extension("plain"), ("plain", ""));
    }

    #[test]
    fn test_allowed_file_types() {
        let allowed = vec!["image/png".to_string(), "image/jpeg".to_string()];

        assert!(file_type::is_allowed_file_type("image/png", &allowed));
        assert!(!file_type::is_allowed_file_type("image/gif", &allowed));
        assert!(!file_type::is_allowed_file_type("image/*", &allowed));

        // Empty list allows nothing
        assert!(!file_type::is_allowed_file_type("image/png", &[]));
    }

    #[test]
    fn test_multipart_detection() {
        assert!(file_type::is_multipart_form(
            "multipart/form-data; boundary=abc"
        ));
        assert!(!file_type::is_multipart_form("application/json"));
        assert!(!file_type::is_multipart_form("multipart/mixed; boundary=x"));
        assert!(!file_type::is_multipart_form("not a mime"));
    }

    #[test]
    fn test_system_clock_is_epoch_millis() {
        use time::Clock;

        let millis = time::SystemClock.now_millis();
        // After 2020-01-01 in milliseconds
        assert!(millis > 1_577_836_800_000);
    }
}
