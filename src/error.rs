//! Error taxonomy for a pipeline run.
//!
//! Every variant is fatal for the run that raised it; nothing is retried here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The remote rejected the credentials (HTTP 401/403).
    #[error("Auth failed ({status}) for {url}. Check API key or permissions.")]
    Auth { status: u16, url: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Archive format error: {0}")]
    ArchiveFormat(String),
    /// A buffer did not parse as a GTFS-Realtime `FeedMessage`.
    #[error("Protobuf decode failed for {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: prost::DecodeError,
    },
    #[error("Unsupported output: {0}")]
    UnsupportedOutput(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest renders the request URL, which may carry the api key.
        PipelineError::Network(err.without_url().to_string())
    }
}

impl From<zip::result::ZipError> for PipelineError {
    fn from(err: zip::result::ZipError) -> Self {
        PipelineError::ArchiveFormat(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_display_names_status() {
        let err = PipelineError::Auth {
            status: 403,
            url: "https://example.com/feed?api_key=REDACTED".into(),
        };
        assert_eq!(
            err.to_string(),
            "Auth failed (403) for https://example.com/feed?api_key=REDACTED. Check API key or permissions."
        );
    }

    #[test]
    fn test_decode_error_carries_buffer_name() {
        let bad_bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        let source = <crate::gtfs_rt::FeedMessage as prost::Message>::decode(bad_bytes).unwrap_err();
        let err = PipelineError::Decode {
            name: "trip_updates.pb".into(),
            source,
        };
        assert!(err.to_string().starts_with("Protobuf decode failed for trip_updates.pb"));
    }

    #[test]
    fn test_zip_error_maps_to_archive_format() {
        let err: PipelineError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, PipelineError::ArchiveFormat(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
