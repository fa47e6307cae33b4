//! Upload error types.

/// Errors produced while uploading to remote storage.
///
/// The `Display` text of every variant is meant to be shown to the user as is.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to refresh the access token: {0}. Please check your refresh token and app credentials.")]
    AuthRefresh(String),

    #[error("No refresh token available. Please update your storage configuration.")]
    NoRefreshToken,

    #[error("Authentication failed. The access token may be expired or invalid.")]
    Authentication,

    #[error("Access forbidden. The token may not have sufficient permissions.")]
    Permission,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimit,

    #[error("Storage quota exceeded. Please free up space or upgrade your plan.")]
    QuotaExceeded,

    #[error("Network error ({0}). Please check your internet connection and try again.")]
    Network(String),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("Failed to upload chunk at offset {offset}: {source}")]
    ChunkTransfer {
        offset: u64,
        #[source]
        source: Box<UploadError>,
    },

    #[error("Could not read upload payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("{0}")]
    Other(String),
}

impl UploadError {
    /// Maps an HTTP status to the taxonomy. `body` is kept for statuses
    /// without a dedicated variant.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Permission,
            429 => Self::RateLimit,
            507 => Self::QuotaExceeded,
            _ => Self::Other(format!("API error {status}: {body}")),
        }
    }

    /// Errors worth another attempt of the same operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_) | Self::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::UploadError;

    #[test]
    fn status_mapping() {
        assert!(matches!(UploadError::from_status(401, ""), UploadError::Authentication));
        assert!(matches!(UploadError::from_status(403, ""), UploadError::Permission));
        assert!(matches!(UploadError::from_status(429, ""), UploadError::RateLimit));
        assert!(matches!(UploadError::from_status(507, ""), UploadError::QuotaExceeded));

        let e = UploadError::from_status(409, "path/conflict");
        assert_eq!(e.to_string(), "API error 409: path/conflict");
        assert!(e.is_transient());
    }

    #[test]
    fn only_transport_failures_are_transient() {
        assert!(UploadError::Network("reset".into()).is_transient());
        assert!(UploadError::Timeout("upload").is_transient());
        assert!(!UploadError::Authentication.is_transient());
        assert!(!UploadError::RateLimit.is_transient());
        assert!(!UploadError::NoRefreshToken.is_transient());
    }

    #[test]
    fn unrecognized_message_is_kept() {
        let e = UploadError::Other("something odd".into());
        assert_eq!(e.to_string(), "something odd");
    }
}
