use crate::config::POSTDATA_FILENAME;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for garmin-sync
#[derive(Error, Debug)]
pub enum GarminError {
    #[error("Garmin device not found at {}", .0.display())]
    DeviceNotFound(PathBuf),

    #[error("EPO file not found at {}", .0.display())]
    EphemerisNotFound(PathBuf),

    #[error("EPO request body not found at {}", .0.display())]
    PostdataNotFound(PathBuf),

    #[error("Failed to fetch EPO data: {0}")]
    EphemerisFetchFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Upload failed: {0}")]
    UploadTransportFailed(String),

    #[error("Credential store error: {0}")]
    Credentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GarminError>;

impl GarminError {
    /// Create an authentication error from a message
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Create an EPO fetch error from a message
    pub fn epo_fetch(msg: impl Into<String>) -> Self {
        Self::EphemerisFetchFailed(msg.into())
    }

    /// Create an upload error from a message
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::UploadTransportFailed(msg.into())
    }

    /// Create a credential store error from a message
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Render an error for the terminal, with a hint where one helps
pub fn format_user_error(err: &GarminError) -> String {
    match err {
        GarminError::DeviceNotFound(_) => {
            format!("{err}\nIs the watch plugged in and mounted? Use --media-root/--user to point elsewhere.")
        }
        GarminError::PostdataNotFound(_) => {
            format!(
                "{err}\nThis is the recorded request body ({POSTDATA_FILENAME}) the EPO service expects; it ships next to the garmin-sync binary.\n\
                 Copy it to this path, point --postdata or GARMIN_SYNC_POSTDATA at it, or pass --skip-epo to only upload activities."
            )
        }
        GarminError::AuthenticationFailed(_) => {
            format!("{err}\nCheck the stored credentials or pass --credentials to use another file.")
        }
        GarminError::Credentials(_) => {
            format!("{err}\nDelete the credentials file to be prompted again.")
        }
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GarminError::AuthenticationFailed("missing CASTGC cookie".to_string());
        assert_eq!(err.to_string(), "Authentication failed: missing CASTGC cookie");
    }

    #[test]
    fn test_device_not_found_includes_path() {
        let err = GarminError::DeviceNotFound(PathBuf::from("/media/alice/GARMIN"));
        assert!(err.to_string().contains("/media/alice/GARMIN"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(GarminError::auth("x"), GarminError::AuthenticationFailed(_)));
        assert!(matches!(GarminError::epo_fetch("x"), GarminError::EphemerisFetchFailed(_)));
        assert!(matches!(GarminError::upload("x"), GarminError::UploadTransportFailed(_)));
        assert!(matches!(GarminError::credentials("x"), GarminError::Credentials(_)));
        assert!(matches!(GarminError::config("x"), GarminError::Config(_)));
    }

    #[test]
    fn test_format_user_error_adds_hint() {
        let err = GarminError::DeviceNotFound(PathBuf::from("/media/bob/GARMIN"));
        let rendered = format_user_error(&err);
        assert!(rendered.starts_with("Garmin device not found"));
        assert!(rendered.contains("--media-root"));

        let err = GarminError::PostdataNotFound(PathBuf::from("/home/bob/.config/garmin-sync/garmin-postdata"));
        let rendered = format_user_error(&err);
        assert!(rendered.starts_with("EPO request body not found at /home/bob/.config/garmin-sync/garmin-postdata"));
        assert!(rendered.contains("--postdata"));
        assert!(rendered.contains("--skip-epo"));

        let plain = format_user_error(&GarminError::upload("connection reset"));
        assert_eq!(plain, "Upload failed: connection reset");
    }
}
