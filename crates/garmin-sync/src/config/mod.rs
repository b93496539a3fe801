mod credentials;

pub use credentials::{CredentialStore, Credentials};

use crate::error::{GarminError, Result};
use std::path::{Path, PathBuf};

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = "garmin-sync";

/// File name of the recorded EPO request body
pub const POSTDATA_FILENAME: &str = "garmin-postdata";

/// Credentials file kept in the home directory
const CREDENTIALS_FILENAME: &str = ".garmin-sync.json";

/// Where removable media gets mounted on most Linux desktops
pub const DEFAULT_MEDIA_ROOT: &str = "/media";

/// Default Garmin domain
pub const DEFAULT_DOMAIN: &str = "garmin.com";

/// Vendor endpoint serving EPO data
pub const DEFAULT_EPO_URL: &str =
    "http://omt.garmin.com/Rce/ProtobufApi/EphemerisService/GetEphemerisData";

/// Get the configuration directory path
/// Returns ~/.config/garmin-sync on Unix, ~/Library/Application Support/garmin-sync on macOS
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(CONFIG_DIR_NAME))
        .ok_or_else(|| GarminError::config("Could not determine config directory"))
}

/// Default location of the credentials file
pub fn default_credentials_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(CREDENTIALS_FILENAME))
        .ok_or_else(|| GarminError::config("Could not determine home directory"))
}

/// Default location of the EPO request body.
///
/// A copy in the config directory wins; otherwise the one installed next to
/// the executable is used when present.
pub fn default_postdata_path() -> Result<PathBuf> {
    let configured = config_dir()?.join(POSTDATA_FILENAME);
    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    Ok(resolve_postdata_path(configured, bundled.as_deref()))
}

fn resolve_postdata_path(configured: PathBuf, exe_dir: Option<&Path>) -> PathBuf {
    if configured.exists() {
        return configured;
    }
    match exe_dir.map(|dir| dir.join(POSTDATA_FILENAME)) {
        Some(bundled) if bundled.is_file() => bundled,
        _ => configured,
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Everything a sync run needs to know about its environment.
///
/// Nothing downstream reads the process environment; `main` resolves these
/// values once from flags, env vars and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding per-user mount points
    pub media_root: PathBuf,
    /// Login name whose mount directory holds the device
    pub user: String,
    /// Obfuscated credentials file
    pub credentials_path: PathBuf,
    /// Recorded request body for the EPO endpoint
    pub postdata_path: PathBuf,
    pub epo_url: String,
    pub sso_base_url: String,
    pub connect_base_url: String,
    pub skip_epo: bool,
    pub skip_upload: bool,
}

impl Settings {
    /// Build settings for a user with default paths and endpoints
    pub fn new(user: impl Into<String>) -> Result<Self> {
        Ok(Self {
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            user: user.into(),
            credentials_path: default_credentials_path()?,
            postdata_path: default_postdata_path()?,
            epo_url: DEFAULT_EPO_URL.to_string(),
            sso_base_url: sso_base_url(DEFAULT_DOMAIN),
            connect_base_url: connect_base_url(DEFAULT_DOMAIN),
            skip_epo: false,
            skip_upload: false,
        })
    }

    /// Point the SSO and Connect endpoints at another Garmin domain
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.sso_base_url = sso_base_url(domain);
        self.connect_base_url = connect_base_url(domain);
        self
    }

    pub fn with_media_root(mut self, media_root: impl Into<PathBuf>) -> Self {
        self.media_root = media_root.into();
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    pub fn with_postdata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.postdata_path = path.into();
        self
    }
}

fn sso_base_url(domain: &str) -> String {
    format!("https://sso.{}", domain)
}

fn connect_base_url(domain: &str) -> String {
    format!("https://connect.{}", domain)
}
