//! Username/password persistence for Garmin Connect.
//!
//! The password is base64 encoded before it hits disk. That keeps it from
//! being read over someone's shoulder and nothing more: anyone who can read
//! the file can recover the password.

use crate::error::{GarminError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Line width used by MIME base64, kept so older credential files stay byte-compatible
const BASE64_LINE_WIDTH: usize = 76;

/// A Garmin Connect login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// On-disk record. Unknown keys are carried through untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// File-backed store holding a single username and obfuscated password
pub struct CredentialStore {
    path: PathBuf,
    record: StoredRecord,
}

impl CredentialStore {
    /// Open the store at `path`, loading the record if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let record = if path.exists() {
            let json = fs::read_to_string(&path)?;
            serde_json::from_str(&json)?
        } else {
            StoredRecord::default()
        };

        Ok(Self { path, record })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when no username has been stored yet
    pub fn is_empty(&self) -> bool {
        self.record.username.is_none() && self.record.password.is_none()
    }

    /// Save a username and password, replacing any previous record
    pub fn store(&mut self, username: &str, password: &str) -> Result<()> {
        self.record.username = Some(username.to_string());
        self.record.password = Some(encode_password(password));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                super::ensure_dir(parent)?;
            }
        }

        let json = serde_json::to_string(&self.record)?;
        fs::write(&self.path, json)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Return the stored credentials with the password decoded
    pub fn get(&self) -> Result<Credentials> {
        let username = self.record.username.clone().ok_or_else(|| {
            GarminError::credentials(format!("no username stored in {}", self.path.display()))
        })?;
        let encoded = self.record.password.as_deref().ok_or_else(|| {
            GarminError::credentials(format!("no password stored in {}", self.path.display()))
        })?;

        Ok(Credentials {
            username,
            password: decode_password(encoded)?,
        })
    }
}

/// Base64 with a newline after every 76 columns and at the end
fn encode_password(password: &str) -> String {
    let encoded = STANDARD.encode(password.as_bytes());
    if encoded.is_empty() {
        return encoded;
    }

    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_WIDTH + 1);
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % BASE64_LINE_WIDTH == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out.push('\n');
    out
}

fn decode_password(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| GarminError::credentials(format!("stored password is not valid base64: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|_| GarminError::credentials("stored password is not valid UTF-8"))
}
