//! Locating a mounted Garmin device and the files on it

use crate::error::{GarminError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Volume label the device mounts under
const MOUNT_DIR_NAME: &str = "GARMIN";

/// EPO file location relative to the mount root
const EPO_RELATIVE_PATH: &str = "Garmin/GPS/EPO.BIN";

/// Activity directory relative to the mount root
const ACTIVITY_RELATIVE_PATH: &str = "Garmin/Activity";

/// Resolves the mount point of a device for a given user
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    media_root: PathBuf,
    user: String,
}

impl DeviceLocator {
    pub fn new(media_root: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            media_root: media_root.into(),
            user: user.into(),
        }
    }

    /// Candidate mount path: `<media_root>/<user>/GARMIN`
    pub fn mount_path(&self) -> PathBuf {
        self.media_root.join(&self.user).join(MOUNT_DIR_NAME)
    }

    /// Find the mounted device
    pub fn locate(&self) -> Result<Device> {
        let root = self.mount_path();
        if !root.exists() {
            return Err(GarminError::DeviceNotFound(root));
        }

        tracing::info!(path = %root.display(), "Found Garmin device");
        Ok(Device { root })
    }
}

/// A mounted Garmin device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    root: PathBuf,
}

impl Device {
    /// Wrap an already-known mount root without checking it
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the EPO file, which must already exist on the device
    pub fn ephemeris_path(&self) -> Result<PathBuf> {
        let path = self.root.join(EPO_RELATIVE_PATH);
        if !path.exists() {
            return Err(GarminError::EphemerisNotFound(path));
        }
        Ok(path)
    }

    pub fn activity_dir(&self) -> PathBuf {
        self.root.join(ACTIVITY_RELATIVE_PATH)
    }

    /// Activity files in directory listing order.
    ///
    /// Symlinks count when they point at a regular file. A missing activity
    /// directory yields an empty list.
    pub fn activities(&self) -> Result<Vec<PathBuf>> {
        let dir = self.activity_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %dir.display(), "Activity directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }

        tracing::debug!(count = files.len(), "Listed activity files");
        Ok(files)
    }
}
