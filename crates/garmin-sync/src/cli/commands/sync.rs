//! The sync command: refresh EPO, then upload every activity on the device

use std::path::PathBuf;

use crate::client::{write_epo, ConnectClient, EpoClient};
use crate::config::{CredentialStore, Settings};
use crate::device::DeviceLocator;
use crate::error::{GarminError, Result};
use crate::models::UploadReport;

use super::auth::resolve_credentials;

/// EPO file written during a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpoUpdate {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Result of uploading one activity file
#[derive(Debug)]
pub struct ActivityOutcome {
    pub path: PathBuf,
    pub result: Result<UploadReport>,
}

/// Everything a sync run did
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub epo: Option<EpoUpdate>,
    pub activities: Vec<ActivityOutcome>,
}

impl SyncSummary {
    /// Number of activity uploads that raised an error
    pub fn failed_uploads(&self) -> usize {
        self.activities.iter().filter(|a| a.result.is_err()).count()
    }
}

/// Run a full sync.
///
/// Locating the device, fetching EPO data and logging in are fatal. Each
/// upload is independent: a failed one is recorded and the next is tried.
pub async fn run(settings: &Settings) -> Result<SyncSummary> {
    let device = DeviceLocator::new(&settings.media_root, &settings.user).locate()?;
    let mut summary = SyncSummary::default();

    if settings.skip_epo {
        tracing::info!("Skipping EPO update");
    } else {
        let epo_path = device.ephemeris_path()?;
        let client = EpoClient::from_postdata_file(&settings.epo_url, &settings.postdata_path)?;
        let data = client.fetch_and_repack().await?;
        write_epo(&epo_path, &data).await?;
        summary.epo = Some(EpoUpdate {
            path: epo_path,
            bytes: data.len(),
        });
    }

    if settings.skip_upload {
        tracing::info!("Skipping activity upload");
        return Ok(summary);
    }

    let activities = device.activities()?;
    if activities.is_empty() {
        tracing::info!("No activities to upload");
        return Ok(summary);
    }

    let mut store = CredentialStore::open(&settings.credentials_path)?;
    let credentials = resolve_credentials(&mut store)?;

    let client = ConnectClient::new(&settings.sso_base_url, &settings.connect_base_url);
    let session = client
        .authenticate(&credentials.username, &credentials.password)
        .await?;

    for path in activities {
        let result = session.upload(&path).await;
        match &result {
            Ok(report) => {
                for message in &report.messages {
                    tracing::info!(file = %path.display(), "{}", message);
                }
            }
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "Upload failed");
            }
        }
        summary.activities.push(ActivityOutcome { path, result });
    }

    Ok(summary)
}

/// Print a human-readable report of a sync run
pub fn print_summary(summary: &SyncSummary) {
    if let Some(epo) = &summary.epo {
        println!("EPO updated: {} ({} bytes)", epo.path.display(), epo.bytes);
    }

    if summary.activities.is_empty() {
        println!("No activities uploaded.");
        return;
    }

    println!("{:<40} {:<10} {}", "File", "Status", "Messages");
    println!("{}", "-".repeat(75));

    for outcome in &summary.activities {
        let name = outcome
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.path.display().to_string());

        let (status, detail) = match &outcome.result {
            Ok(report) if report.has_failures() => ("rejected", report.messages.join("; ")),
            Ok(report) => ("uploaded", report.messages.join("; ")),
            Err(e) => ("error", e.to_string()),
        };

        println!("{:<40} {:<10} {}", name, status, detail);
    }

    let failed = summary.failed_uploads();
    println!(
        "\n{} activities processed, {} failed",
        summary.activities.len(),
        failed
    );
}

/// Reject settings that cannot name a mount point
pub fn validate(settings: &Settings) -> Result<()> {
    if settings.user.trim().is_empty() {
        return Err(GarminError::config(
            "could not determine the user owning the mount point; pass --user",
        ));
    }
    Ok(())
}
