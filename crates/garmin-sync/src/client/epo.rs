//! EPO (extended prediction orbit) download
//!
//! Garmin's ephemeris service answers with a stream of fixed-size records,
//! each made of a 3-byte header and a 2304-byte payload. The device wants
//! only the payloads, back to back.

use crate::error::{GarminError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::io::ErrorKind;
use std::path::Path;

/// Per-record header stripped from the service response
pub const RECORD_HEADER_LEN: usize = 3;

/// Payload bytes kept from each record
pub const RECORD_PAYLOAD_LEN: usize = 2304;

/// Full record stride in the service response
pub const RECORD_LEN: usize = RECORD_HEADER_LEN + RECORD_PAYLOAD_LEN;

/// Client name the ephemeris service expects
const CLIENT_NAME: &str = "CoreService";

/// Client for the ephemeris service
pub struct EpoClient {
    client: Client,
    url: String,
    payload: Vec<u8>,
}

impl EpoClient {
    /// Create a client posting `payload` to `url`
    pub fn new(url: &str, payload: Vec<u8>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(GarminError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
            payload,
        })
    }

    /// Load the recorded request body from disk and build a client for `url`
    pub fn from_postdata_file(url: &str, postdata: &Path) -> Result<Self> {
        let payload = std::fs::read(postdata).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GarminError::PostdataNotFound(postdata.to_path_buf()),
            _ => GarminError::config(format!(
                "Could not read EPO request body {}: {}",
                postdata.display(),
                e
            )),
        })?;
        Self::new(url, payload)
    }

    /// Download EPO data and strip the record headers
    pub async fn fetch_and_repack(&self) -> Result<Vec<u8>> {
        tracing::info!(url = %self.url, "Fetching EPO data");

        let response = self
            .client
            .post(&self.url)
            .header("Garmin-Client-Name", CLIENT_NAME)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(self.payload.clone())
            .send()
            .await
            .map_err(|e| GarminError::epo_fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are repacked too
            tracing::warn!(%status, "EPO service returned a non-success status");
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GarminError::epo_fetch(e.to_string()))?;

        tracing::debug!(len = body.len(), "Original EPO");
        let data = repack(&body);
        tracing::debug!(len = data.len(), "Repacked EPO");

        Ok(data)
    }
}

/// Drop the 3-byte header of every 2307-byte record.
///
/// A short final record is clipped the same way: up to 3 bytes dropped, then
/// whatever remains (at most 2304 bytes) kept.
pub fn repack(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / RECORD_LEN * RECORD_PAYLOAD_LEN + RECORD_PAYLOAD_LEN);

    for record in data.chunks(RECORD_LEN) {
        let header = record.len().min(RECORD_HEADER_LEN);
        out.extend_from_slice(&record[header..]);
    }

    out
}

/// Overwrite the device's EPO file in place
pub async fn write_epo(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data).await?;
    tracing::info!(path = %path.display(), bytes = data.len(), "EPO written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Settings, DEFAULT_EPO_URL};

    #[test]
    fn test_repack_single_record() {
        let mut input = vec![0x01, 0x02, 0x03];
        input.extend(std::iter::repeat(0xAB).take(RECORD_PAYLOAD_LEN));

        let out = repack(&input);
        assert_eq!(out, vec![0xAB; RECORD_PAYLOAD_LEN]);
    }

    #[test]
    fn test_repack_length_for_whole_records() {
        for records in 0..5 {
            let input = vec![0x5A; records * RECORD_LEN];
            assert_eq!(repack(&input).len(), records * RECORD_PAYLOAD_LEN);
        }
    }

    #[test]
    fn test_repack_empty() {
        assert!(repack(&[]).is_empty());
    }

    #[test]
    fn test_repack_truncated_record() {
        assert_eq!(repack(&[1, 2, 3, 4, 5]), vec![4, 5]);
    }

    #[test]
    fn test_repack_header_only_tail() {
        let mut input = vec![0u8; RECORD_LEN];
        input.extend_from_slice(&[9, 9]);
        assert_eq!(repack(&input).len(), RECORD_PAYLOAD_LEN);
    }

    #[test]
    fn test_repack_keeps_record_order() {
        let mut input = Vec::new();
        for marker in [0x11u8, 0x22, 0x33] {
            input.extend_from_slice(&[0xFF; RECORD_HEADER_LEN]);
            input.extend(std::iter::repeat(marker).take(RECORD_PAYLOAD_LEN));
        }

        let out = repack(&input);
        assert_eq!(out[0], 0x11);
        assert_eq!(out[RECORD_PAYLOAD_LEN], 0x22);
        assert_eq!(out[2 * RECORD_PAYLOAD_LEN], 0x33);
        assert!(!out.contains(&0xFF));
    }

    #[test]
    fn test_postdata_file_becomes_payload() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let postdata = temp_dir.path().join("garmin-postdata");
        std::fs::write(&postdata, [0x0A, 0x1C]).unwrap();

        let settings = Settings::new("alice").unwrap();
        let client = EpoClient::from_postdata_file(&settings.epo_url, &postdata).unwrap();
        assert_eq!(client.url, DEFAULT_EPO_URL);
        assert_eq!(client.payload, vec![0x0A, 0x1C]);
    }

    #[test]
    fn test_missing_postdata_names_path() {
        let missing = Path::new("/nonexistent/garmin-postdata");
        match EpoClient::from_postdata_file(DEFAULT_EPO_URL, missing) {
            Err(GarminError::PostdataNotFound(path)) => assert_eq!(path, missing),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("missing request body must fail"),
        }
    }

    #[test]
    fn test_unreadable_postdata_is_config_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = EpoClient::from_postdata_file(DEFAULT_EPO_URL, temp_dir.path());
        assert!(matches!(result, Err(GarminError::Config(_))));
    }

    #[tokio::test]
    async fn test_write_epo_overwrites() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("EPO.BIN");
        std::fs::write(&path, vec![0u8; 10_000]).unwrap();

        write_epo(&path, &[1, 2, 3]).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }
}
