//! Upload service response models
//!
//! The upload endpoint answers with a `detailedImportResult` object whose
//! `successes` and `failures` arrays carry human-readable messages. A
//! rejected file (a duplicate, say) is reported there, not as an error.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level body returned by the upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub detailed_import_result: DetailedImportResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedImportResult {
    #[serde(default)]
    pub file_name: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub successes: Vec<ImportItem>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub failures: Vec<ImportItem>,
}

/// One imported (or rejected) activity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    /// Activity id assigned by Garmin Connect
    #[serde(default)]
    pub internal_id: Option<u64>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<ImportMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// The service sends `null` where an empty array is meant
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// What one upload produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Message contents, successes first, each array in order
    pub messages: Vec<String>,
    /// Activity ids created by the upload
    pub created_ids: Vec<u64>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl UploadReport {
    /// True if the service reported at least one rejected item
    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }
}

impl From<UploadResponse> for UploadReport {
    fn from(response: UploadResponse) -> Self {
        let result = response.detailed_import_result;

        let messages = result
            .successes
            .iter()
            .chain(result.failures.iter())
            .flat_map(|item| item.messages.iter())
            .filter_map(|message| message.content.clone())
            .collect();

        let created_ids = result
            .successes
            .iter()
            .filter_map(|item| item.internal_id)
            .collect();

        Self {
            messages,
            created_ids,
            success_count: result.successes.len(),
            failure_count: result.failures.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_successes_then_failures() {
        let json = r#"{
            "detailedImportResult": {
                "failures": [{"messages": [{"code": 202, "content": "duplicate activity"}]}],
                "successes": [{"internalId": 42, "messages": [{"content": "ok"}]}]
            }
        }"#;

        let response: UploadResponse = serde_json::from_str(json).unwrap();
        let report = UploadReport::from(response);

        assert_eq!(report.messages, vec!["ok", "duplicate activity"]);
        assert_eq!(report.created_ids, vec![42]);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert!(report.has_failures());
    }

    #[test]
    fn test_missing_arrays_and_messages() {
        let json = r#"{"detailedImportResult": {"successes": [{"internalId": 7}]}}"#;
        let report = UploadReport::from(serde_json::from_str::<UploadResponse>(json).unwrap());

        assert!(report.messages.is_empty());
        assert_eq!(report.created_ids, vec![7]);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_message_without_content_is_skipped() {
        let json = r#"{
            "detailedImportResult": {
                "successes": [],
                "failures": [{"messages": [{"code": 1}, {"content": "bad file"}]}]
            }
        }"#;
        let report = UploadReport::from(serde_json::from_str::<UploadResponse>(json).unwrap());
        assert_eq!(report.messages, vec!["bad file"]);
    }

    #[test]
    fn test_null_arrays_are_empty() {
        let json = r#"{
            "detailedImportResult": {
                "successes": [{"internalId": 9, "messages": null}],
                "failures": null
            }
        }"#;
        let report = UploadReport::from(serde_json::from_str::<UploadResponse>(json).unwrap());
        assert!(report.messages.is_empty());
        assert_eq!(report.created_ids, vec![9]);
        assert_eq!(report.failure_count, 0);
    }

    #[test]
    fn test_missing_import_result_is_rejected() {
        let result = serde_json::from_str::<UploadResponse>(r#"{"status": "ok"}"#);
        assert!(result.is_err());
    }
}
