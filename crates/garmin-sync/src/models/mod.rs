pub mod upload;

pub use upload::{DetailedImportResult, ImportItem, ImportMessage, UploadReport, UploadResponse};
