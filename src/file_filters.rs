//! Filters over upload-file records as tracked by the browser upload widget.
//!
//! Records deserialize from the widget's own JSON shape (`camelCase`), so the
//! same filters apply to state posted back by a client.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileProgress {
    /// Millisecond timestamp of when the upload started, if it has.
    pub upload_started: Option<u64>,
    pub upload_complete: bool,
    pub bytes_uploaded: u64,
    pub bytes_total: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadFile {
    pub id: String,
    pub name: String,
    pub error: Option<String>,
    pub progress: Option<FileProgress>,
    /// Set when the file was restored from a previous session.
    pub is_restored: bool,
}

impl UploadFile {
    /// An empty error message does not count as a failure.
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|error| !error.is_empty())
    }

    pub fn upload_started(&self) -> bool {
        self.progress
            .as_ref()
            .and_then(|progress| progress.upload_started)
            .is_some_and(|started| started > 0)
    }
}

/// Keeps the files that have not failed.
pub fn filter_non_failed_files(files: &[UploadFile]) -> Vec<UploadFile> {
    files.iter().filter(|file| !file.has_error()).cloned().collect()
}

/// Keeps the files that should emit `upload-started`.
///
/// Restored files whose upload already started were announced in the
/// previous session and are skipped.
pub fn filter_files_to_emit_upload_started(files: &[UploadFile]) -> Vec<UploadFile> {
    files
        .iter()
        .filter(|file| !file.upload_started() || !file.is_restored)
        .cloned()
        .collect()
}
