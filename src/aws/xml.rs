//! XML documents exchanged with S3 and STS.

use quick_xml::de::from_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InitiateMultipartUploadResult {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// One uploaded part as reported by `ListParts`. Serialized to clients with
/// the same PascalCase field names the AWS SDKs use.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Part {
    pub part_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(rename = "ETag")]
    pub etag: String,
    pub size: u64,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListPartsResult {
    pub is_truncated: bool,
    pub next_part_number_marker: Option<String>,
    pub part: Vec<Part>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CompleteMultipartUploadResult {
    pub location: Option<String>,
    pub bucket: String,
    pub key: String,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletedPart {
    pub part_number: u16,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "CompleteMultipartUpload", rename_all = "PascalCase")]
pub struct CompleteMultipartUpload<'a> {
    pub part: &'a [CompletedPart],
}

impl CompleteMultipartUpload<'_> {
    pub fn to_xml(&self) -> AppResult<String> {
        quick_xml::se::to_string(self).map_err(|e| AppError::Internal {
            message: format!("Failed to serialize CompleteMultipartUpload: {}", e),
        })
    }
}

/// S3 error document: `<Error><Code/><Message/></Error>`.
#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// STS wraps the error: `<ErrorResponse><Error>..</Error></ErrorResponse>`.
#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Temporary credentials in the shape AWS SDK clients expect.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FederatedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GetFederationTokenResult {
    pub credentials: FederatedCredentials,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GetFederationTokenResponse {
    pub get_federation_token_result: GetFederationTokenResult,
}

pub fn parse<T: DeserializeOwned>(xml: &str) -> AppResult<T> {
    Ok(from_str(xml)?)
}

/// Returns the error document if `xml` is an S3 `<Error>` response.
///
/// `CompleteMultipartUpload` can fail after S3 has already sent a 200
/// status line, in which case the error arrives in the body.
pub fn s3_error(xml: &str) -> Option<ErrorBody> {
    let body = xml.trim_start();
    let body = match body.strip_prefix("<?xml") {
        Some(declaration) => declaration.split_once("?>")?.1.trim_start(),
        None => body,
    };
    if !body.starts_with("<Error>") {
        return None;
    }
    from_str(body).ok()
}
