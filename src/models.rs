//! Request and response bodies of the HTTP API.
//!
//! Field names follow what the browser upload plugin sends and expects,
//! hence the mix of `camelCase` and plain names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aws::xml::FederatedCredentials;

/// Parameters of a single-request upload (`GET /s3/params`, `POST /s3/sign`).
///
/// Clients send the media type as `contentType` or `type`, sometimes both.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignParams {
    pub filename: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
}

impl SignParams {
    /// `contentType` wins over `type`.
    pub fn media_type(&self) -> Option<&str> {
        first_non_empty(&self.content_type, &self.mime_type)
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PresignedUpload {
    pub url: String,
    pub method: &'static str,
}

/// Body of `POST /s3/multipart`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateMultipartParams {
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl CreateMultipartParams {
    /// `type` wins over `contentType`.
    pub fn media_type(&self) -> Option<&str> {
        first_non_empty(&self.mime_type, &self.content_type)
    }
}

fn first_non_empty<'a>(preferred: &'a Option<String>, fallback: &'a Option<String>) -> Option<&'a str> {
    [preferred, fallback]
        .into_iter()
        .filter_map(|value| value.as_deref())
        .find(|value| !value.is_empty())
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CreateMultipartResponse {
    pub key: String,
    #[serde(rename = "uploadId")]
    pub upload_id: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SignPartResponse {
    pub url: String,
    pub expires: u64,
}

/// Body of `POST /s3/multipart/:uploadId/complete`.
///
/// `parts` stays untyped until validation so malformed input maps to the
/// documented 400 message instead of a generic parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompleteParams {
    pub parts: Option<Value>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CompleteResponse {
    pub location: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct FederationTokenResponse {
    pub credentials: FederatedCredentials,
    pub bucket: String,
    pub region: String,
}
