//! S3 client: presigned URLs and the multipart upload lifecycle.
//!
//! The client only ever addresses the configured bucket. Browsers upload the
//! bytes directly to S3 through presigned URLs; the worker itself only sends
//! the small control requests (create / list / complete / abort).

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use worker::Method;

use super::sigv4::{self, Credentials, SigningParams};
use super::transport::{HttpTransport, OutboundRequest, OutboundResponse};
use super::xml::{
    self, CompleteMultipartUpload, CompleteMultipartUploadResult, CompletedPart,
    InitiateMultipartUploadResult, ListPartsResult, Part,
};
use crate::config::Config;
use crate::errors::{AppError, AppResult};

const SERVICE: &str = "s3";
const SERVICE_LABEL: &str = "S3";

/// S3 refuses presigned URLs valid for longer than seven days.
pub const MAX_PRESIGN_EXPIRES: u64 = 604_800;

/// Makes a metadata value safe to send as a header.
///
/// Values with non-ASCII or control characters are sent as an RFC 2047
/// encoded word, which S3 stores and returns unchanged.
pub fn encode_metadata_value(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

/// The lifetime a presigned URL actually gets for a requested one.
pub fn presign_lifetime(requested: u64) -> u64 {
    requested.min(MAX_PRESIGN_EXPIRES)
}

/// Scheme and authority every request is sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    /// Host name, with the port when it is not the scheme default.
    pub host: String,
}

impl Endpoint {
    pub fn resolve(custom: Option<&str>, region: &str) -> AppResult<Self> {
        let Some(raw) = custom else {
            return Ok(Self {
                scheme: "https".to_string(),
                host: format!("s3.{}.amazonaws.com", region),
            });
        };

        let invalid = |reason: String| AppError::InvalidConfig {
            name: crate::constants::ENV_AWS_ENDPOINT.to_string(),
            reason,
        };
        let url = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid(format!("{} has no host", raw)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
        })
    }
}

/// Where an object lives on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectAddress {
    pub scheme: String,
    pub host: String,
    /// URI-encoded path, identical in the URL and the canonical request.
    pub path: String,
}

impl ObjectAddress {
    fn url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("{}://{}{}", self.scheme, self.host, self.path)
        } else {
            format!("{}://{}{}?{}", self.scheme, self.host, self.path, query)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedUpload {
    pub key: String,
    pub upload_id: String,
}

pub struct S3Client<T> {
    transport: T,
    credentials: Credentials,
    region: String,
    bucket: String,
    endpoint: Endpoint,
    force_path_style: bool,
}

impl<T: HttpTransport> S3Client<T> {
    pub fn new(config: &Config, transport: T) -> AppResult<Self> {
        Ok(Self {
            transport,
            credentials: Credentials::new(&config.access_key_id, &config.secret_access_key)
                .with_session_token(config.session_token.clone()),
            region: config.region.clone(),
            bucket: config.bucket.clone(),
            endpoint: Endpoint::resolve(config.endpoint.as_deref(), &config.region)?,
            force_path_style: config.force_path_style,
        })
    }

    pub fn address(&self, key: &str) -> ObjectAddress {
        if self.force_path_style {
            ObjectAddress {
                scheme: self.endpoint.scheme.clone(),
                host: self.endpoint.host.clone(),
                path: sigv4::encode_path(&format!("/{}/{}", self.bucket, key)),
            }
        } else {
            ObjectAddress {
                scheme: self.endpoint.scheme.clone(),
                host: format!("{}.{}", self.bucket, self.endpoint.host),
                path: sigv4::encode_path(&format!("/{}", key)),
            }
        }
    }

    fn signing_params(&self, time: DateTime<Utc>) -> SigningParams<'_> {
        SigningParams {
            credentials: &self.credentials,
            region: &self.region,
            service: SERVICE,
            time,
        }
    }

    fn presign(
        &self,
        method: &str,
        key: &str,
        query: BTreeMap<String, String>,
        mut headers: BTreeMap<String, String>,
        expires_in: u64,
        now: DateTime<Utc>,
    ) -> String {
        let address = self.address(key);
        headers.insert("host".to_string(), address.host.clone());
        let query = sigv4::presign_query(
            &self.signing_params(now),
            method,
            &address.path,
            &query,
            &headers,
            presign_lifetime(expires_in),
        );
        address.url(&query)
    }

    /// Presigns a single-request `PUT` of a whole object.
    ///
    /// When `content_type` is given it becomes a signed header, so the
    /// browser must send the same `Content-Type`.
    pub fn presign_put_object(
        &self,
        key: &str,
        content_type: Option<&str>,
        expires_in: u64,
        now: DateTime<Utc>,
    ) -> String {
        let mut headers = BTreeMap::new();
        if let Some(content_type) = content_type.filter(|ct| !ct.is_empty()) {
            headers.insert("content-type".to_string(), content_type.to_string());
        }
        self.presign("PUT", key, BTreeMap::new(), headers, expires_in, now)
    }

    /// Presigns the `PUT` of one part of a multipart upload.
    pub fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u16,
        expires_in: u64,
        now: DateTime<Utc>,
    ) -> String {
        let mut query = BTreeMap::new();
        query.insert("partNumber".to_string(), part_number.to_string());
        query.insert("uploadId".to_string(), upload_id.to_string());
        self.presign("PUT", key, query, BTreeMap::new(), expires_in, now)
    }

    pub async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: Option<&str>,
        metadata: &BTreeMap<String, String>,
    ) -> AppResult<CreatedUpload> {
        let mut query = BTreeMap::new();
        query.insert("uploads".to_string(), String::new());

        let mut headers = BTreeMap::new();
        if let Some(content_type) = content_type.filter(|ct| !ct.is_empty()) {
            headers.insert("content-type".to_string(), content_type.to_string());
        }
        for (name, value) in metadata {
            headers.insert(
                format!("x-amz-meta-{}", name.to_ascii_lowercase()),
                encode_metadata_value(value),
            );
        }

        let response = self
            .send_signed(Method::Post, key, query, headers, None)
            .await?;
        let result: InitiateMultipartUploadResult = xml::parse(&response.body)?;
        if result.upload_id.is_empty() {
            return Err(AppError::MalformedResponse {
                service: SERVICE_LABEL,
                reason: "CreateMultipartUpload returned no UploadId".to_string(),
            });
        }

        Ok(CreatedUpload {
            key: if result.key.is_empty() {
                key.to_string()
            } else {
                result.key
            },
            upload_id: result.upload_id,
        })
    }

    pub async fn list_parts_page(
        &self,
        key: &str,
        upload_id: &str,
        marker: Option<&str>,
    ) -> AppResult<ListPartsResult> {
        let mut query = BTreeMap::new();
        query.insert("uploadId".to_string(), upload_id.to_string());
        if let Some(marker) = marker {
            query.insert("part-number-marker".to_string(), marker.to_string());
        }

        let response = self
            .send_signed(Method::Get, key, query, BTreeMap::new(), None)
            .await?;
        xml::parse(&response.body)
    }

    /// Lists every uploaded part, following `NextPartNumberMarker` until S3
    /// reports the listing is no longer truncated.
    pub async fn list_all_parts(&self, key: &str, upload_id: &str) -> AppResult<Vec<Part>> {
        let mut parts = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .list_parts_page(key, upload_id, marker.as_deref())
                .await?;
            parts.extend(page.part);

            if !page.is_truncated {
                return Ok(parts);
            }
            match page.next_part_number_marker {
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                _ => {
                    return Err(AppError::MalformedResponse {
                        service: SERVICE_LABEL,
                        reason: "truncated ListParts page without a new NextPartNumberMarker"
                            .to_string(),
                    })
                }
            }
        }
    }

    /// Stitches the uploaded parts together. Returns the object location.
    pub async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> AppResult<Option<String>> {
        let mut query = BTreeMap::new();
        query.insert("uploadId".to_string(), upload_id.to_string());

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());

        let body = CompleteMultipartUpload { part: parts }.to_xml()?;
        let response = self
            .send_signed(Method::Post, key, query, headers, Some(body))
            .await?;

        if let Some(error) = xml::s3_error(&response.body) {
            return Err(AppError::Upstream {
                service: SERVICE_LABEL,
                status: response.status,
                code: error.code,
                message: error.message,
            });
        }

        let result: CompleteMultipartUploadResult = xml::parse(&response.body)?;
        Ok(result.location)
    }

    pub async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> AppResult<()> {
        let mut query = BTreeMap::new();
        query.insert("uploadId".to_string(), upload_id.to_string());

        self.send_signed(Method::Delete, key, query, BTreeMap::new(), None)
            .await?;
        Ok(())
    }

    async fn send_signed(
        &self,
        method: Method,
        key: &str,
        query: BTreeMap<String, String>,
        mut headers: BTreeMap<String, String>,
        body: Option<String>,
    ) -> AppResult<OutboundResponse> {
        let address = self.address(key);
        headers.insert("host".to_string(), address.host.clone());

        sigv4::sign_headers(
            &self.signing_params(Utc::now()),
            &method.to_string(),
            &address.path,
            &query,
            &mut headers,
            body.as_deref().unwrap_or_default().as_bytes(),
        );

        let request = OutboundRequest {
            method,
            url: address.url(&sigv4::canonical_query_string(&query)),
            headers: headers.into_iter().collect(),
            body,
        };
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(upstream_error(SERVICE_LABEL, &response));
        }
        Ok(response)
    }
}

/// Decodes an AWS error document, falling back to the raw body.
pub(crate) fn upstream_error(service: &'static str, response: &OutboundResponse) -> AppError {
    let parsed = xml::s3_error(&response.body).or_else(|| {
        xml::parse::<xml::ErrorResponse>(&response.body)
            .ok()
            .map(|wrapper| wrapper.error)
            .filter(|error| !error.code.is_empty())
    });

    match parsed {
        Some(error) => AppError::Upstream {
            service,
            status: response.status,
            code: error.code,
            message: error.message,
        },
        None => AppError::Upstream {
            service,
            status: response.status,
            code: "Unknown".to_string(),
            message: response.body.chars().take(256).collect(),
        },
    }
}
