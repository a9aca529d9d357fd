//! AWS Signature Version 4.
//!
//! Two flavours are needed:
//!
//! - **header signing** for calls the worker makes itself (multipart
//!   lifecycle, STS), producing an `Authorization` header;
//! - **query presigning** for URLs handed to browsers, where the signature
//!   travels in `X-Amz-*` query parameters and the payload is unsigned.
//!
//! Read more: <https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-authenticating-requests.html>

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash used by presigned URLs.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// RFC 3986 unreserved characters stay as-is, everything else is `%XY`.
pub const STRICT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Same as [`STRICT_ENCODE_SET`] but keeps `/` for object paths.
pub const PATH_ENCODE_SET: &AsciiSet = &STRICT_ENCODE_SET.remove(b'/');

pub fn encode_strict(value: &str) -> String {
    utf8_percent_encode(value, STRICT_ENCODE_SET).to_string()
}

pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

pub fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, new_from_slice cannot fail here.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: Option<String>) -> Self {
        self.session_token = token;
        self
    }
}

/// Who signs, where, and when.
#[derive(Clone, Copy, Debug)]
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningParams<'_> {
    fn date_stamp(&self) -> String {
        self.time.format("%Y%m%d").to_string()
    }

    fn amz_date(&self) -> String {
        self.time.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.date_stamp(),
            self.region,
            self.service
        )
    }

    fn signing_key(&self) -> Vec<u8> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), self.date_stamp().as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        hmac_sha256(&k_service, b"aws4_request")
    }

    fn sign(&self, canonical_request: &str) -> String {
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            self.amz_date(),
            self.scope(),
            hex_sha256(canonical_request.as_bytes())
        );
        hex::encode(hmac_sha256(&self.signing_key(), string_to_sign.as_bytes()))
    }
}

/// The request parts that go into the signature.
///
/// `path` must already be URI-encoded exactly as it is sent on the wire.
/// Header names must be lowercase.
#[derive(Clone, Debug)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a BTreeMap<String, String>,
    pub headers: &'a BTreeMap<String, String>,
}

pub fn canonical_query_string(query: &BTreeMap<String, String>) -> String {
    let mut encoded: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| (encode_strict(k), encode_strict(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

fn canonical_request(request: &SignableRequest<'_>, payload_hash: &str) -> String {
    let canonical_headers: String = request
        .headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, canonical_header_value(value)))
        .collect();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        request.path,
        canonical_query_string(request.query),
        canonical_headers,
        signed_header_names(request.headers),
        payload_hash
    )
}

/// Signs a request the worker sends itself.
///
/// Adds `x-amz-date`, `x-amz-content-sha256`, `x-amz-security-token` (when
/// the credentials carry one) and finally `authorization` to `headers`.
/// `headers` must already contain `host`.
pub fn sign_headers(
    params: &SigningParams<'_>,
    method: &str,
    path: &str,
    query: &BTreeMap<String, String>,
    headers: &mut BTreeMap<String, String>,
    payload: &[u8],
) {
    let payload_hash = hex_sha256(payload);
    headers.insert("x-amz-date".to_string(), params.amz_date());
    headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
    if let Some(token) = &params.credentials.session_token {
        headers.insert("x-amz-security-token".to_string(), token.clone());
    }
    headers.remove("authorization");

    let request = SignableRequest {
        method,
        path,
        query,
        headers,
    };
    let signature = params.sign(&canonical_request(&request, &payload_hash));
    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        params.credentials.access_key_id,
        params.scope(),
        signed_header_names(headers),
        signature
    );
    headers.insert("authorization".to_string(), authorization);
}

/// Builds the query string of a presigned URL, signature included.
///
/// `query` holds operation parameters (`partNumber`, `uploadId`, ...);
/// `headers` holds every header the client must send verbatim, `host` first
/// among them.
pub fn presign_query(
    params: &SigningParams<'_>,
    method: &str,
    path: &str,
    query: &BTreeMap<String, String>,
    headers: &BTreeMap<String, String>,
    expires_in: u64,
) -> String {
    let mut query = query.clone();
    query.insert("X-Amz-Algorithm".to_string(), ALGORITHM.to_string());
    query.insert(
        "X-Amz-Credential".to_string(),
        format!("{}/{}", params.credentials.access_key_id, params.scope()),
    );
    query.insert("X-Amz-Date".to_string(), params.amz_date());
    query.insert("X-Amz-Expires".to_string(), expires_in.to_string());
    query.insert("X-Amz-SignedHeaders".to_string(), signed_header_names(headers));
    if let Some(token) = &params.credentials.session_token {
        query.insert("X-Amz-Security-Token".to_string(), token.clone());
    }

    let request = SignableRequest {
        method,
        path,
        query: &query,
        headers,
    };
    let signature = params.sign(&canonical_request(&request, UNSIGNED_PAYLOAD));
    format!(
        "{}&X-Amz-Signature={}",
        canonical_query_string(&query),
        signature
    )
}
