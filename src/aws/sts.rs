//! STS client for `GetFederationToken`.

use std::collections::BTreeMap;

use chrono::Utc;
use worker::Method;

use super::s3::upstream_error;
use super::sigv4::{self, Credentials, SigningParams};
use super::transport::{HttpTransport, OutboundRequest};
use super::xml::{self, FederatedCredentials, GetFederationTokenResponse};
use crate::config::Config;
use crate::errors::{AppError, AppResult};

const SERVICE: &str = "sts";
const SERVICE_LABEL: &str = "STS";
const API_VERSION: &str = "2011-06-15";

/// Bounds STS accepts for `DurationSeconds` on `GetFederationToken`.
pub const MIN_FEDERATION_DURATION: u64 = 900;
pub const MAX_FEDERATION_DURATION: u64 = 129_600;

/// The lifetime STS grants for a requested `DurationSeconds`.
pub fn federation_duration(requested: u64) -> u64 {
    requested.clamp(MIN_FEDERATION_DURATION, MAX_FEDERATION_DURATION)
}

pub struct StsClient<T> {
    transport: T,
    credentials: Credentials,
    region: String,
}

impl<T: HttpTransport> StsClient<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            transport,
            credentials: Credentials::new(&config.access_key_id, &config.secret_access_key)
                .with_session_token(config.session_token.clone()),
            region: config.region.clone(),
        }
    }

    fn host(&self) -> String {
        format!("sts.{}.amazonaws.com", self.region)
    }

    /// Requests temporary credentials for `name` restricted by `policy`.
    ///
    /// `duration_seconds` is clamped by [`federation_duration`].
    pub async fn get_federation_token(
        &self,
        name: &str,
        duration_seconds: u64,
        policy: &str,
    ) -> AppResult<FederatedCredentials> {
        let duration = federation_duration(duration_seconds);
        let body = form_body(&[
            ("Action", "GetFederationToken"),
            ("DurationSeconds", &duration.to_string()),
            ("Name", name),
            ("Policy", policy),
            ("Version", API_VERSION),
        ]);

        let host = self.host();
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host.clone());
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded; charset=utf-8".to_string(),
        );

        let params = SigningParams {
            credentials: &self.credentials,
            region: &self.region,
            service: SERVICE,
            time: Utc::now(),
        };
        sigv4::sign_headers(
            &params,
            "POST",
            "/",
            &BTreeMap::new(),
            &mut headers,
            body.as_bytes(),
        );

        let response = self
            .transport
            .send(OutboundRequest {
                method: Method::Post,
                url: format!("https://{}/", host),
                headers: headers.into_iter().collect(),
                body: Some(body),
            })
            .await?;
        if !response.is_success() {
            return Err(upstream_error(SERVICE_LABEL, &response));
        }

        let parsed: GetFederationTokenResponse = xml::parse(&response.body)?;
        let credentials = parsed.get_federation_token_result.credentials;
        if credentials.access_key_id.is_empty() || credentials.session_token.is_empty() {
            return Err(AppError::MalformedResponse {
                service: SERVICE_LABEL,
                reason: "GetFederationToken returned no credentials".to_string(),
            });
        }
        Ok(credentials)
    }
}

fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", sigv4::encode_strict(name), sigv4::encode_strict(value)))
        .collect::<Vec<_>>()
        .join("&")
}
