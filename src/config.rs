//! # Configuration Management
//!
//! This module provides configuration management for the signing service.
//! Configuration is read from Worker vars and secrets at startup, with
//! defaults for every optional setting.
//!
//! ## Configuration Sources
//!
//! 1. **Secrets**: credentials (`wrangler secret put COMPANION_AWS_SECRET`)
//! 2. **Vars**: non-sensitive settings declared under `[vars]` in wrangler.toml
//! 3. **Defaults**: fallback values for optional settings
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = Config::from_env(&env)?;
//! console_log!("Signing for bucket {}", config.bucket);
//! ```

use serde::Serialize;
use worker::Env;

use crate::constants::*;
use crate::errors::{AppError, AppResult};

/// Configuration structure for the signing service.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Config {
    /// AWS access key id used to sign every request.
    pub access_key_id: String,

    /// AWS secret access key. Never serialized back to clients.
    #[serde(skip_serializing)]
    pub secret_access_key: String,

    /// Session token when the worker itself runs with temporary credentials.
    #[serde(skip_serializing)]
    pub session_token: Option<String>,

    pub bucket: String,

    pub region: String,

    /// Custom S3-compatible endpoint, e.g. `http://localhost:9000`.
    pub endpoint: Option<String>,

    /// Address the bucket in the path instead of the host name.
    pub force_path_style: bool,

    /// Lifetime of presigned URLs and federation tokens in seconds.
    pub expires_in: u64,

    /// Name attached to STS federated users.
    pub federation_name: String,

    /// Endpoint the TUS demo page uploads to.
    pub tus_endpoint: String,
}

impl Config {
    /// Loads configuration from the Worker environment.
    ///
    /// Secrets take precedence over plain vars so credentials can be moved
    /// out of wrangler.toml without renaming them.
    pub fn from_env(env: &Env) -> AppResult<Self> {
        Self::from_lookup(env_lookup(env))
    }

    /// Reads only the TUS endpoint, so the demo pages render without AWS
    /// settings.
    pub fn tus_endpoint_from_env(env: &Env) -> String {
        Self::tus_endpoint_from_lookup(env_lookup(env))
    }

    pub fn tus_endpoint_from_lookup<F>(lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        non_blank(&lookup, ENV_TUS_ENDPOINT).unwrap_or_else(|| DEFAULT_TUS_ENDPOINT.to_string())
    }

    /// Builds configuration from an arbitrary name lookup.
    ///
    /// # Errors
    ///
    /// - `MissingConfig`: a required setting is absent or blank
    /// - `InvalidConfig`: `COMPANION_AWS_EXPIRES_IN` is not a positive integer
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| non_blank(&lookup, name);
        let required = |name: &str| {
            optional(name).ok_or_else(|| AppError::MissingConfig {
                name: name.to_string(),
            })
        };

        let expires_in = match optional(ENV_AWS_EXPIRES_IN) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => {
                    return Err(AppError::InvalidConfig {
                        name: ENV_AWS_EXPIRES_IN.to_string(),
                        reason: format!("expected a positive number of seconds, got {:?}", raw),
                    })
                }
            },
            None => DEFAULT_EXPIRES_IN,
        };

        Ok(Self {
            access_key_id: required(ENV_AWS_KEY)?,
            secret_access_key: required(ENV_AWS_SECRET)?,
            session_token: optional(ENV_AWS_SESSION_TOKEN),
            bucket: required(ENV_AWS_BUCKET)?,
            region: required(ENV_AWS_REGION)?,
            endpoint: optional(ENV_AWS_ENDPOINT),
            force_path_style: optional(ENV_AWS_FORCE_PATH_STYLE).as_deref() == Some("true"),
            expires_in,
            federation_name: optional(ENV_AWS_FEDERATION_NAME)
                .unwrap_or_else(|| DEFAULT_FEDERATION_NAME.to_string()),
            tus_endpoint: Self::tus_endpoint_from_lookup(&lookup),
        })
    }
}

/// Secrets take precedence over plain vars.
fn env_lookup(env: &Env) -> impl Fn(&str) -> Option<String> + '_ {
    move |name| {
        env.secret(name)
            .map(|secret| secret.to_string())
            .or_else(|_| env.var(name).map(|var| var.to_string()))
            .ok()
    }
}

fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        (ENV_AWS_KEY, "AKIDEXAMPLE"),
        (ENV_AWS_SECRET, "secret"),
        (ENV_AWS_BUCKET, "uploads"),
        (ENV_AWS_REGION, "eu-west-1"),
    ];

    #[test]
    fn applies_defaults_for_optional_settings() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.bucket, "uploads");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.expires_in, DEFAULT_EXPIRES_IN);
        assert_eq!(config.federation_name, DEFAULT_FEDERATION_NAME);
        assert_eq!(config.tus_endpoint, DEFAULT_TUS_ENDPOINT);
        assert!(!config.force_path_style);
        assert!(config.endpoint.is_none());
        assert!(config.session_token.is_none());
    }

    #[test]
    fn reads_optional_settings() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            (ENV_AWS_FORCE_PATH_STYLE, "true"),
            (ENV_AWS_ENDPOINT, "http://localhost:9000"),
            (ENV_AWS_EXPIRES_IN, "300"),
            (ENV_AWS_SESSION_TOKEN, "token"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.force_path_style);
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.expires_in, 300);
        assert_eq!(config.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn only_literal_true_enables_path_style() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_AWS_FORCE_PATH_STYLE, "yes"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(!config.force_path_style);
    }

    #[test]
    fn rejects_missing_bucket() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(name, _)| *name != ENV_AWS_BUCKET)
            .collect();
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, AppError::MissingConfig { ref name } if name == ENV_AWS_BUCKET));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs.retain(|(name, _)| *name != ENV_AWS_REGION);
        pairs.push((ENV_AWS_REGION, "   "));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, AppError::MissingConfig { .. }));
    }

    #[test]
    fn rejects_zero_lifetime() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_AWS_EXPIRES_IN, "0"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig { .. }));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("secret_access_key").is_none());
        assert_eq!(value["access_key_id"], "AKIDEXAMPLE");
    }
}
