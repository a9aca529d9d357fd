//! # Utility Functions
//!
//! Helpers shared by the handlers: object key and request id generation,
//! CORS headers, and decoding of request parameters from query strings,
//! JSON bodies and urlencoded form bodies.

use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;
use worker::Headers;

use crate::constants::{CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN};
use crate::errors::{AppError, AppResult};

/// Generates the S3 object key for an uploaded file: `{uuid-v4}-{filename}`.
///
/// The random prefix keeps concurrent uploads of identically named files
/// from overwriting each other.
pub fn generate_object_key(filename: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), filename)
}

pub fn generate_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Cross-Origin Resource Sharing (CORS) headers sent with every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN),
    ("Access-Control-Allow-Methods", CORS_ALLOW_METHODS),
    ("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS),
];

/// Creates HTTP headers for Cross-Origin Resource Sharing (CORS) support.
pub fn cors_headers() -> Headers {
    let headers = Headers::new();
    // Note: These values are known to be valid
    for (name, value) in CORS_HEADERS {
        let _ = headers.set(name, value);
    }
    headers
}

/// Percent-decodes a single path segment. Invalid UTF-8 is replaced
/// rather than rejected so the segment still reaches S3 for a proper error.
pub fn decode_path_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Collects every value of `name` from decoded query pairs.
pub fn query_values<'a, I>(pairs: I, name: &str) -> Vec<String>
where
    I: IntoIterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
{
    pairs
        .into_iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .collect()
}

/// Deserializes flat string pairs (query string or urlencoded form) into `T`.
///
/// When a name repeats, the last value wins.
pub fn params_from_pairs<T, K, V, I>(pairs: I) -> AppResult<T>
where
    T: DeserializeOwned,
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    let map: Map<String, Value> = pairs
        .into_iter()
        .map(|(key, value)| (key.into(), Value::String(value.into())))
        .collect();
    serde_json::from_value(Value::Object(map))
        .map_err(|e| AppError::bad_request(format!("Invalid request parameters: {}", e)))
}

/// Parses a request body according to its content type.
///
/// - `application/x-www-form-urlencoded` bodies are decoded as flat pairs
/// - empty bodies deserialize from `{}`
/// - everything else is treated as JSON
pub fn parse_body<T: DeserializeOwned>(content_type: Option<&str>, body: &str) -> AppResult<T> {
    let is_form = content_type
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
        .unwrap_or(false);

    if is_form {
        return params_from_pairs(
            url::form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }

    let body = body.trim();
    let value: Value = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(body)
            .map_err(|_| AppError::bad_request("Invalid JSON in request body"))?
    };
    serde_json::from_value(value)
        .map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::borrow::Cow;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Params {
        filename: Option<String>,
        #[serde(rename = "contentType")]
        content_type: Option<String>,
    }

    #[test]
    fn object_key_is_prefixed_with_uuid() {
        let key = generate_object_key("photo of me.jpg");
        let (prefix, rest) = key.split_at(36);
        assert!(Uuid::parse_str(prefix).is_ok());
        assert_eq!(rest, "-photo of me.jpg");
    }

    #[test]
    fn object_keys_are_unique() {
        assert_ne!(generate_object_key("a.txt"), generate_object_key("a.txt"));
    }

    #[test]
    fn decodes_path_segments() {
        assert_eq!(decode_path_segment("abc%2Fdef%20x"), "abc/def x");
        assert_eq!(decode_path_segment("plain"), "plain");
    }

    #[test]
    fn query_values_collects_repeats() {
        let pairs = vec![
            (Cow::Borrowed("key"), Cow::Borrowed("a.jpg")),
            (Cow::Borrowed("other"), Cow::Borrowed("x")),
            (Cow::Borrowed("key"), Cow::Borrowed("b.jpg")),
        ];
        assert_eq!(query_values(pairs, "key"), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn parses_json_body() {
        let params: Params =
            parse_body(Some("application/json"), r#"{"filename":"a.png","contentType":"image/png"}"#)
                .unwrap();
        assert_eq!(params.filename.as_deref(), Some("a.png"));
        assert_eq!(params.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn parses_form_body() {
        let params: Params = parse_body(
            Some("application/x-www-form-urlencoded; charset=UTF-8"),
            "filename=my+file.png&contentType=image%2Fpng",
        )
        .unwrap();
        assert_eq!(params.filename.as_deref(), Some("my file.png"));
        assert_eq!(params.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn empty_body_yields_defaults() {
        let params: Params = parse_body(None, "").unwrap();
        assert_eq!(
            params,
            Params {
                filename: None,
                content_type: None
            }
        );
    }

    #[test]
    fn invalid_json_is_a_bad_request() {
        let err = parse_body::<Params>(Some("application/json"), "{not json").unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }
}
