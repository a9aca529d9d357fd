//! # Middleware Components
//!
//! Cross-cutting request/response processing: CORS and request validation.
//!
//! ## Usage Examples
//!
//! ```rust,ignore
//! // Handle CORS preflight
//! if req.method() == Method::Options {
//!     return CorsMiddleware::handle_preflight();
//! }
//!
//! // Validate a part number taken from the path
//! let part_number = ValidationMiddleware::validate_part_number("7")?;
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use worker::*;

use crate::aws::xml::CompletedPart;
use crate::constants::{
    ERR_FILENAME, ERR_OBJECT_KEY, ERR_PARTS, ERR_PART_NUMBER, MAX_PART_NUMBER, MIN_PART_NUMBER,
};
use crate::errors::{AppError, AppResult};
use crate::utils::{cors_headers, CORS_HEADERS};

/// Middleware for handling Cross-Origin Resource Sharing (CORS) requests.
///
/// The demo pages may be served from a different origin than the worker,
/// so every response, errors included, carries the CORS headers.
pub struct CorsMiddleware;

impl CorsMiddleware {
    /// Adds the CORS headers while keeping the ones the handler set.
    pub fn apply_headers(mut response: Response) -> Result<Response> {
        let headers = response.headers_mut();
        for (name, value) in CORS_HEADERS {
            headers.set(name, value)?;
        }
        Ok(response)
    }

    /// Answers an `OPTIONS` preflight with an empty body.
    pub fn handle_preflight() -> Result<Response> {
        Ok(Response::empty()?.with_headers(cors_headers()))
    }
}

/// Validation of the parameters the upload client sends.
///
/// Every failure is an `AppError::BadRequest` carrying the message the
/// client-side plugin displays.
pub struct ValidationMiddleware;

impl ValidationMiddleware {
    /// Validates a part number given as text.
    ///
    /// Any numeric notation is accepted (`"7"`, `" 7 "`, `"7.0"`, `"7e0"`,
    /// and unsigned `0x`, `0o` or `0b` literals such as `"0x10"`) as long as
    /// the value is an integer in `[1, 10000]`.
    pub fn validate_part_number(raw: &str) -> AppResult<u16> {
        Self::parse_numeric(raw.trim())
            .and_then(Self::part_number_from_f64)
            .ok_or_else(|| AppError::bad_request(ERR_PART_NUMBER))
    }

    fn parse_numeric(text: &str) -> Option<f64> {
        let radix = match text.get(..2).map(str::to_ascii_lowercase).as_deref() {
            Some("0x") => 16,
            Some("0o") => 8,
            Some("0b") => 2,
            _ => return text.parse::<f64>().ok(),
        };
        let digits = &text[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        // Too many digits to fit is out of range anyway.
        u64::from_str_radix(digits, radix).ok().map(|value| value as f64)
    }

    fn part_number_from_f64(value: f64) -> Option<u16> {
        let in_range = value.is_finite()
            && value.fract() == 0.0
            && value >= f64::from(MIN_PART_NUMBER)
            && value <= f64::from(MAX_PART_NUMBER);
        in_range.then_some(value as u16)
    }

    /// Requires exactly one non-empty `key` query parameter.
    pub fn require_object_key(values: Vec<String>) -> AppResult<String> {
        match <[String; 1]>::try_from(values) {
            Ok([key]) if !key.is_empty() => Ok(key),
            _ => Err(AppError::bad_request(ERR_OBJECT_KEY)),
        }
    }

    pub fn require_filename(filename: Option<String>) -> AppResult<String> {
        filename
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::bad_request(ERR_FILENAME))
    }

    /// Validates the `parts` list of a completion request.
    ///
    /// Accepts a non-empty array of objects with a string `ETag` and a
    /// `PartNumber` given as number or numeric string. Parts are returned in
    /// ascending part-number order, which S3 requires.
    pub fn validate_parts(parts: Option<&Value>) -> AppResult<Vec<CompletedPart>> {
        let invalid = || AppError::bad_request(ERR_PARTS);

        let items = parts
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
            .ok_or_else(invalid)?;

        let mut completed = items
            .iter()
            .map(|item| Self::completed_part(item).ok_or_else(invalid))
            .collect::<AppResult<Vec<_>>>()?;
        completed.sort_by_key(|part| part.part_number);
        Ok(completed)
    }

    fn completed_part(item: &Value) -> Option<CompletedPart> {
        let object = item.as_object()?;
        let etag = object.get("ETag")?.as_str()?;
        let part_number = match object.get("PartNumber")? {
            Value::Number(number) => Self::part_number_from_f64(number.as_f64()?),
            Value::String(text) => Self::validate_part_number(text).ok(),
            _ => None,
        }?;
        Some(CompletedPart {
            part_number,
            etag: etag.to_string(),
        })
    }

    /// Flattens client metadata into S3 user-metadata values.
    ///
    /// Strings pass through; other scalars use their JSON text. Nulls are
    /// dropped and nested values are rejected because S3 metadata is flat.
    /// Names become header names, so they must be HTTP tokens.
    pub fn validate_metadata(
        metadata: Option<Map<String, Value>>,
    ) -> AppResult<BTreeMap<String, String>> {
        let mut flat = BTreeMap::new();
        for (name, value) in metadata.unwrap_or_default() {
            if !is_header_token(&name) {
                return Err(AppError::bad_request(format!(
                    "s3: metadata name {:?} is not a valid header name.",
                    name
                )));
            }
            let text = match value {
                Value::Null => continue,
                Value::String(text) => text,
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(AppError::bad_request(format!(
                        "s3: metadata value for {:?} must be a string, number or boolean.",
                        name
                    )))
                }
            };
            flat.insert(name, text);
        }
        Ok(flat)
    }
}

fn is_header_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: AppError) -> String {
        match err {
            AppError::BadRequest { message } => message,
            other => panic!("expected a bad request, got {other:?}"),
        }
    }

    #[test]
    fn part_number_accepts_integers_in_range() {
        assert_eq!(ValidationMiddleware::validate_part_number("1").unwrap(), 1);
        assert_eq!(ValidationMiddleware::validate_part_number("10000").unwrap(), 10_000);
        assert_eq!(ValidationMiddleware::validate_part_number(" 42 ").unwrap(), 42);
        assert_eq!(ValidationMiddleware::validate_part_number("5.0").unwrap(), 5);
        assert_eq!(ValidationMiddleware::validate_part_number("5e0").unwrap(), 5);
    }

    #[test]
    fn part_number_accepts_radix_literals() {
        assert_eq!(ValidationMiddleware::validate_part_number("0x10").unwrap(), 16);
        assert_eq!(ValidationMiddleware::validate_part_number("0XfF").unwrap(), 255);
        assert_eq!(ValidationMiddleware::validate_part_number("0B11").unwrap(), 3);
        assert_eq!(ValidationMiddleware::validate_part_number(" 0o7 ").unwrap(), 7);
        assert_eq!(ValidationMiddleware::validate_part_number("0x2710").unwrap(), 10_000);
    }

    #[test]
    fn part_number_rejects_malformed_radix_literals() {
        for raw in ["0x", "0x2711", "-0x10", "0x+1", "0x1g", "0b2", "0o8", "0x1.0"] {
            let err = ValidationMiddleware::validate_part_number(raw).unwrap_err();
            assert_eq!(message(err), ERR_PART_NUMBER, "input {raw:?}");
        }
    }

    #[test]
    fn radix_part_numbers_are_accepted_in_parts() {
        let parts = json!([{"PartNumber": "0x2", "ETag": "\"b\""}]);
        let completed = ValidationMiddleware::validate_parts(Some(&parts)).unwrap();
        assert_eq!(completed[0].part_number, 2);
    }

    #[test]
    fn part_number_rejects_everything_else() {
        for raw in ["0", "10001", "-1", "2.5", "abc", "", "NaN", "inf", "1e10"] {
            let err = ValidationMiddleware::validate_part_number(raw).unwrap_err();
            assert_eq!(message(err), ERR_PART_NUMBER, "input {raw:?}");
        }
    }

    #[test]
    fn object_key_must_be_single_and_non_empty() {
        assert_eq!(
            ValidationMiddleware::require_object_key(vec!["a.jpg".to_string()]).unwrap(),
            "a.jpg"
        );
        for values in [vec![], vec![String::new()], vec!["a".to_string(), "b".to_string()]] {
            let err = ValidationMiddleware::require_object_key(values).unwrap_err();
            assert_eq!(message(err), ERR_OBJECT_KEY);
        }
    }

    #[test]
    fn filename_is_required() {
        assert!(ValidationMiddleware::require_filename(Some("a.txt".to_string())).is_ok());
        assert!(ValidationMiddleware::require_filename(Some("  ".to_string())).is_err());
        assert_eq!(
            message(ValidationMiddleware::require_filename(None).unwrap_err()),
            ERR_FILENAME
        );
    }

    #[test]
    fn parts_are_validated_and_sorted() {
        let parts = json!([
            {"PartNumber": 2, "ETag": "\"b\""},
            {"PartNumber": "1", "ETag": "\"a\""}
        ]);
        let completed = ValidationMiddleware::validate_parts(Some(&parts)).unwrap();
        assert_eq!(
            completed,
            vec![
                CompletedPart {
                    part_number: 1,
                    etag: "\"a\"".to_string()
                },
                CompletedPart {
                    part_number: 2,
                    etag: "\"b\"".to_string()
                },
            ]
        );
    }

    #[test]
    fn parts_reject_malformed_input() {
        let cases = [
            json!(null),
            json!({"PartNumber": 1, "ETag": "a"}),
            json!([]),
            json!([{"PartNumber": 1}]),
            json!([{"ETag": "a"}]),
            json!([{"PartNumber": 0, "ETag": "a"}]),
            json!([{"PartNumber": 1, "ETag": 5}]),
            json!([{"PartNumber": 1.5, "ETag": "a"}]),
            json!(["PartNumber"]),
        ];
        for case in cases {
            let err = ValidationMiddleware::validate_parts(Some(&case)).unwrap_err();
            assert_eq!(message(err), ERR_PARTS, "input {case}");
        }
        assert!(ValidationMiddleware::validate_parts(None).is_err());
    }

    #[test]
    fn metadata_is_flattened() {
        let metadata = json!({"name": "a.jpg", "size": 42, "public": true, "skip": null});
        let flat = ValidationMiddleware::validate_metadata(metadata.as_object().cloned()).unwrap();
        assert_eq!(flat.get("name").map(String::as_str), Some("a.jpg"));
        assert_eq!(flat.get("size").map(String::as_str), Some("42"));
        assert_eq!(flat.get("public").map(String::as_str), Some("true"));
        assert!(!flat.contains_key("skip"));
    }

    #[test]
    fn metadata_names_must_be_header_tokens() {
        for name in ["", "file name", "naïve", "a:b", "line\nbreak"] {
            let mut metadata = Map::new();
            metadata.insert(name.to_string(), json!("x"));
            let err = ValidationMiddleware::validate_metadata(Some(metadata)).unwrap_err();
            assert!(matches!(err, AppError::BadRequest { .. }), "name {name:?}");
        }
        let metadata = json!({"relative-path_v2": "x"});
        assert!(ValidationMiddleware::validate_metadata(metadata.as_object().cloned()).is_ok());
    }

    #[test]
    fn nested_metadata_is_rejected() {
        let metadata = json!({"tags": ["a", "b"]});
        let err = ValidationMiddleware::validate_metadata(metadata.as_object().cloned()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }
}
