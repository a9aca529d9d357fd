use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use worker::Error as WorkerError;
use worker::Response;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("{message}")]
    BadRequest { message: String },
    #[error("Missing configuration: {name}")]
    MissingConfig { name: String },
    #[error("Invalid configuration {name}: {reason}")]
    InvalidConfig { name: String, reason: String },
    #[error("{service} responded with status {status}: {code}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        code: String,
        message: String,
    },
    #[error("Malformed {service} response: {reason}")]
    MalformedResponse { service: &'static str, reason: String },
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client. Validation failures carry their static
    /// message; everything else is reported as a generic server error.
    pub fn body(&self) -> Value {
        match self {
            AppError::BadRequest { message } => json!({ "error": message }),
            other => json!({
                "error": "Internal Server Error",
                "message": other.to_string(),
            }),
        }
    }

    pub fn to_response(&self) -> worker::Result<Response> {
        Ok(Response::from_json(&self.body())?.with_status(self.status().as_u16()))
    }
}

impl From<AppError> for WorkerError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Worker(e) => e,
            other => WorkerError::RustError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ERR_PART_NUMBER;

    #[test]
    fn bad_request_maps_to_400_with_static_message() {
        let err = AppError::bad_request(ERR_PART_NUMBER);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), json!({ "error": ERR_PART_NUMBER }));
    }

    #[test]
    fn upstream_error_maps_to_500_with_message() {
        let err = AppError::Upstream {
            service: "S3",
            status: 404,
            code: "NoSuchUpload".to_string(),
            message: "The specified upload does not exist.".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = err.body();
        assert_eq!(body["error"], "Internal Server Error");
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("NoSuchUpload"));
        assert!(message.contains("404"));
    }

    #[test]
    fn missing_config_is_a_server_error() {
        let err = AppError::MissingConfig {
            name: "COMPANION_AWS_BUCKET".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.body()["message"],
            "Missing configuration: COMPANION_AWS_BUCKET"
        );
    }

    #[test]
    fn converts_into_worker_error() {
        let err: WorkerError = AppError::Internal {
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, WorkerError::RustError(ref msg) if msg == "Internal error: boom"));
    }
}
