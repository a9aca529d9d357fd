//! Structured request logging.
//!
//! Every line is a single JSON object so `wrangler tail` output can be piped
//! straight into a log processor.

use chrono::Utc;
use serde_json::{json, Value};
use worker::{console_error, console_log, console_warn};

use crate::utils::generate_request_id;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Logger bound to a single request.
pub struct Logger {
    request_id: String,
    method: String,
    path: String,
}

impl Logger {
    /// Creates a logger with a fresh request id for `method path`.
    pub fn for_request(method: &str, path: &str) -> Self {
        Self {
            request_id: generate_request_id(),
            method: method.to_string(),
            path: path.to_string(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn info(&self, message: &str, data: Option<Value>) {
        self.log(Level::Info, message, data);
    }

    pub fn warn(&self, message: &str, data: Option<Value>) {
        self.log(Level::Warn, message, data);
    }

    pub fn error(&self, message: &str, data: Option<Value>) {
        self.log(Level::Error, message, data);
    }

    /// Renders one log line without emitting it.
    pub fn render(&self, level: Level, message: &str, data: Option<Value>) -> Value {
        json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level.as_str(),
            "request_id": self.request_id,
            "method": self.method,
            "path": self.path,
            "message": message,
            "data": data
        })
    }

    fn log(&self, level: Level, message: &str, data: Option<Value>) {
        let line = self.render(level, message, data).to_string();
        match level {
            Level::Info => console_log!("{}", line),
            Level::Warn => console_warn!("{}", line),
            Level::Error => console_error!("{}", line),
        }
    }
}

/// Builds the optional data payload for a log line.
///
/// Usage: `log_data!("key" => value, "other" => 42)`
#[macro_export]
macro_rules! log_data {
    ($($key:literal => $value:expr),* $(,)?) => {
        Some(serde_json::json!({ $($key: $value),* }))
    };
}
