//! # Application Constants
//!
//! This module defines application-wide constants used throughout the signing service.
//! Centralizing constants keeps the route surface, the AWS wire details and the
//! validation messages consistent across handlers.
//!
//! ## Binding Names
//!
//! Names of Worker vars and secrets that must match wrangler.toml configuration.
//!
//! ## Limits
//!
//! S3 multipart limits and default lifetimes.
//!
//! ## Messages
//!
//! Validation messages returned verbatim to upload clients.

/// Secret holding the AWS access key id
pub const ENV_AWS_KEY: &str = "COMPANION_AWS_KEY";

/// Secret holding the AWS secret access key
pub const ENV_AWS_SECRET: &str = "COMPANION_AWS_SECRET";

/// Optional secret holding a session token for temporary server credentials
pub const ENV_AWS_SESSION_TOKEN: &str = "COMPANION_AWS_SESSION_TOKEN";

/// Target bucket name
pub const ENV_AWS_BUCKET: &str = "COMPANION_AWS_BUCKET";

/// Target bucket region
pub const ENV_AWS_REGION: &str = "COMPANION_AWS_REGION";

/// Optional custom S3-compatible endpoint
pub const ENV_AWS_ENDPOINT: &str = "COMPANION_AWS_ENDPOINT";

/// Set to "true" to use path-style bucket addressing
pub const ENV_AWS_FORCE_PATH_STYLE: &str = "COMPANION_AWS_FORCE_PATH_STYLE";

/// Lifetime of presigned URLs and federation tokens in seconds
pub const ENV_AWS_EXPIRES_IN: &str = "COMPANION_AWS_EXPIRES_IN";

/// Name given to STS federated users
pub const ENV_AWS_FEDERATION_NAME: &str = "COMPANION_AWS_FEDERATION_NAME";

/// Endpoint used by the TUS demo page
pub const ENV_TUS_ENDPOINT: &str = "TUS_ENDPOINT";

/// Default lifetime of presigned URLs and federation tokens (15 minutes)
pub const DEFAULT_EXPIRES_IN: u64 = 900;

/// Default STS federated user name
pub const DEFAULT_FEDERATION_NAME: &str = "uppy-upload-user";

/// Default TUS endpoint for the demo page
pub const DEFAULT_TUS_ENDPOINT: &str = "http://localhost:1080/files";

/// Lowest part number S3 accepts
pub const MIN_PART_NUMBER: u16 = 1;

/// Highest part number S3 accepts
pub const MAX_PART_NUMBER: u16 = 10_000;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "s3-upload-signer-cf-workers";

/// CORS header for allowed origins
pub const CORS_ALLOW_ORIGIN: &str = "*";

/// CORS header for allowed methods
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// CORS header for allowed headers
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

pub const ERR_PART_NUMBER: &str = "s3: the part number must be an integer between 1 and 10000.";

pub const ERR_OBJECT_KEY: &str =
    "s3: the object key must be passed as a query parameter. For example: \"?key=abc.jpg\"";

pub const ERR_PARTS: &str = "s3: `parts` must be an array of {ETag, PartNumber} objects.";

pub const ERR_FILENAME: &str = "s3: the filename must be provided.";

/// Widget bundle served when no local build is deployed alongside the worker
pub const UPPY_CDN_SCRIPT: &str =
    "export * from \"https://releases.transloadit.com/uppy/v4.0.0-beta.11/uppy.min.mjs\";\n";

pub const UPPY_CDN_STYLESHEET: &str =
    "@import \"https://releases.transloadit.com/uppy/v4.0.0-beta.11/uppy.min.css\";\n";
