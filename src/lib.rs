//! # S3 Upload Signer - Cloudflare Workers
//!
//! A signing service that lets browsers upload straight to Amazon S3 (or any
//! S3-compatible store) without ever holding long-lived credentials.
//!
//! ## Architecture
//!
//! The service follows a modular architecture with clear separation of concerns:
//! - **Router**: Resolves method and path to a route
//! - **Middleware**: CORS and request validation
//! - **Handlers**: Signing, multipart lifecycle, demo pages
//! - **AWS**: SigV4 signing plus minimal S3 and STS clients over `fetch`
//! - **Models**: Request and response bodies
//! - **File filters**: Helpers over the upload widget's file records
//!
//! ## Example Usage
//!
//! ```text
//! GET    /s3/sts                                  - Temporary credentials
//! GET    /s3/params?filename=&contentType=        - Presigned PUT
//! POST   /s3/sign                                 - Presigned PUT
//! POST   /s3/multipart                            - Create multipart upload
//! GET    /s3/multipart/{uploadId}/{part}?key=     - Presign a part
//! GET    /s3/multipart/{uploadId}?key=            - List uploaded parts
//! POST   /s3/multipart/{uploadId}/complete?key=   - Complete the upload
//! DELETE /s3/multipart/{uploadId}?key=            - Abort the upload
//! ```

use std::sync::{Arc, OnceLock};
use worker::*;

pub mod aws;
pub mod config;
pub mod constants;
pub mod errors;
pub mod file_filters;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod router;
pub mod utils;

use aws::{FetchTransport, HttpTransport, S3Client, StsClient};
use config::Config;
use errors::AppResult;

/// Configuration and AWS clients shared by every request of an isolate.
pub struct AppContext<T = FetchTransport> {
    pub config: Config,
    pub s3: S3Client<T>,
    pub sts: StsClient<T>,
}

impl<T: HttpTransport> AppContext<T> {
    pub fn new(config: Config, s3_transport: T, sts_transport: T) -> AppResult<Self> {
        Ok(Self {
            s3: S3Client::new(&config, s3_transport)?,
            sts: StsClient::new(&config, sts_transport),
            config,
        })
    }
}

impl AppContext {
    pub fn from_env(env: &Env) -> AppResult<Self> {
        Self::new(Config::from_env(env)?, FetchTransport, FetchTransport)
    }
}

static CONTEXT_CACHE: OnceLock<Arc<AppContext>> = OnceLock::new();

/// Main entry point for the Cloudflare Worker.
///
/// The AWS context is built lazily by the routes that need it, so a
/// misconfigured deployment still serves the demo pages and health check,
/// and reports the problem as a JSON 500 with CORS headers elsewhere.
#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();
    router::handle_request(req, env).await
}

pub(crate) fn load_context(env: &Env) -> AppResult<Arc<AppContext>> {
    if let Some(ctx) = CONTEXT_CACHE.get() {
        return Ok(ctx.clone());
    }

    let ctx = Arc::new(AppContext::from_env(env)?);
    let _ = CONTEXT_CACHE.set(ctx.clone());
    Ok(ctx)
}
