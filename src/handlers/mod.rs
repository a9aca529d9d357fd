//! # HTTP Request Handlers
//!
//! Handlers are split by concern:
//!
//! - **signing**: federation tokens and presigned single-request uploads
//! - **multipart**: the multipart upload lifecycle
//! - **assets**: demo pages and the widget bundle
//!
//! Each handler has a request-independent core that takes the
//! [`crate::AppContext`] and typed parameters, and a thin `handle_*` wrapper that
//! reads the request, logs, and builds the response.

pub mod assets;
pub mod multipart;
pub mod signing;

use serde::de::DeserializeOwned;
use serde::Serialize;
use worker::*;

use crate::config::Config;
use crate::constants::SERVICE_NAME;
use crate::errors::AppResult;
use crate::logging::Logger;
use crate::middleware::CorsMiddleware;
use crate::router::Route;
use crate::utils::parse_body;

/// Runs the handler for `route`.
///
/// The AWS context is loaded only for routes that need it. Everything else
/// answers even when AWS settings are missing.
pub async fn dispatch(
    route: Route,
    req: &mut Request,
    url: &Url,
    env: &Env,
    logger: &Logger,
) -> AppResult<Response> {
    if !route.requires_aws() {
        return dispatch_local(route, env, logger);
    }

    let ctx = crate::load_context(env)?;
    match route {
        Route::FederationToken => signing::handle_federation_token(&ctx, logger).await,
        Route::SignFromQuery => signing::handle_sign_from_query(url, &ctx, logger),
        Route::SignFromBody => signing::handle_sign_from_body(req, &ctx, logger).await,
        Route::CreateMultipart => multipart::handle_create(req, &ctx, logger).await,
        Route::SignPart {
            upload_id,
            part_number,
        } => multipart::handle_sign_part(url, &upload_id, &part_number, &ctx, logger),
        Route::ListParts { upload_id } => {
            multipart::handle_list_parts(url, &upload_id, &ctx, logger).await
        }
        Route::CompleteMultipart { upload_id } => {
            multipart::handle_complete(req, url, &upload_id, &ctx, logger).await
        }
        Route::AbortMultipart { upload_id } => {
            multipart::handle_abort(url, &upload_id, &ctx, logger).await
        }
        _ => handle_not_found(),
    }
}

fn dispatch_local(route: Route, env: &Env, logger: &Logger) -> AppResult<Response> {
    match route {
        Route::Preflight => Ok(CorsMiddleware::handle_preflight()?),
        Route::Health => handle_health_check(),
        Route::Page(page) => assets::serve_page(page, &Config::tus_endpoint_from_env(env)),
        Route::RedirectToIndex => assets::redirect_to_index(),
        Route::Bundle(bundle) => assets::serve_bundle(bundle, logger),
        _ => handle_not_found(),
    }
}

/// Provides a health check endpoint for monitoring and load balancer probes.
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "s3-upload-signer-cf-workers",
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
pub fn handle_health_check() -> AppResult<Response> {
    json_response(&serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub fn handle_not_found() -> AppResult<Response> {
    Ok(Response::error("Not Found", 404)?)
}

pub(crate) fn json_response<B: Serialize>(body: &B) -> AppResult<Response> {
    Ok(Response::from_json(body)?)
}

/// Reads the request body as JSON or urlencoded form, by content type.
pub(crate) async fn read_params<T: DeserializeOwned>(req: &mut Request) -> AppResult<T> {
    let content_type = req.headers().get("Content-Type")?;
    let body = req.text().await?;
    parse_body(content_type.as_deref(), &body)
}
