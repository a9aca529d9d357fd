//! # Request Routing and Dispatch
//!
//! Matches the method and path of an incoming request to a [`Route`] and
//! hands it to the handlers. Path parameters are percent-decoded once here,
//! so handlers always see the raw upload id and part number.
//!
//! ## Supported Routes
//!
//! - `GET /s3/sts` - Temporary credentials for client-side signing
//! - `GET /s3/params`, `POST /s3/sign` - Presigned single-request upload
//! - `POST /s3/multipart` - Create a multipart upload
//! - `GET /s3/multipart/:uploadId/:partNumber` - Presign one part
//! - `GET /s3/multipart/:uploadId` - List uploaded parts
//! - `POST /s3/multipart/:uploadId/complete` - Complete the upload
//! - `DELETE /s3/multipart/:uploadId` - Abort the upload
//! - `GET /health` - Health check endpoint
//! - `GET /`, `/withCustomEndpoints.html`, `/tus.html` - Demo pages
//! - `GET /uppy.min.mjs`, `/uppy.min.css` - Widget bundle
//! - `OPTIONS *` - CORS preflight requests

use worker::*;

use crate::handlers::assets::{Bundle, Page};
use crate::handlers::dispatch;
use crate::logging::Logger;
use crate::middleware::CorsMiddleware;
use crate::utils::decode_path_segment;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Health,
    FederationToken,
    SignFromQuery,
    SignFromBody,
    CreateMultipart,
    SignPart { upload_id: String, part_number: String },
    ListParts { upload_id: String },
    CompleteMultipart { upload_id: String },
    AbortMultipart { upload_id: String },
    Page(Page),
    RedirectToIndex,
    Bundle(Bundle),
    NotFound,
}

impl Route {
    /// Resolves a route from the method and the raw (still encoded) path.
    ///
    /// A single trailing slash is ignored, as are empty path parameters.
    pub fn resolve(method: &Method, path: &str) -> Self {
        if *method == Method::Options {
            return Route::Preflight;
        }

        let trimmed = match path.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        };
        let segments: Vec<&str> = trimmed
            .strip_prefix('/')
            .unwrap_or(trimmed)
            .split('/')
            .collect();

        match (method, segments.as_slice()) {
            (Method::Get, [""]) => Route::Page(Page::Index),
            (Method::Get, ["index.html"]) => Route::RedirectToIndex,
            (Method::Get, ["withCustomEndpoints.html"]) => Route::Page(Page::CustomEndpoints),
            (Method::Get, ["tus.html"]) => Route::Page(Page::Tus),
            (Method::Get, ["uppy.min.mjs"]) => Route::Bundle(Bundle::Script),
            (Method::Get, ["uppy.min.css"]) => Route::Bundle(Bundle::Stylesheet),
            (Method::Get, ["health"]) => Route::Health,

            (Method::Get, ["s3", "sts"]) => Route::FederationToken,
            (Method::Get, ["s3", "params"]) => Route::SignFromQuery,
            (Method::Post, ["s3", "sign"]) => Route::SignFromBody,
            (Method::Post, ["s3", "multipart"]) => Route::CreateMultipart,

            (Method::Get, ["s3", "multipart", upload_id, part_number])
                if !upload_id.is_empty() && !part_number.is_empty() =>
            {
                Route::SignPart {
                    upload_id: decode_path_segment(upload_id),
                    part_number: decode_path_segment(part_number),
                }
            }
            (Method::Post, ["s3", "multipart", upload_id, "complete"]) if !upload_id.is_empty() => {
                Route::CompleteMultipart {
                    upload_id: decode_path_segment(upload_id),
                }
            }
            (Method::Get, ["s3", "multipart", upload_id]) if !upload_id.is_empty() => {
                Route::ListParts {
                    upload_id: decode_path_segment(upload_id),
                }
            }
            (Method::Delete, ["s3", "multipart", upload_id]) if !upload_id.is_empty() => {
                Route::AbortMultipart {
                    upload_id: decode_path_segment(upload_id),
                }
            }

            _ => Route::NotFound,
        }
    }

    /// Whether the route signs or calls AWS and so needs the full config.
    pub fn requires_aws(&self) -> bool {
        match self {
            Route::FederationToken
            | Route::SignFromQuery
            | Route::SignFromBody
            | Route::CreateMultipart
            | Route::SignPart { .. }
            | Route::ListParts { .. }
            | Route::CompleteMultipart { .. }
            | Route::AbortMultipart { .. } => true,
            Route::Preflight
            | Route::Health
            | Route::Page(_)
            | Route::RedirectToIndex
            | Route::Bundle(_)
            | Route::NotFound => false,
        }
    }
}

/// Routes a request, turning handler errors into JSON responses and adding
/// the CORS headers to whatever comes back.
///
/// A configuration error surfaces here as a JSON 500, and only on the
/// routes that need AWS settings.
pub async fn handle_request(mut req: Request, env: Env) -> Result<Response> {
    let url = req.url()?;
    let method = req.method();
    let logger = Logger::for_request(&method.to_string(), url.path());
    let route = Route::resolve(&method, url.path());
    logger.info("Request received", None);

    let response = match dispatch(route, &mut req, &url, &env, &logger).await {
        Ok(response) => response,
        Err(err) => {
            let status = err.status().as_u16();
            if status >= 500 {
                logger.error(&err.to_string(), crate::log_data!("status" => status));
            } else {
                logger.warn(&err.to_string(), crate::log_data!("status" => status));
            }
            err.to_response()?
        }
    };

    CorsMiddleware::apply_headers(response)
}
