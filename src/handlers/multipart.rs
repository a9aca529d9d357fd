//! Multipart upload lifecycle: create, sign parts, list, complete, abort.
//!
//! The object key always travels in the `key` query parameter and the upload
//! id in the path, so the client can resume an upload with nothing but those
//! two values.

use chrono::{DateTime, Utc};
use worker::*;

use super::{json_response, read_params};
use crate::aws::s3::presign_lifetime;
use crate::aws::xml::Part;
use crate::aws::HttpTransport;
use crate::errors::AppResult;
use crate::log_data;
use crate::logging::Logger;
use crate::middleware::ValidationMiddleware;
use crate::models::{
    CompleteParams, CompleteResponse, CreateMultipartParams, CreateMultipartResponse,
    SignPartResponse,
};
use crate::utils::{generate_object_key, query_values};
use crate::AppContext;

pub async fn create_upload<T: HttpTransport>(
    ctx: &AppContext<T>,
    mut params: CreateMultipartParams,
) -> AppResult<CreateMultipartResponse> {
    let filename = ValidationMiddleware::require_filename(params.filename.take())?;
    let metadata = ValidationMiddleware::validate_metadata(params.metadata.take())?;
    let key = generate_object_key(&filename);

    let created = ctx
        .s3
        .create_multipart_upload(&key, params.media_type(), &metadata)
        .await?;
    Ok(CreateMultipartResponse {
        key: created.key,
        upload_id: created.upload_id,
    })
}

/// Presigns one part. The part number is checked before the key.
pub fn sign_part<T: HttpTransport>(
    ctx: &AppContext<T>,
    keys: Vec<String>,
    upload_id: &str,
    part_number: &str,
    now: DateTime<Utc>,
) -> AppResult<SignPartResponse> {
    let part_number = ValidationMiddleware::validate_part_number(part_number)?;
    let key = ValidationMiddleware::require_object_key(keys)?;

    let expires = presign_lifetime(ctx.config.expires_in);
    let url = ctx
        .s3
        .presign_upload_part(&key, upload_id, part_number, expires, now);
    Ok(SignPartResponse { url, expires })
}

pub async fn list_parts<T: HttpTransport>(
    ctx: &AppContext<T>,
    keys: Vec<String>,
    upload_id: &str,
) -> AppResult<Vec<Part>> {
    let key = ValidationMiddleware::require_object_key(keys)?;
    ctx.s3.list_all_parts(&key, upload_id).await
}

pub async fn complete_upload<T: HttpTransport>(
    ctx: &AppContext<T>,
    keys: Vec<String>,
    upload_id: &str,
    params: CompleteParams,
) -> AppResult<CompleteResponse> {
    let key = ValidationMiddleware::require_object_key(keys)?;
    let parts = ValidationMiddleware::validate_parts(params.parts.as_ref())?;

    let location = ctx
        .s3
        .complete_multipart_upload(&key, upload_id, &parts)
        .await?;
    Ok(CompleteResponse { location })
}

pub async fn abort_upload<T: HttpTransport>(
    ctx: &AppContext<T>,
    keys: Vec<String>,
    upload_id: &str,
) -> AppResult<()> {
    let key = ValidationMiddleware::require_object_key(keys)?;
    ctx.s3.abort_multipart_upload(&key, upload_id).await
}

fn object_keys(url: &Url) -> Vec<String> {
    query_values(url.query_pairs(), "key")
}

pub async fn handle_create(
    req: &mut Request,
    ctx: &AppContext,
    logger: &Logger,
) -> AppResult<Response> {
    let params: CreateMultipartParams = read_params(req).await?;
    logger.info(
        "Creating multipart upload",
        log_data!("filename" => &params.filename, "type" => params.media_type()),
    );

    let created = create_upload(ctx, params).await?;
    logger.info(
        "Multipart upload created",
        log_data!("key" => &created.key, "upload_id" => &created.upload_id),
    );
    json_response(&created)
}

pub fn handle_sign_part(
    url: &Url,
    upload_id: &str,
    part_number: &str,
    ctx: &AppContext,
    logger: &Logger,
) -> AppResult<Response> {
    let signed = sign_part(ctx, object_keys(url), upload_id, part_number, Utc::now())?;
    logger.info(
        "Signed part",
        log_data!("upload_id" => upload_id, "part_number" => part_number),
    );
    json_response(&signed)
}

pub async fn handle_list_parts(
    url: &Url,
    upload_id: &str,
    ctx: &AppContext,
    logger: &Logger,
) -> AppResult<Response> {
    let parts = list_parts(ctx, object_keys(url), upload_id).await?;
    logger.info(
        "Listed parts",
        log_data!("upload_id" => upload_id, "count" => parts.len()),
    );
    json_response(&parts)
}

pub async fn handle_complete(
    req: &mut Request,
    url: &Url,
    upload_id: &str,
    ctx: &AppContext,
    logger: &Logger,
) -> AppResult<Response> {
    let keys = object_keys(url);
    // A missing key wins over an unreadable body.
    let keys = vec![ValidationMiddleware::require_object_key(keys)?];
    let params: CompleteParams = read_params(req).await?;

    let completed = complete_upload(ctx, keys, upload_id, params).await?;
    logger.info(
        "Multipart upload completed",
        log_data!("upload_id" => upload_id, "location" => &completed.location),
    );
    json_response(&completed)
}

pub async fn handle_abort(
    url: &Url,
    upload_id: &str,
    ctx: &AppContext,
    logger: &Logger,
) -> AppResult<Response> {
    abort_upload(ctx, object_keys(url), upload_id).await?;
    logger.info("Multipart upload aborted", log_data!("upload_id" => upload_id));
    json_response(&serde_json::json!({}))
}
