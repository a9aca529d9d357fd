//! Temporary credentials and single-request presigned uploads.

use chrono::{DateTime, Utc};
use worker::*;

use super::{json_response, read_params};
use crate::aws::policy::PolicyDocument;
use crate::aws::sts::federation_duration;
use crate::aws::HttpTransport;
use crate::errors::AppResult;
use crate::logging::Logger;
use crate::log_data;
use crate::middleware::ValidationMiddleware;
use crate::models::{FederationTokenResponse, PresignedUpload, SignParams};
use crate::utils::{generate_object_key, params_from_pairs};
use crate::AppContext;

/// Issues federation credentials restricted to `s3:PutObject` on the bucket.
pub async fn federation_token<T: HttpTransport>(
    ctx: &AppContext<T>,
) -> AppResult<FederationTokenResponse> {
    let policy = PolicyDocument::put_object_only(&ctx.config.bucket).to_json()?;
    let credentials = ctx
        .sts
        .get_federation_token(&ctx.config.federation_name, ctx.config.expires_in, &policy)
        .await?;

    Ok(FederationTokenResponse {
        credentials,
        bucket: ctx.config.bucket.clone(),
        region: ctx.config.region.clone(),
    })
}

/// Presigns a `PUT` of a new object named after `params.filename`.
pub fn presigned_upload<T: HttpTransport>(
    ctx: &AppContext<T>,
    mut params: SignParams,
    now: DateTime<Utc>,
) -> AppResult<PresignedUpload> {
    let filename = ValidationMiddleware::require_filename(params.filename.take())?;
    let key = generate_object_key(&filename);
    let url = ctx
        .s3
        .presign_put_object(&key, params.media_type(), ctx.config.expires_in, now);
    Ok(PresignedUpload { url, method: "PUT" })
}

pub async fn handle_federation_token(ctx: &AppContext, logger: &Logger) -> AppResult<Response> {
    let token = federation_token(ctx).await?;
    logger.info(
        "Issued federation token",
        log_data!("expiration" => &token.credentials.expiration),
    );

    let mut response = json_response(&token)?;
    response
        .headers_mut()
        .set("Cache-Control", &credentials_cache_control(ctx.config.expires_in))?;
    Ok(response)
}

/// Credentials may be cached for as long as STS actually grants them.
fn credentials_cache_control(expires_in: u64) -> String {
    format!("public,max-age={}", federation_duration(expires_in))
}

pub fn handle_sign_from_query(url: &Url, ctx: &AppContext, logger: &Logger) -> AppResult<Response> {
    let params: SignParams = params_from_pairs(url.query_pairs())?;
    sign(params, ctx, logger)
}

pub async fn handle_sign_from_body(
    req: &mut Request,
    ctx: &AppContext,
    logger: &Logger,
) -> AppResult<Response> {
    let params: SignParams = read_params(req).await?;
    sign(params, ctx, logger)
}

fn sign(params: SignParams, ctx: &AppContext, logger: &Logger) -> AppResult<Response> {
    logger.info(
        "Signing upload",
        log_data!("filename" => &params.filename, "content_type" => params.media_type()),
    );
    json_response(&presigned_upload(ctx, params, Utc::now())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::testing::{test_context, ScriptedTransport};
    use crate::constants::ERR_FILENAME;
    use crate::errors::AppError;
    use chrono::TimeZone;
    use futures::executor::block_on;

    const TOKEN_RESPONSE: &str = "<GetFederationTokenResponse><GetFederationTokenResult><Credentials>\
        <AccessKeyId>ASIAEXAMPLE</AccessKeyId><SecretAccessKey>temp</SecretAccessKey>\
        <SessionToken>session</SessionToken><Expiration>2024-01-15T10:45:00Z</Expiration>\
        </Credentials></GetFederationTokenResult></GetFederationTokenResponse>";

    #[test]
    fn federation_token_reports_bucket_and_region() {
        let ctx = test_context(
            ScriptedTransport::new(),
            ScriptedTransport::new().respond(200, TOKEN_RESPONSE),
        );
        let token = block_on(federation_token(&ctx)).unwrap();
        assert_eq!(token.credentials.access_key_id, "ASIAEXAMPLE");
        assert_eq!(token.bucket, "uploads");
        assert_eq!(token.region, "us-east-1");
    }

    #[test]
    fn federation_token_propagates_sts_failure() {
        let ctx = test_context(
            ScriptedTransport::new(),
            ScriptedTransport::new().respond(500, "oops"),
        );
        let err = block_on(federation_token(&ctx)).unwrap_err();
        assert_eq!(err.status().as_u16(), 500);
    }

    #[test]
    fn credentials_are_cached_for_the_granted_duration() {
        assert_eq!(credentials_cache_control(3600), "public,max-age=3600");
        assert_eq!(credentials_cache_control(60), "public,max-age=900");
        assert_eq!(credentials_cache_control(200_000), "public,max-age=129600");
    }

    #[test]
    fn presigned_upload_targets_a_fresh_key() {
        let ctx = test_context(ScriptedTransport::new(), ScriptedTransport::new());
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let params = SignParams {
            filename: Some("cat.png".to_string()),
            content_type: Some("image/png".to_string()),
            mime_type: None,
        };

        let upload = presigned_upload(&ctx, params, now).unwrap();
        assert_eq!(upload.method, "PUT");
        assert!(upload
            .url
            .starts_with("https://uploads.s3.us-east-1.amazonaws.com/"));
        assert!(upload.url.contains("-cat.png?"));
        assert!(upload.url.contains("X-Amz-Expires=900"));
    }

    #[test]
    fn presigned_upload_requires_filename() {
        let ctx = test_context(ScriptedTransport::new(), ScriptedTransport::new());
        let err = presigned_upload(&ctx, SignParams::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest { ref message } if message == ERR_FILENAME));
    }
}
