//! Demo pages and the upload widget bundle.
//!
//! Pages are compiled into the worker. The widget bundle is not deployed
//! with the worker, so its routes re-export the published CDN build.

use worker::*;

use crate::constants::{UPPY_CDN_SCRIPT, UPPY_CDN_STYLESHEET};
use crate::errors::AppResult;
use crate::logging::Logger;

/// Replaced with the configured TUS endpoint as a JavaScript string literal.
const TUS_ENDPOINT_PLACEHOLDER: &str = "{{TUS_ENDPOINT}}";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    /// Sign-on-server and sign-on-client dashboards.
    Index,
    /// Dashboard wired through explicit per-step endpoint callbacks.
    CustomEndpoints,
    Tus,
}

impl Page {
    fn source(self) -> &'static str {
        match self {
            Page::Index => include_str!("../../public/index.html"),
            Page::CustomEndpoints => include_str!("../../public/withCustomEndpoints.html"),
            Page::Tus => include_str!("../../public/tus.html"),
        }
    }

    pub fn render(self, tus_endpoint: &str) -> AppResult<String> {
        let source = self.source();
        if !source.contains(TUS_ENDPOINT_PLACEHOLDER) {
            return Ok(source.to_string());
        }
        let literal = serde_json::to_string(tus_endpoint)?.replace("</", "<\\/");
        Ok(source.replace(TUS_ENDPOINT_PLACEHOLDER, &literal))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bundle {
    Script,
    Stylesheet,
}

impl Bundle {
    pub fn content_type(self) -> &'static str {
        match self {
            Bundle::Script => "text/javascript",
            Bundle::Stylesheet => "text/css",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Bundle::Script => UPPY_CDN_SCRIPT,
            Bundle::Stylesheet => UPPY_CDN_STYLESHEET,
        }
    }
}

pub fn serve_page(page: Page, tus_endpoint: &str) -> AppResult<Response> {
    Ok(Response::from_html(page.render(tus_endpoint)?)?)
}

pub fn redirect_to_index() -> AppResult<Response> {
    let mut response = Response::empty()?.with_status(308);
    response.headers_mut().set("Location", "/")?;
    Ok(response)
}

pub fn serve_bundle(bundle: Bundle, logger: &Logger) -> AppResult<Response> {
    logger.info(
        "Serving CDN re-export of the widget bundle",
        crate::log_data!("content_type" => bundle.content_type()),
    );
    let mut response = Response::ok(bundle.body())?;
    response
        .headers_mut()
        .set("Content-Type", bundle.content_type())?;
    Ok(response)
}
