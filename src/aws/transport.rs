//! Outbound HTTP for AWS calls.
//!
//! Clients talk to AWS through [`HttpTransport`] so the signing and decoding
//! logic can be exercised without the Workers runtime.

use async_trait::async_trait;
use worker::wasm_bindgen::JsValue;
use worker::{Fetch, Headers, Method, Request, RequestInit};

use crate::errors::AppResult;

#[derive(Clone, Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status: u16,
    pub body: String,
}

impl OutboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: OutboundRequest) -> AppResult<OutboundResponse>;
}

/// Transport backed by the Workers `fetch` API.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn send(&self, request: OutboundRequest) -> AppResult<OutboundResponse> {
        let headers = Headers::new();
        for (name, value) in &request.headers {
            // The runtime computes Host from the URL itself.
            if name.eq_ignore_ascii_case("host") {
                continue;
            }
            headers.set(name, value)?;
        }

        let mut init = RequestInit::new();
        init.with_method(request.method.clone()).with_headers(headers);
        if let Some(body) = &request.body {
            init.with_body(Some(JsValue::from_str(body)));
        }

        let outbound = Request::new_with_init(&request.url, &init)?;
        let mut response = Fetch::Request(outbound).send().await?;
        let status = response.status_code();
        let body = response.text().await?;

        Ok(OutboundResponse { status, body })
    }
}
