//! # AWS Clients
//!
//! Minimal S3 and STS clients for the Workers runtime. There is no AWS SDK
//! for `wasm32-unknown-unknown`, so requests are signed here with SigV4 and
//! sent through the `fetch` API.
//!
//! - **sigv4**: canonical requests, header signing, query presigning
//! - **s3**: presigned PUTs and the multipart upload lifecycle
//! - **sts**: `GetFederationToken` for client-side signing
//! - **policy**: inline policy attached to federation tokens
//! - **xml**: request and response documents
//! - **transport**: outbound HTTP seam

pub mod policy;
pub mod s3;
pub mod sigv4;
pub mod sts;
pub mod transport;
pub mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use s3::S3Client;
pub use sts::StsClient;
pub use transport::{FetchTransport, HttpTransport};
