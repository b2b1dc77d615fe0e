//! Blocking client for the on-demand VM API.
//!
//! # Overview
//! The remote API manages virtual machines running a conferencing server and
//! proxies that server's meeting and recording endpoints. Every call returns
//! a `{status, data, message}` envelope; this crate builds the request URLs,
//! executes the calls, and normalizes whatever comes back into an `Envelope`.
//!
//! # Design
//! - `UrlBuilder` is pure: `{base}/{customer}/vm/{route}?{query}`.
//! - `VmClient` validates identifiers before any I/O and returns an
//!   `Envelope` for everything that happens after the request leaves.
//! - The HTTP round-trip goes through the `Transport` trait; `UreqTransport`
//!   is the default and keeps certificate verification on unless configured
//!   otherwise.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod routes;
pub mod url_builder;
pub mod validate;

pub use client::VmClient;
pub use config::VmConfig;
pub use envelope::{check_response, Envelope, ErrorCode, Shape, Status};
pub use error::VmError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use url_builder::{encode_query, UrlBuilder};
