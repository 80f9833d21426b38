//! Core components for the cumulo storage client.
//!
//! This crate provides the foundational types shared by every cumulo crate:
//! the error taxonomy, the request canonicalization context used for
//! signing, hash and time helpers, and the [`HttpSend`] transport seam.
//!
//! ## Overview
//!
//! - [`Error`] / [`ErrorKind`]: the four failure kinds every operation can
//!   surface (auth, transport, service, parse), with provider reason codes
//!   attached when the service supplied one.
//! - [`SigningRequest`]: a decomposed view of an `http::request::Parts`
//!   that signers canonicalize and write back.
//! - [`HttpSend`]: the async transport trait. The client never talks to the
//!   network directly; it hands signed requests to an `HttpSend`
//!   implementation.
//!
//! ## Utilities
//!
//! - [`hash`]: base64 and HMAC-SHA256 helpers used by shared key signing.
//! - [`time`]: UTC timestamps in the wire formats (RFC 1123, RFC 3339).
//! - [`utils`]: secret redaction for `Debug` output.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};
mod http;
pub use http::HttpSend;
mod request;
pub use request::SigningRequest;
