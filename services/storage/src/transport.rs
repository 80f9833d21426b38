//! Sending of signed requests and classification of failures.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use cumulo_core::{Error, HttpSend, Result};

use crate::parse::parse_error_response;

/// Executes signed requests over a pluggable [`HttpSend`].
///
/// Failures are classified here: a sender error becomes a transport error
/// with the cause chained, a non-2xx status becomes a service error with
/// the provider reason code extracted from the response.
#[derive(Clone)]
pub struct Transport {
    sender: Arc<dyn HttpSend>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").field("sender", &self.sender).finish()
    }
}

impl Transport {
    /// Create a transport over the given sender.
    pub fn new(sender: Arc<dyn HttpSend>) -> Self {
        Self { sender }
    }

    /// Send a request and return the successful response.
    pub async fn send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let resp = self
            .sender
            .http_send(req)
            .await
            .map_err(|e| Error::transport("request could not be sent").with_source(e))?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let (parts, body) = resp.into_parts();
        Err(parse_error_response(parts.status, &parts.headers, &body))
    }
}
