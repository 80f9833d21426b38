use anyhow::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is the transport seam of the client.
///
/// The executor hands a fully built and signed request to this trait and
/// gets back the raw response, body already collected. Production code uses
/// the reqwest implementation; tests substitute a mock that serves canned
/// pages and counts calls.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send an http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}
