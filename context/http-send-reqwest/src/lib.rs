//! [`HttpSend`] implementation backed by [`reqwest`].
//!
//! Besides plain sending, this crate owns the per-host TLS trust policy.
//! Hosts registered in a [`TrustPolicy`] are served by a client that skips
//! certificate validation (for self-signed development endpoints); every
//! other host goes through the strict client. The policy is an explicit
//! value handed to the sender, so two clients with different trust policies
//! can coexist in one process.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use cumulo_core::HttpSend;
use http_body_util::BodyExt;
use log::debug;
use reqwest::{Client, Request};

/// Set of hosts for which TLS trust errors are ignored.
///
/// Registration is expected to happen before any request to the host is
/// issued; reads happen on every send. Single writer, many readers.
#[derive(Debug, Clone, Default)]
pub struct TrustPolicy {
    hosts: Arc<RwLock<HashSet<String>>>,
}

impl TrustPolicy {
    /// Create an empty policy: every host is validated strictly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore TLS trust errors for the given host.
    ///
    /// Useful when the endpoint presents a self-signed certificate. This
    /// affects only the named host; requests to any other host keep full
    /// certificate validation.
    pub fn allow_invalid_certs_for(&self, host: impl Into<String>) {
        let host = host.into();
        debug!("trust policy: ignoring TLS trust errors for host {host}");
        self.hosts.write().expect("lock poisoned").insert(host);
    }

    /// Whether trust errors are ignored for the given host.
    pub fn allows(&self, host: &str) -> bool {
        self.hosts.read().expect("lock poisoned").contains(host)
    }
}

/// HttpSend backed by a reqwest [`Client`].
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
    trust: TrustPolicy,
    // Built on first use for a trusted host.
    permissive: OnceLock<Client>,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest [`Client`].
    pub fn new(client: Client) -> Self {
        Self {
            client,
            trust: TrustPolicy::new(),
            permissive: OnceLock::new(),
        }
    }

    /// Attach a trust policy for self-signed hosts.
    pub fn with_trust_policy(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    fn client_for(&self, host: Option<&str>) -> &Client {
        match host {
            Some(host) if self.trust.allows(host) => self.permissive.get_or_init(|| {
                Client::builder()
                    .danger_accept_invalid_certs(true)
                    .build()
                    .expect("reqwest client must build")
            }),
            _ => &self.client,
        }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> anyhow::Result<http::Response<Bytes>> {
        let client = self.client_for(req.uri().host()).clone();

        let req = Request::try_from(req)?;
        let resp: http::Response<_> = client.execute(req).await?.into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body).await.map(|buf| buf.to_bytes())?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
