use std::fmt::{Debug, Formatter};

use cumulo_core::utils::Redact;
use cumulo_core::{Error, Result};

use crate::constants::DEFAULT_ENDPOINT_SUFFIX;

/// Credential for a storage account.
///
/// Constructed once at startup and held by the client for its lifetime.
/// Immutable after construction.
#[derive(Clone)]
pub enum Credential {
    /// Account name plus the base64 account key. Requests are signed with
    /// an `Authorization: SharedKey` header.
    SharedKey {
        /// Storage account name.
        account_name: String,
        /// Base64 encoded account key.
        account_key: String,
    },
    /// Account name plus a pre-issued SAS token, appended verbatim to the
    /// query string of every request.
    SasToken {
        /// Storage account name.
        account_name: String,
        /// SAS token, without a leading `?`.
        token: String,
    },
}

impl Credential {
    /// Create a shared key credential.
    pub fn with_shared_key(
        account_name: impl Into<String>,
        account_key: impl Into<String>,
    ) -> Self {
        Self::SharedKey {
            account_name: account_name.into(),
            account_key: account_key.into(),
        }
    }

    /// Create a SAS token credential.
    pub fn with_sas_token(account_name: impl Into<String>, token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.strip_prefix('?').map(str::to_string).unwrap_or(token);
        Self::SasToken {
            account_name: account_name.into(),
            token,
        }
    }

    /// Storage account name this credential belongs to.
    pub fn account_name(&self) -> &str {
        match self {
            Credential::SharedKey { account_name, .. } => account_name,
            Credential::SasToken { account_name, .. } => account_name,
        }
    }

    /// Check that the credential carries enough material to sign with.
    pub fn is_valid(&self) -> bool {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => !account_name.is_empty() && !account_key.is_empty(),
            Credential::SasToken {
                account_name,
                token,
            } => !account_name.is_empty() && !token.is_empty(),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => f
                .debug_struct("SharedKey")
                .field("account_name", account_name)
                .field("account_key", &Redact::from(account_key))
                .finish(),
            Credential::SasToken {
                account_name,
                token,
            } => f
                .debug_struct("SasToken")
                .field("account_name", account_name)
                .field("token", &Redact::from(token))
                .finish(),
        }
    }
}

/// The three resource families, each served from its own host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Blob containers and blobs.
    Blob,
    /// Queues and queue messages.
    Queue,
    /// Tables and entities.
    Table,
}

impl Service {
    fn subdomain(&self) -> &'static str {
        match self {
            Service::Blob => "blob",
            Service::Queue => "queue",
            Service::Table => "table",
        }
    }
}

/// Per-service endpoint roots for one account.
///
/// By default endpoints are derived from the account name and the standard
/// endpoint suffix. A custom suffix or fully custom per-service roots can
/// be supplied for private deployments and emulators.
#[derive(Debug, Clone)]
pub struct Endpoints {
    blob: String,
    queue: String,
    table: String,
}

impl Endpoints {
    /// Endpoints for an account on the default suffix.
    pub fn for_account(account_name: &str) -> Self {
        Self::for_account_with_suffix(account_name, DEFAULT_ENDPOINT_SUFFIX)
    }

    /// Endpoints for an account on a custom endpoint suffix.
    pub fn for_account_with_suffix(account_name: &str, suffix: &str) -> Self {
        let root = |service: Service| {
            format!("https://{account_name}.{}.{suffix}", service.subdomain())
        };
        Self {
            blob: root(Service::Blob),
            queue: root(Service::Queue),
            table: root(Service::Table),
        }
    }

    /// Replace the blob endpoint root, e.g. `https://127.0.0.1:10000/devaccount`.
    pub fn with_blob(mut self, root: impl Into<String>) -> Self {
        self.blob = trim_trailing_slash(root.into());
        self
    }

    /// Replace the queue endpoint root.
    pub fn with_queue(mut self, root: impl Into<String>) -> Self {
        self.queue = trim_trailing_slash(root.into());
        self
    }

    /// Replace the table endpoint root.
    pub fn with_table(mut self, root: impl Into<String>) -> Self {
        self.table = trim_trailing_slash(root.into());
        self
    }

    /// Endpoint root for the given service, without a trailing slash.
    pub fn root(&self, service: Service) -> &str {
        match service {
            Service::Blob => &self.blob,
            Service::Queue => &self.queue,
            Service::Table => &self.table,
        }
    }

    /// Build a full URL under a service root.
    ///
    /// `path` must start with `/`; query pairs are percent encoded here.
    pub fn url(&self, service: Service, path: &str, query: &[(String, String)]) -> Result<String> {
        if !path.starts_with('/') {
            return Err(Error::auth(format!("resource path must start with '/': {path}")));
        }

        let mut url = format!("{}{}", self.root(service), path);
        for (i, (k, v)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(k);
            if !v.is_empty() {
                url.push('=');
                url.push_str(
                    &percent_encoding::percent_encode(
                        v.as_bytes(),
                        &crate::constants::QUERY_ENCODE_SET,
                    )
                    .to_string(),
                );
            }
        }
        Ok(url)
    }
}

fn trim_trailing_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let ep = Endpoints::for_account("myacct");
        assert_eq!(ep.root(Service::Blob), "https://myacct.blob.core.windows.net");
        assert_eq!(ep.root(Service::Queue), "https://myacct.queue.core.windows.net");
        assert_eq!(ep.root(Service::Table), "https://myacct.table.core.windows.net");
    }

    #[test]
    fn test_url_encodes_query_values() {
        let ep = Endpoints::for_account("myacct");
        let url = ep
            .url(
                Service::Table,
                "/mytable()",
                &[("$filter".to_string(), "Rating gt 3".to_string())],
            )
            .unwrap();
        assert_eq!(
            url,
            "https://myacct.table.core.windows.net/mytable()?$filter=Rating%20gt%203"
        );
    }

    #[test]
    fn test_custom_root_trims_slash() {
        let ep = Endpoints::for_account("dev").with_blob("https://127.0.0.1:10000/dev/");
        assert_eq!(ep.root(Service::Blob), "https://127.0.0.1:10000/dev");
    }

    #[test]
    fn test_credential_debug_redacts_key() {
        let cred = Credential::with_shared_key("myacct", "c2VjcmV0LXNlY3JldC1zZWNyZXQ=");
        let s = format!("{cred:?}");
        assert!(!s.contains("c2VjcmV0LXNlY3JldC1zZWNyZXQ="));
        assert!(s.contains("myacct"));
    }

    #[test]
    fn test_sas_token_strips_question_mark() {
        let cred = Credential::with_sas_token("myacct", "?sv=2021&sig=abc");
        match cred {
            Credential::SasToken { token, .. } => assert_eq!(token, "sv=2021&sig=abc"),
            _ => unreachable!(),
        }
    }
}
