use std::borrow::Cow;
use std::mem;
use std::str::FromStr;

use http::header::HeaderName;
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::Method;
use http::Uri;

use crate::Error;
use crate::Result;

/// Canonicalization context for one request.
///
/// Signing needs to see the request decomposed into method, path, query
/// pairs, and headers. We take those pieces out of `http::request::Parts`,
/// let the signer edit them, and put them back with [`SigningRequest::apply`].
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path.
    pub path: String,
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from `http::request::Parts`.
    ///
    /// Fails with an auth error when the request has no authority, since
    /// the canonicalized resource cannot be constructed without one.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTPS),
            authority: uri
                .authority
                .ok_or_else(|| Error::auth("request without authority cannot be canonicalized"))?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid a copy. They are
            // returned on apply.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to `http::request::Parts`.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if self.query.is_empty() {
                    self.path
                } else {
                    let mut s = self.path;
                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }
                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }
                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Cow<'_, str> {
        percent_encoding::percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Push a new query pair into the query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Push a pre-encoded query string into the query list.
    ///
    /// Used for SAS tokens, which must be appended verbatim.
    #[inline]
    pub fn query_append(&mut self, query: &str) {
        self.query.push((query.to_string(), String::new()));
    }

    /// Get a header value by name, or an empty string when absent.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Collect headers whose name starts with `prefix`, lowercased.
    pub fn header_to_vec_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter(|(k, _)| k.as_str().starts_with(prefix))
            .map(|(k, v)| {
                (
                    k.as_str().to_lowercase(),
                    v.to_str().expect("must be valid header").to_string(),
                )
            })
            .collect()
    }

    /// Join sorted pairs into a canonical string.
    ///
    /// ```text
    /// [(a, b), (c, d)] => "a:b\nc:d"
    /// ```
    pub fn pairs_to_string(mut pairs: Vec<(String, String)>, sep: &str, join: &str) -> String {
        pairs.sort();

        let mut s = String::with_capacity(32);
        for (idx, (k, v)) in pairs.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }
            s.push_str(&k);
            s.push_str(sep);
            s.push_str(&v);
        }

        s
    }

    /// Join sorted query pairs into a canonical string, percent decoding the
    /// values first. Pairs with empty values are emitted as bare keys.
    pub fn query_to_percent_decoded_string(
        mut query: Vec<(String, String)>,
        sep: &str,
        join: &str,
    ) -> String {
        query.sort();

        let mut s = String::with_capacity(32);
        for (idx, (k, v)) in query.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }
            s.push_str(&k);
            if !v.is_empty() {
                s.push_str(sep);
                s.push_str(&percent_encoding::percent_decode_str(&v).decode_utf8_lossy());
            }
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(uri: &str) -> http::request::Parts {
        http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_build_splits_query() {
        let mut p = parts("https://acct.blob.example.net/container?comp=list&maxresults=5");
        let ctx = SigningRequest::build(&mut p).unwrap();

        assert_eq!(ctx.path, "/container");
        assert_eq!(
            ctx.query,
            vec![
                ("comp".to_string(), "list".to_string()),
                ("maxresults".to_string(), "5".to_string())
            ]
        );
    }

    #[test]
    fn test_build_requires_authority() {
        let mut p = parts("/container?comp=list");
        assert!(SigningRequest::build(&mut p).is_err());
    }

    #[test]
    fn test_apply_round_trips_uri() {
        let uri = "https://acct.queue.example.net/myqueue/messages?numofmessages=32";
        let mut p = parts(uri);
        let ctx = SigningRequest::build(&mut p).unwrap();
        ctx.apply(&mut p).unwrap();

        assert_eq!(p.uri.to_string(), uri);
    }

    #[test]
    fn test_pairs_to_string_sorts() {
        let s = SigningRequest::pairs_to_string(
            vec![
                ("x-ms-version".to_string(), "2021-08-06".to_string()),
                ("x-ms-date".to_string(), "date".to_string()),
            ],
            ":",
            "\n",
        );
        assert_eq!(s, "x-ms-date:date\nx-ms-version:2021-08-06");
    }
}
