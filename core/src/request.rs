use std::collections::BTreeMap;
use std::mem;
use std::str::FromStr;

use http::header::HeaderName;
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::Method;
use http::Uri;

use crate::time::DateTime;
use crate::{Error, Result};

/// Signing context for request.
///
/// Query pairs are kept exactly as they appear on the wire (still percent encoded),
/// and written back the same way.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, as transmitted.
    pub path: String,
    /// HTTP query parameters, as transmitted.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    v.split('&')
                        .filter(|pair| !pair.is_empty())
                        .map(|pair| match pair.split_once('=') {
                            Some((k, v)) => (k.to_string(), v.to_string()),
                            None => (pair.to_string(), String::new()),
                        })
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query = self.query_string();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = match query {
                    None => self.path,
                    Some(q) => format!("{}?{}", self.path, q),
                };
                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Rebuild the query string in its current order, `None` if empty.
    pub fn query_string(&self) -> Option<String> {
        if self.query.is_empty() {
            return None;
        }

        let mut s = String::with_capacity(self.query_size() + self.query.len() * 2);
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
        Some(s)
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Push a new query pair into query list.
    ///
    /// The value must already be percent encoded.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Get query value by filter, percent decoded.
    pub fn query_to_vec_with_filter(&self, filter: impl Fn(&str) -> bool) -> Vec<(String, String)> {
        self.query
            .iter()
            .filter(|(k, _)| filter(k))
            .map(|(k, v)| {
                (
                    k.to_string(),
                    percent_encoding::percent_decode_str(v)
                        .decode_utf8_lossy()
                        .into_owned(),
                )
            })
            .collect()
    }

    /// Convert sorted query to string.
    ///
    /// ```shell
    /// [(a, b), (c, "")] => "a=b&c"
    /// ```
    pub fn query_to_string(mut query: Vec<(String, String)>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        // Sort via query name.
        query.sort();

        for (idx, (k, v)) in query.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(&k);
            if !v.is_empty() {
                s.push_str(sep);
                s.push_str(&v);
            }
        }

        s
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Collect headers whose name starts with one of `prefixes`.
    ///
    /// Names are lowercase (as stored by `http`) and sorted. The values of one name
    /// keep the order they were inserted in. Values that aren't visible ASCII fail
    /// with `Encoding`.
    pub fn header_values_with_prefix(
        &self,
        prefixes: &[&str],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut headers = BTreeMap::<String, Vec<String>>::new();
        for name in self.headers.keys() {
            if !prefixes.iter().any(|p| name.as_str().starts_with(p)) {
                continue;
            }
            let values = self
                .headers
                .get_all(name)
                .iter()
                .map(|v| {
                    v.to_str().map(str::to_string).map_err(|_| {
                        Error::encoding(format!("header {name} is not visible ascii"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            headers.insert(name.as_str().to_string(), values);
        }
        Ok(headers)
    }

    /// Convert sorted headers to string.
    ///
    /// Values of the same header are joined by `,` and each value has its
    /// whitespace runs collapsed to one space.
    ///
    /// ```shell
    /// {a: [b], c: [d, e]} => "a:b\nc:d,e"
    /// ```
    pub fn header_to_string(headers: &BTreeMap<String, Vec<String>>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        for (idx, (k, values)) in headers.iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(k);
            s.push_str(sep);
            for (i, v) in values.iter().enumerate() {
                if i != 0 {
                    s.push(',');
                }
                s.push_str(&header_value_normalize(v));
            }
        }

        s
    }
}

/// Normalize header value: trim and collapse inner whitespace runs to one space.
pub fn header_value_normalize(v: &str) -> String {
    v.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

/// SigningMethod is the method that used in signing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SigningMethod {
    /// Signing with header, valid for this request only.
    Header,
    /// Presigning, valid until the given time.
    Query(DateTime),
}
