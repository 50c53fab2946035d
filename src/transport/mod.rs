pub mod http;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

pub use http::{send, send_blocking};

/// Query parameters in insertion order. Unset values are kept until
/// serialization and then dropped, never encoded as empty or null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Option<String>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<impl ToString>) {
        self.entries.push((key.into(), value.map(|v| v.to_string())));
    }

    pub fn with(mut self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        self.insert(key, value);
        self
    }

    /// Pairs ready for the query string, unset entries filtered out.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.entries
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }
}

/// Method, path and query for a single API call. The path is relative to
/// the client's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>, params: QueryParams) -> Self {
        Self {
            method,
            url: url.into(),
            params: params.into_pairs(),
        }
    }

    pub fn full_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.url.trim_start_matches('/')
        )
    }
}

/// Response as delivered by the transport, before any decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content: Bytes,
    pub headers: HeaderMap,
}

/// Raw response metadata together with the typed result, if one was parsed.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub status_code: StatusCode,
    pub content: Bytes,
    pub headers: HeaderMap,
    pub parsed: Option<T>,
}

impl<T> Response<T> {
    pub fn from_raw(raw: RawResponse, parsed: Option<T>) -> Self {
        Self {
            status_code: raw.status,
            content: raw.content,
            headers: raw.headers,
            parsed,
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        self.parsed
    }
}
