pub mod config;

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, USER_AGENT};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::VERSION;

pub use config::ClientConfig;

/// What an endpoint function needs from a client: where to send requests,
/// how to treat undocumented status codes, and the two transport handles.
pub trait ApiClient {
    fn base_url(&self) -> &str;

    /// When true, a status code the endpoint does not document is returned as
    /// [`Error::UnexpectedStatus`]. When false the parsed result is simply absent.
    fn raise_on_unexpected_status(&self) -> bool;

    fn http_client(&self) -> Result<&reqwest::Client>;

    /// Blocking transport handle. Building it from inside an async runtime panics
    /// (a reqwest restriction), so blocking callers must stay on plain threads.
    fn blocking_http_client(&self) -> Result<&reqwest::blocking::Client>;
}

#[derive(Debug, Clone)]
struct Auth {
    token: String,
    prefix: String,
    header_name: String,
}

impl Auth {
    fn header(&self) -> Result<(HeaderName, HeaderValue)> {
        let name = HeaderName::from_bytes(self.header_name.as_bytes())
            .map_err(|_| Error::InvalidHeader(self.header_name.clone()))?;
        let raw = if self.prefix.is_empty() {
            self.token.clone()
        } else {
            format!("{} {}", self.prefix, self.token)
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|_| Error::InvalidHeader(self.header_name.clone()))?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

#[derive(Debug, Clone)]
struct Settings {
    base_url: String,
    raise_on_unexpected_status: bool,
    timeout: Option<Duration>,
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    verify_ssl: bool,
    follow_redirects: bool,
    auth: Option<Auth>,
}

impl Settings {
    fn new(base_url: String) -> Self {
        Self {
            base_url,
            raise_on_unexpected_status: false,
            timeout: None,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            verify_ssl: true,
            follow_redirects: false,
            auth: None,
        }
    }

    // User-Agent first so a custom header can replace it.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        let agent = HeaderValue::from_str(&format!("dubo-client/{VERSION}"))
            .map_err(|_| Error::InvalidHeader("user-agent".into()))?;
        map.insert(USER_AGENT, agent);
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.clone()))?;
            map.insert(header_name, header_value);
        }
        if !self.cookies.is_empty() {
            let joined = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            let value =
                HeaderValue::from_str(&joined).map_err(|_| Error::InvalidHeader("cookie".into()))?;
            map.insert(COOKIE, value);
        }
        if let Some(auth) = &self.auth {
            let (name, value) = auth.header()?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

// The async and blocking builders share method names but no trait.
macro_rules! configure_builder {
    ($builder:expr, $settings:expr) => {{
        let settings = $settings;
        let mut builder = $builder
            .default_headers(settings.default_headers()?)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .redirect(if settings.follow_redirects {
                Policy::default()
            } else {
                Policy::none()
            });
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }};
}

fn get_or_build<T>(cell: &OnceLock<T>, build: impl FnOnce() -> Result<T>) -> Result<&T> {
    if let Some(existing) = cell.get() {
        return Ok(existing);
    }
    let built = build()?;
    Ok(cell.get_or_init(|| built))
}

/// Client for endpoints that need no credentials.
///
/// Transport handles are created on first use and reused afterwards, so
/// connections are pooled across calls. The `with_*` methods return a fresh
/// client without handles.
#[derive(Debug, Clone)]
pub struct Client {
    settings: Settings,
    async_client: OnceLock<reqwest::Client>,
    blocking_client: OnceLock<reqwest::blocking::Client>,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_settings(Settings::new(base_url.into()))
    }

    fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            async_client: OnceLock::new(),
            blocking_client: OnceLock::new(),
        }
    }

    fn map_settings(&self, f: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = self.settings.clone();
        f(&mut settings);
        Self::from_settings(settings)
    }

    pub fn with_raise_on_unexpected_status(&self, raise: bool) -> Self {
        self.map_settings(|s| s.raise_on_unexpected_status = raise)
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.map_settings(|s| s.timeout = Some(timeout))
    }

    /// Extra headers sent with every request. Merged over existing ones.
    pub fn with_headers<I, K, V>(&self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.map_settings(|s| {
            s.headers
                .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())))
        })
    }

    pub fn with_cookies<I, K, V>(&self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.map_settings(|s| {
            s.cookies
                .extend(cookies.into_iter().map(|(k, v)| (k.into(), v.into())))
        })
    }

    pub fn with_verify_ssl(&self, verify: bool) -> Self {
        self.map_settings(|s| s.verify_ssl = verify)
    }

    pub fn with_follow_redirects(&self, follow: bool) -> Self {
        self.map_settings(|s| s.follow_redirects = follow)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.settings.timeout
    }
}

impl ApiClient for Client {
    fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn raise_on_unexpected_status(&self) -> bool {
        self.settings.raise_on_unexpected_status
    }

    fn http_client(&self) -> Result<&reqwest::Client> {
        get_or_build(&self.async_client, || {
            debug!(base_url = %self.settings.base_url, "building async http client");
            let builder = configure_builder!(reqwest::Client::builder(), &self.settings);
            Ok(builder.build()?)
        })
    }

    fn blocking_http_client(&self) -> Result<&reqwest::blocking::Client> {
        get_or_build(&self.blocking_client, || {
            debug!(base_url = %self.settings.base_url, "building blocking http client");
            let builder = configure_builder!(reqwest::blocking::Client::builder(), &self.settings);
            Ok(builder.build()?)
        })
    }
}

/// Client that attaches a token to every request, by default as
/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    inner: Client,
}

impl AuthenticatedClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut settings = Settings::new(base_url.into());
        settings.auth = Some(Auth {
            token: token.into(),
            prefix: "Bearer".to_string(),
            header_name: "Authorization".to_string(),
        });
        Self {
            inner: Client::from_settings(settings),
        }
    }

    fn map_auth(&self, f: impl FnOnce(&mut Auth)) -> Self {
        Self {
            inner: self.inner.map_settings(|s| {
                if let Some(auth) = s.auth.as_mut() {
                    f(auth);
                }
            }),
        }
    }

    /// Scheme placed before the token. An empty prefix sends the bare token.
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.map_auth(|a| a.prefix = prefix)
    }

    pub fn with_auth_header_name(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.map_auth(|a| a.header_name = name)
    }

    pub fn with_raise_on_unexpected_status(&self, raise: bool) -> Self {
        Self {
            inner: self.inner.with_raise_on_unexpected_status(raise),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.with_timeout(timeout),
        }
    }

    pub fn with_headers<I, K, V>(&self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: self.inner.with_headers(headers),
        }
    }

    pub fn with_cookies<I, K, V>(&self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: self.inner.with_cookies(cookies),
        }
    }

    pub fn with_verify_ssl(&self, verify: bool) -> Self {
        Self {
            inner: self.inner.with_verify_ssl(verify),
        }
    }

    pub fn with_follow_redirects(&self, follow: bool) -> Self {
        Self {
            inner: self.inner.with_follow_redirects(follow),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout()
    }
}

impl ApiClient for AuthenticatedClient {
    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    fn raise_on_unexpected_status(&self) -> bool {
        self.inner.raise_on_unexpected_status()
    }

    fn http_client(&self) -> Result<&reqwest::Client> {
        self.inner.http_client()
    }

    fn blocking_http_client(&self) -> Result<&reqwest::blocking::Client> {
        self.inner.blocking_http_client()
    }
}

/// Either client kind, chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum AnyClient {
    Anonymous(Client),
    Authenticated(AuthenticatedClient),
}

impl ApiClient for AnyClient {
    fn base_url(&self) -> &str {
        match self {
            AnyClient::Anonymous(c) => c.base_url(),
            AnyClient::Authenticated(c) => c.base_url(),
        }
    }

    fn raise_on_unexpected_status(&self) -> bool {
        match self {
            AnyClient::Anonymous(c) => c.raise_on_unexpected_status(),
            AnyClient::Authenticated(c) => c.raise_on_unexpected_status(),
        }
    }

    fn http_client(&self) -> Result<&reqwest::Client> {
        match self {
            AnyClient::Anonymous(c) => c.http_client(),
            AnyClient::Authenticated(c) => c.http_client(),
        }
    }

    fn blocking_http_client(&self) -> Result<&reqwest::blocking::Client> {
        match self {
            AnyClient::Anonymous(c) => c.blocking_http_client(),
            AnyClient::Authenticated(c) => c.blocking_http_client(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let client = Client::new("http://localhost:8000");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(!client.raise_on_unexpected_status());
        assert!(client.timeout().is_none());
    }

    #[test]
    fn user_agent_carries_crate_version() {
        let headers = Client::new("http://localhost").settings.default_headers().unwrap();
        assert_eq!(headers[USER_AGENT], format!("dubo-client/{VERSION}").as_str());

        let custom = Client::new("http://localhost")
            .with_headers([("User-Agent", "acme-poller/1.0")])
            .settings
            .default_headers()
            .unwrap();
        assert_eq!(custom[USER_AGENT], "acme-poller/1.0");
    }

    #[test]
    fn with_methods_do_not_mutate_original() {
        let client = Client::new("http://localhost");
        let strict = client.with_raise_on_unexpected_status(true);
        assert!(!client.raise_on_unexpected_status());
        assert!(strict.raise_on_unexpected_status());
    }

    #[test]
    fn bearer_header_by_default() {
        let client = AuthenticatedClient::new("http://localhost", "tok-1");
        let headers = client.inner.settings.default_headers().unwrap();
        assert_eq!(headers["authorization"], "Bearer tok-1");
    }

    #[test]
    fn empty_prefix_sends_bare_token() {
        let client = AuthenticatedClient::new("http://localhost", "tok-1")
            .with_prefix("")
            .with_auth_header_name("X-Api-Key");
        let headers = client.inner.settings.default_headers().unwrap();
        assert_eq!(headers["x-api-key"], "tok-1");
        assert!(headers.get("authorization").is_none());
    }

    #[test]
    fn cookies_are_joined_into_one_header() {
        let client = Client::new("http://localhost")
            .with_cookies([("session", "s1"), ("lang", "en")])
            .with_headers([("X-Team", "data")]);
        let headers = client.settings.default_headers().unwrap();
        assert_eq!(headers["cookie"], "lang=en; session=s1");
        assert_eq!(headers["x-team"], "data");
    }

    #[test]
    fn invalid_token_is_reported() {
        let client = AuthenticatedClient::new("http://localhost", "bad\ntoken");
        let err = client.http_client().unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(name) if name == "Authorization"));
    }

    #[test]
    fn blocking_handle_is_reused() {
        let client = Client::new("http://localhost");
        let first = client.blocking_http_client().unwrap() as *const _;
        let second = client.blocking_http_client().unwrap() as *const _;
        assert_eq!(first, second);
    }
}
