use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use crate::client::{AnyClient, AuthenticatedClient, Client};

const BASE_URL_ENV: &str = "DUBO_BASE_URL";
const TOKEN_ENV: &str = "DUBO_API_TOKEN";
const RAISE_ENV: &str = "DUBO_RAISE_ON_UNEXPECTED_STATUS";
const TIMEOUT_ENV: &str = "DUBO_TIMEOUT_SECS";

fn default_prefix() -> String {
    "Bearer".to_string()
}

fn default_auth_header_name() -> String {
    "Authorization".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_auth_header_name")]
    pub auth_header_name: String,
    #[serde(default)]
    pub raise_on_unexpected_status: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub follow_redirects: bool,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            prefix: default_prefix(),
            auth_header_name: default_auth_header_name(),
            raise_on_unexpected_status: false,
            timeout_secs: None,
            verify_ssl: true,
            follow_redirects: false,
            headers: BTreeMap::new(),
        }
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).context("reading config file")?;
        let cfg: ClientConfig = serde_json::from_str(&raw).context("parsing config JSON")?;
        Ok(cfg)
    }

    /// Build a config purely from `DUBO_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(BASE_URL_ENV)
            .with_context(|| format!("{BASE_URL_ENV} is not set"))?;
        let mut cfg = ClientConfig::new(base_url);
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Overlay any `DUBO_*` environment variables that are set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            self.base_url = url;
        }
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            self.token = Some(token);
        }
        if let Ok(raw) = std::env::var(RAISE_ENV) {
            self.raise_on_unexpected_status = parse_bool(&raw)
                .with_context(|| format!("{RAISE_ENV} must be true/false, got {raw:?}"))?;
        }
        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            let secs = raw
                .parse::<u64>()
                .with_context(|| format!("{TIMEOUT_ENV} must be whole seconds, got {raw:?}"))?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn into_client(self) -> AnyClient {
        let timeout = self.timeout_secs.map(Duration::from_secs);

        match self.token {
            Some(token) => {
                let mut client = AuthenticatedClient::new(self.base_url, token)
                    .with_prefix(self.prefix)
                    .with_auth_header_name(self.auth_header_name)
                    .with_raise_on_unexpected_status(self.raise_on_unexpected_status)
                    .with_verify_ssl(self.verify_ssl)
                    .with_follow_redirects(self.follow_redirects)
                    .with_headers(self.headers);
                if let Some(t) = timeout {
                    client = client.with_timeout(t);
                }
                AnyClient::Authenticated(client)
            }
            None => {
                let mut client = Client::new(self.base_url)
                    .with_raise_on_unexpected_status(self.raise_on_unexpected_status)
                    .with_verify_ssl(self.verify_ssl)
                    .with_follow_redirects(self.follow_redirects)
                    .with_headers(self.headers);
                if let Some(t) = timeout {
                    client = client.with_timeout(t);
                }
                AnyClient::Anonymous(client)
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
