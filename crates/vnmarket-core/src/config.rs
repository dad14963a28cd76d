//! Immutable provider configuration.
//!
//! A [`RegistryConfig`] is built once at startup (defaults, a JSON document,
//! or defaults plus environment overrides) and handed to the
//! [`SourceRegistryBuilder`](crate::SourceRegistryBuilder). Adapters clone
//! what they need out of it; nothing mutates it afterwards.
//!
//! # Environment Variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `VNMARKET_HTTP_TIMEOUT_MS` | Per-request timeout for every provider |
//! | `VNMARKET_HTTP_MAX_RETRIES` | Retries after the first attempt |
//! | `VNMARKET_SSI_FIIN_KEY` | `X-Fiin-Key` header sent to SSI |
//! | `VNMARKET_SSI_FIIN_USER_ID` | `X-Fiin-User-ID` header sent to SSI |
//! | `VNMARKET_SSI_FIIN_SEED` | `X-Fiin-Seed` header sent to SSI |

use std::collections::BTreeMap;
use std::env;

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::{CoreError, ProviderId};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_TIMEOUT_MS: &str = "VNMARKET_HTTP_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "VNMARKET_HTTP_MAX_RETRIES";
pub const ENV_SSI_FIIN_KEY: &str = "VNMARKET_SSI_FIIN_KEY";
pub const ENV_SSI_FIIN_USER_ID: &str = "VNMARKET_SSI_FIIN_USER_ID";
pub const ENV_SSI_FIIN_SEED: &str = "VNMARKET_SSI_FIIN_SEED";

/// Base URLs for one provider family. Unused bases may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub market: String,
    pub fundamental: String,
    pub core: String,
    pub board: String,
}

impl ProviderEndpoints {
    /// Join a base URL and a path without doubling slashes.
    pub fn join(base: &str, path: &str) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub endpoints: ProviderEndpoints,
    /// Static headers sent with every request (opaque to the adapter).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl ProviderConfig {
    pub fn new(endpoints: ProviderEndpoints) -> Self {
        Self {
            endpoints,
            headers: BTreeMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// SSI FiinTrade + iBoard endpoints with the browser-like header set
    /// those services expect.
    pub fn ssi_default() -> Self {
        let headers = [
            ("Connection", "keep-alive"),
            (
                "sec-ch-ua",
                "\"Not A;Brand\";v=\"99\", \"Chromium\";v=\"98\", \"Google Chrome\";v=\"98\"",
            ),
            ("DNT", "1"),
            ("sec-ch-ua-mobile", "?0"),
            ("X-Fiin-Key", "KEY"),
            ("Content-Type", "application/json"),
            ("Accept", "application/json"),
            ("X-Fiin-User-ID", "ID"),
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36",
            ),
            ("X-Fiin-Seed", "SEED"),
            ("sec-ch-ua-platform", "Windows"),
            ("Origin", "https://iboard.ssi.com.vn"),
            ("Sec-Fetch-Site", "same-site"),
            ("Sec-Fetch-Mode", "cors"),
            ("Sec-Fetch-Dest", "empty"),
            ("Referer", "https://iboard.ssi.com.vn/"),
            ("Accept-Language", "en-US,en;q=0.9,vi-VN;q=0.8,vi;q=0.7"),
        ];

        headers.into_iter().fold(
            Self::new(ProviderEndpoints {
                market: String::from("https://fiin-market.ssi.com.vn"),
                fundamental: String::from("https://fiin-fundamental.ssi.com.vn"),
                core: String::from("https://fiin-core.ssi.com.vn"),
                board: String::from("https://iboard-query.ssi.com.vn"),
            }),
            |config, (name, value)| config.with_header(name, value),
        )
    }

    /// VNDIRECT finfo API; one base serves prices and company data.
    pub fn vnd_default() -> Self {
        let base = String::from("https://finfo-api.vndirect.com.vn/v4");
        Self::new(ProviderEndpoints {
            market: base.clone(),
            fundamental: base.clone(),
            core: base,
            board: String::new(),
        })
        .with_header("Accept", "application/json")
    }
}

/// Configuration for every provider the registry knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub ssi: ProviderConfig,
    pub vnd: ProviderConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ssi: ProviderConfig::ssi_default(),
            vnd: ProviderConfig::vnd_default(),
        }
    }
}

impl RegistryConfig {
    pub fn from_json_str(input: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn provider(&self, id: ProviderId) -> &ProviderConfig {
        match id {
            ProviderId::Ssi => &self.ssi,
            ProviderId::Vnd => &self.vnd,
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, CoreError> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let timeout_ms = parse_setting::<u64>(ENV_TIMEOUT_MS, &raw)?;
            if timeout_ms == 0 {
                return Err(CoreError::InvalidConfig {
                    key: ENV_TIMEOUT_MS,
                    value: raw,
                });
            }
            self.ssi.timeout_ms = timeout_ms;
            self.vnd.timeout_ms = timeout_ms;
        }

        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            let max_retries = parse_setting::<u32>(ENV_MAX_RETRIES, &raw)?;
            self.ssi.retry.max_retries = max_retries;
            self.vnd.retry.max_retries = max_retries;
        }

        for (key, header) in [
            (ENV_SSI_FIIN_KEY, "X-Fiin-Key"),
            (ENV_SSI_FIIN_USER_ID, "X-Fiin-User-ID"),
            (ENV_SSI_FIIN_SEED, "X-Fiin-Seed"),
        ] {
            if let Some(value) = lookup(key).filter(|value| !value.trim().is_empty()) {
                self.ssi.headers.insert(header.to_owned(), value);
            }
        }

        Ok(self)
    }
}

fn parse_setting<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, CoreError> {
    raw.trim().parse().map_err(|_| CoreError::InvalidConfig {
        key,
        value: raw.to_owned(),
    })
}
