//! Client configuration for the agenda backend.
//!
//! `GatewayConfig` carries the backend base URL, HTTP timeout, page size and
//! the fixed tenant fields every login request must include. The CLI builds
//! it from a stored profile; tests build it directly.

use std::fmt;
use std::time::Duration;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "https://apiv3.bilsoft.com";
pub const DEFAULT_BRANCH_NAME: &str = "Merkez";
pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Fixed tenant fields sent with every login.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantConfig {
    /// Accounting period year (`donemYil`); defaults to the current year.
    #[serde(default)]
    pub period_year: Option<String>,
    /// Branch name (`subeAd`).
    #[serde(default)]
    pub branch_name: Option<String>,
    /// Integration account name (`apiKullaniciAdi`).
    #[serde(default)]
    pub api_username: Option<String>,
    /// Integration account secret (`apiKullaniciSifre`).
    #[serde(default)]
    pub api_password: Option<String>,
}

impl TenantConfig {
    pub fn period_year(&self) -> String {
        normalize_text_option(self.period_year.clone())
            .unwrap_or_else(|| chrono::Local::now().year().to_string())
    }

    pub fn branch_name(&self) -> String {
        normalize_text_option(self.branch_name.clone())
            .unwrap_or_else(|| DEFAULT_BRANCH_NAME.to_string())
    }

    pub fn api_username(&self) -> Result<String> {
        normalize_text_option(self.api_username.clone())
            .ok_or_else(|| Error::Config("tenant api_username is not configured".to_string()))
    }

    pub fn api_password(&self) -> Result<String> {
        normalize_text_option(self.api_password.clone())
            .ok_or_else(|| Error::Config("tenant api_password is not configured".to_string()))
    }
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TenantConfig")
            .field("period_year", &self.period_year)
            .field("branch_name", &self.branch_name)
            .field("api_username", &self.api_username)
            .field("api_password", &"[REDACTED]")
            .finish()
    }
}

/// Everything the HTTP gateway needs to reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    base_url: String,
    pub tenant: TenantConfig,
    pub page_size: u32,
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Build a config with a validated, slash-trimmed base URL.
    pub fn new(base_url: impl Into<String>, tenant: TenantConfig) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            tenant,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path such as `Ajanda/getall`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Trim the URL, require an http(s) scheme and drop trailing slashes.
pub fn normalize_base_url(raw: String) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("API base URL must not be empty".to_string()))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url(" https://apiv3.example.com/ ".to_string()).unwrap(),
            "https://apiv3.example.com"
        );
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("apiv3.example.com".to_string()).is_err());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config =
            GatewayConfig::new("https://api.example.com/", TenantConfig::default()).unwrap();
        assert_eq!(
            config.endpoint("/Ajanda/getall"),
            "https://api.example.com/Ajanda/getall"
        );
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn tenant_defaults_fill_year_and_branch() {
        let tenant = TenantConfig::default();
        assert_eq!(tenant.branch_name(), "Merkez");
        assert_eq!(tenant.period_year().len(), 4);
        assert!(matches!(tenant.api_username(), Err(Error::Config(_))));
    }

    #[test]
    fn tenant_debug_redacts_api_password() {
        let tenant = TenantConfig {
            api_password: Some("very-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{tenant:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
