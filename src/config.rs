use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fmt;
use url::Url;

use crate::secrets::SecretsManager;
use crate::vinti4::GatewayError;

pub const DEFAULT_CURRENCY: &str = "132";
pub const DEFAULT_LANGUAGE: &str = "pt";

/// Raw process configuration as read from the environment. Gateway values are
/// kept optional here; [`GatewayConfig::from_config`] decides what is fatal.
#[derive(Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub log_format: String,
    pub pos_id: Option<String>,
    pub pos_auth_code: Option<String>,
    pub merchant_id: Option<String>,
    pub gateway_url: Option<String>,
    pub response_url: Option<String>,
    pub currency: String,
    pub language: String,
    pub status_url: Option<String>,
    pub portal_id: Option<String>,
    pub portal_password: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            log_format: log_format_from_env(),
            pos_id: non_empty_var("VINTI4_POS_ID"),
            pos_auth_code: non_empty_var("VINTI4_POS_AUTH_CODE"),
            merchant_id: non_empty_var("VINTI4_MERCHANT_ID"),
            gateway_url: non_empty_var("VINTI4_GATEWAY_URL"),
            response_url: non_empty_var("VINTI4_RESPONSE_URL"),
            currency: non_empty_var("VINTI4_CURRENCY")
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            language: non_empty_var("VINTI4_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            status_url: non_empty_var("VINTI4_STATUS_URL"),
            portal_id: non_empty_var("VINTI4_PORTAL_ID"),
            portal_password: non_empty_var("VINTI4_PORTAL_PASSWORD"),
        })
    }

    /// Reads the environment and, when the POS auth code is not set there but
    /// Vault AppRole credentials are, fetches it from Vault.
    pub async fn load() -> anyhow::Result<Self> {
        let mut config = Self::from_env()?;

        if config.pos_auth_code.is_none() && env::var("VAULT_ROLE_ID").is_ok() {
            let secrets = SecretsManager::new().await?;
            config.pos_auth_code = Some(secrets.get_pos_auth_code().await?);
            tracing::info!("POS auth code loaded from Vault");

            if config.portal_password.is_none() {
                match secrets.get_portal_password().await {
                    Ok(password) => config.portal_password = Some(password),
                    Err(e) => {
                        tracing::warn!(error = %e, "Portal password not available from Vault")
                    }
                }
            }
        }

        Ok(config)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("log_format", &self.log_format)
            .field("pos_id", &self.pos_id)
            .field("pos_auth_code", &self.pos_auth_code.as_ref().map(|_| "****"))
            .field("merchant_id", &self.merchant_id)
            .field("gateway_url", &self.gateway_url)
            .field("response_url", &self.response_url)
            .field("currency", &self.currency)
            .field("language", &self.language)
            .field("status_url", &self.status_url)
            .field("portal_id", &self.portal_id)
            .field("portal_password", &self.portal_password.as_ref().map(|_| "****"))
            .finish()
    }
}

/// `LOG_FORMAT` (`text` or `json`), readable before the rest of the
/// configuration so the subscriber exists while secrets are being fetched.
pub fn log_format_from_env() -> String {
    dotenv().ok();
    non_empty_var("LOG_FORMAT")
        .map(|format| format.to_lowercase())
        .unwrap_or_else(|| "text".to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Credentials for the gateway's transaction status API.
#[derive(Clone)]
pub struct StatusEndpoint {
    pub url: Url,
    pub portal_id: String,
    pub portal_password: String,
}

/// Immutable gateway settings shared by the request builder, the response
/// validator and the status client.
#[derive(Clone)]
pub struct GatewayConfig {
    pos_id: String,
    pos_auth_code: String,
    merchant_id: Option<String>,
    gateway_url: Url,
    response_url: Url,
    currency: String,
    language: String,
    status: Option<StatusEndpoint>,
}

impl GatewayConfig {
    pub fn new(
        pos_id: impl Into<String>,
        pos_auth_code: impl Into<String>,
        gateway_url: &str,
        response_url: &str,
    ) -> Result<Self, GatewayError> {
        let pos_id = pos_id.into().trim().to_string();
        let pos_auth_code = pos_auth_code.into();

        if pos_id.is_empty() {
            return Err(GatewayError::ConfigurationMissing("VINTI4_POS_ID"));
        }
        if pos_auth_code.trim().is_empty() {
            return Err(GatewayError::ConfigurationMissing("VINTI4_POS_AUTH_CODE"));
        }

        Ok(Self {
            pos_id,
            pos_auth_code,
            merchant_id: None,
            gateway_url: parse_url("VINTI4_GATEWAY_URL", gateway_url)?,
            response_url: parse_url("VINTI4_RESPONSE_URL", response_url)?,
            currency: DEFAULT_CURRENCY.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            status: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let pos_id = config
            .pos_id
            .as_deref()
            .ok_or(GatewayError::ConfigurationMissing("VINTI4_POS_ID"))?;
        let pos_auth_code = config
            .pos_auth_code
            .as_deref()
            .ok_or(GatewayError::ConfigurationMissing("VINTI4_POS_AUTH_CODE"))?;
        let gateway_url = config
            .gateway_url
            .as_deref()
            .ok_or(GatewayError::ConfigurationMissing("VINTI4_GATEWAY_URL"))?;
        let response_url = config
            .response_url
            .as_deref()
            .ok_or(GatewayError::ConfigurationMissing("VINTI4_RESPONSE_URL"))?;

        let mut gateway = Self::new(pos_id, pos_auth_code, gateway_url, response_url)?
            .with_currency(&config.currency)
            .with_language(&config.language);
        if let Some(merchant_id) = config.merchant_id.as_deref() {
            gateway = gateway.with_merchant_id(merchant_id);
        }

        if let Some(status_url) = config.status_url.as_deref() {
            let portal_id = config
                .portal_id
                .as_deref()
                .ok_or(GatewayError::ConfigurationMissing("VINTI4_PORTAL_ID"))?;
            let portal_password = config
                .portal_password
                .as_deref()
                .ok_or(GatewayError::ConfigurationMissing("VINTI4_PORTAL_PASSWORD"))?;
            gateway = gateway.with_status_endpoint(status_url, portal_id, portal_password)?;
        }

        Ok(gateway)
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.trim().to_string();
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.trim().to_string();
        self
    }

    pub fn with_merchant_id(mut self, merchant_id: &str) -> Self {
        self.merchant_id = Some(merchant_id.trim().to_string());
        self
    }

    pub fn with_status_endpoint(
        mut self,
        url: &str,
        portal_id: &str,
        portal_password: &str,
    ) -> Result<Self, GatewayError> {
        self.status = Some(StatusEndpoint {
            url: parse_url("VINTI4_STATUS_URL", url)?,
            portal_id: portal_id.to_string(),
            portal_password: portal_password.to_string(),
        });
        Ok(self)
    }

    pub fn pos_id(&self) -> &str {
        &self.pos_id
    }

    pub fn pos_auth_code(&self) -> &str {
        &self.pos_auth_code
    }

    pub fn merchant_id(&self) -> Option<&str> {
        self.merchant_id.as_deref()
    }

    pub fn gateway_url(&self) -> &Url {
        &self.gateway_url
    }

    pub fn response_url(&self) -> &Url {
        &self.response_url
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn status_endpoint(&self) -> Option<&StatusEndpoint> {
        self.status.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(pos_auth_code: &str) -> Self {
        Self::new(
            "90051",
            pos_auth_code,
            "https://mc.vinti4net.cv/BizMPIOnUs/CardPayment",
            "https://tickets.example.cv/payments/callback",
        )
        .expect("valid test gateway config")
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("pos_id", &self.pos_id)
            .field("pos_auth_code", &"****")
            .field("merchant_id", &self.merchant_id)
            .field("gateway_url", &self.gateway_url.as_str())
            .field("response_url", &self.response_url.as_str())
            .field("currency", &self.currency)
            .field("language", &self.language)
            .field("status_url", &self.status.as_ref().map(|s| s.url.as_str()))
            .finish()
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, GatewayError> {
    Url::parse(raw.trim()).map_err(|source| GatewayError::InvalidUrl { field, source })
}
