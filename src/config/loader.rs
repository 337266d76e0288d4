//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use secrecy::SecretString;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the shop domain.
pub const ENV_SHOP_DOMAIN: &str = "SHOPIFY_STORE_DOMAIN";
/// Environment variable holding the Admin API access token.
pub const ENV_ACCESS_TOKEN: &str = "SHOPIFY_ADMIN_ACCESS_TOKEN";
/// Environment variable holding the removal secret.
pub const ENV_ADMIN_PASSWORD: &str = "ADMIN_PASSWORD";
/// Environment variable overriding the listener address.
pub const ENV_BIND_ADDRESS: &str = "RELAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a TOML file, apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: RelayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration from defaults plus the environment alone.
pub fn load_from_env() -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment values on top of file values. Empty values are
/// ignored so an exported-but-blank variable does not erase a file setting.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(domain) = get(ENV_SHOP_DOMAIN) {
        config.shop.domain = Some(domain);
    }
    if let Some(token) = get(ENV_ACCESS_TOKEN) {
        config.shop.access_token = Some(SecretString::new(token));
    }
    if let Some(password) = get(ENV_ADMIN_PASSWORD) {
        config.removal.admin_password = Some(SecretString::new(password));
    }
    if let Some(addr) = get(ENV_BIND_ADDRESS) {
        config.server.bind_address = addr;
    }
}
