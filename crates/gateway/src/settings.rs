use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use txlookup_access::DEFAULT_NETWORK;
use txlookup_api::{DEFAULT_ROUTE, HEALTH_ROUTE};

/// Read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "txlookup.toml";
pub const ENV_PREFIX: &str = "TXLOOKUP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub route: String,
    pub default_network: String,
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Extra or overriding REST endpoints, keyed by network name.
    #[serde(default)]
    pub networks: BTreeMap<String, String>,
}

impl GatewayConfig {
    /// Defaults, then the config file, then `TXLOOKUP_*` environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_from(
            config_path,
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
    }

    pub(crate) fn load_from(config_path: Option<&Path>, env: Environment) -> Result<Self> {
        let resolved_path = match config_path {
            Some(path) => {
                if !path.exists() {
                    bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                path.exists().then_some(path)
            }
        };

        let mut builder = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("route", DEFAULT_ROUTE)?
            .set_default("default_network", DEFAULT_NETWORK)?
            .set_default("request_timeout_ms", 10_000)?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?;

        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(env);

        let config: Self = builder
            .build()?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.route.starts_with('/') {
            bail!("route must start with '/', got {:?}", self.route);
        }
        if self.route.trim_end_matches('/') == HEALTH_ROUTE {
            bail!("route {:?} collides with the health endpoint", self.route);
        }
        if self.default_network.trim().is_empty() {
            bail!("default_network must not be empty");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
