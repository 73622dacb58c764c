// src/config.rs

use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrokerConfig {
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Ordered allow-list; the first entry doubles as the default symbol.
    pub symbols: Vec<String>,
    pub starting_cash: Decimal,
    /// Fraction of cash (0..=100) deployable in a single buy order.
    pub risk_percent: Decimal,
    #[serde(default = "default_cycle_secs")]
    pub cycle_secs: u64,
    #[serde(default)]
    pub live_trading: bool,
    /// Bounds the model and broker calls; a slow endpoint costs one cycle,
    /// never the process.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    pub model: ModelConfig,
    #[serde(default)]
    pub broker: Option<BrokerConfig>,
    #[serde(default)]
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        let mut cfg: AppConfig = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Startup validation. Config violations are the only process-fatal
    /// error class; everything past this point degrades per cycle.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Message("symbols must not be empty".into()));
        }
        if self.starting_cash <= Decimal::ZERO {
            return Err(ConfigError::Message(
                "starting_cash must be positive".into(),
            ));
        }
        if self.risk_percent < Decimal::ZERO || self.risk_percent > Decimal::from(100) {
            return Err(ConfigError::Message(
                "risk_percent must be within 0..=100".into(),
            ));
        }
        if self.cycle_secs == 0 {
            return Err(ConfigError::Message("cycle_secs must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.model.api_key.trim().is_empty() {
            return Err(ConfigError::Message("model.api_key is required".into()));
        }
        if self.live_trading && self.broker.is_none() {
            warn!("live_trading is set but no broker credentials are configured; forcing paper mode");
            self.live_trading = false;
        }
        Ok(())
    }

    pub fn default_symbol(&self) -> &str {
        &self.symbols[0]
    }
}

fn default_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_model_name() -> String {
    "grok-3".to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_cycle_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
