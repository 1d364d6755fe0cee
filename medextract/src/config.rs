//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `MEDEXTRACT_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `MEDEXTRACT_` override YAML values
//! 3. **DATABASE_URL** - Special case: switches the store to PostgreSQL at that URL
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `MEDEXTRACT_ANALYTICS__COMPARISON__MIN_SAMPLE_SIZE=50`.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port`
//! - **Store**: `store.type` (`in_memory` or `postgres`), `store.url`, `store.pool`
//! - **Analytics**: `analytics.summary` (pricing, expected field count, default model),
//!   `analytics.comparison` (decision thresholds), `analytics.window` (look-back bounds)
//! - **Prompts**: `prompts.default_version`
//! - **Features**: `enable_metrics`, `enable_otel_export`

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analytics::{ComparisonConfig, SummaryConfig};
use crate::errors::Error;
use crate::service::WindowConfig;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "MEDEXTRACT_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Set from `DATABASE_URL`; folded into `store` on load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Where observations are kept
    pub store: StoreConfig,
    pub analytics: AnalyticsConfig,
    pub prompts: PromptConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database_url: None,
            store: StoreConfig::default(),
            analytics: AnalyticsConfig::default(),
            prompts: PromptConfig::default(),
            enable_metrics: true,
            enable_otel_export: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local store; observations are lost on restart
    #[default]
    InMemory,
    /// External PostgreSQL database, migrated on startup
    Postgres {
        url: String,
        #[serde(default)]
        pool: PoolSettings,
    },
}

/// SQLx connection pool parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_lifetime_secs > 0).then(|| Duration::from_secs(self.max_lifetime_secs))
    }
}

/// Knobs for the metrics and comparison engines.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    pub summary: SummaryConfig,
    pub comparison: ComparisonConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptConfig {
    /// Version stamped on observations that arrive without one
    pub default_version: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            default_version: "v2.0.0".to_string(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL wins over the configured store, keeping any pool settings
        if let Some(url) = config.database_url.take() {
            let pool = match &config.store {
                StoreConfig::Postgres { pool, .. } => pool.clone(),
                StoreConfig::InMemory => PoolSettings::default(),
            };
            config.store = StoreConfig::Postgres { url, pool };
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        self.analytics.summary.validate()?;
        self.analytics.comparison.validate()?;

        let window = &self.analytics.window;
        if window.default_days == 0 || window.default_days > window.max_days {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: analytics.window.default_days ({}) must be between 1 and max_days ({})",
                    window.default_days, window.max_days
                ),
            });
        }

        if self.prompts.default_version.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: prompts.default_version cannot be empty".to_string(),
            });
        }

        if let StoreConfig::Postgres { url, pool } = &self.store {
            if url.trim().is_empty() {
                return Err(Error::Internal {
                    operation: "Config validation: store.url cannot be empty for the postgres store".to_string(),
                });
            }
            if pool.max_connections == 0 || pool.min_connections > pool.max_connections {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: store.pool min_connections ({}) must not exceed max_connections ({}), which must be positive",
                        pool.min_connections, pool.max_connections
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values; MEDEXTRACT_CONFIG is the file path
            .merge(Env::prefixed("MEDEXTRACT_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{SignificancePolicy, pricing::CLAUDE_3_SONNET};
    use figment::Jail;

    fn args() -> Args {
        Args {
            config: "test.yaml".to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = Config::load(&args())?;
            assert_eq!(config.port, 3001);
            assert_eq!(config.store, StoreConfig::InMemory);
            assert_eq!(config.prompts.default_version, "v2.0.0");
            assert_eq!(config.analytics.summary.total_expected_fields, 9);
            assert_eq!(config.analytics.comparison.min_sample_size, 30);
            assert_eq!(config.analytics.window.default_days, 7);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 4000
prompts:
  default_version: v3.0.0
analytics:
  comparison:
    min_improvement_pp: 2.5
    significance: sample_size_and_z_test
  window:
    default_days: 14
"#,
            )?;

            jail.set_env("MEDEXTRACT_HOST", "127.0.0.1");
            jail.set_env("MEDEXTRACT_ANALYTICS__COMPARISON__MIN_SAMPLE_SIZE", "50");

            let config = Config::load(&args())?;

            // Env vars should override
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.analytics.comparison.min_sample_size, 50);

            // YAML values should be preserved
            assert_eq!(config.port, 4000);
            assert_eq!(config.prompts.default_version, "v3.0.0");
            assert_eq!(config.analytics.comparison.min_improvement_pp, 2.5);
            assert_eq!(config.analytics.comparison.significance, SignificancePolicy::SampleSizeAndZTest);
            assert_eq!(config.analytics.window.default_days, 14);
            assert_eq!(config.analytics.window.max_days, 90);

            Ok(())
        });
    }

    #[test]
    fn test_custom_pricing_replaces_table() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
analytics:
  summary:
    default_model: "anthropic.claude-3-sonnet-20240229-v1:0"
    pricing:
      "anthropic.claude-3-sonnet-20240229-v1:0":
        input_per_1k: 0.003
        output_per_1k: 0.015
"#,
            )?;

            let config = Config::load(&args())?;
            assert_eq!(config.analytics.summary.default_model, CLAUDE_3_SONNET);
            assert_eq!(config.analytics.summary.pricing.models().count(), 1);
            Ok(())
        });
    }

    #[test]
    fn test_database_url_switches_to_postgres() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
store:
  type: postgres
  url: postgres://localhost/ignored
  pool:
    max_connections: 3
"#,
            )?;
            jail.set_env("DATABASE_URL", "postgres://db.internal/medextract");

            let config = Config::load(&args())?;
            match config.store {
                StoreConfig::Postgres { url, pool } => {
                    assert_eq!(url, "postgres://db.internal/medextract");
                    assert_eq!(pool.max_connections, 3);
                }
                other => panic!("expected postgres store, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_invalid_threshold_rejected_on_load() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
analytics:
  comparison:
    default_confidence_level: 0.999
"#,
            )?;
            assert!(Config::load(&args()).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_unknown_field_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "not_a_setting: true\n")?;
            assert!(Config::load(&args()).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.analytics.window.default_days = 120;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.prompts.default_version = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analytics.summary.default_model = "unpriced".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.store = StoreConfig::Postgres {
            url: "postgres://localhost/medextract".to_string(),
            pool: PoolSettings {
                max_connections: 0,
                ..Default::default()
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_durations() {
        let pool = PoolSettings {
            idle_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(pool.idle_timeout(), None);
        assert_eq!(pool.max_lifetime(), Some(Duration::from_secs(1800)));
        assert_eq!(pool.acquire_timeout(), Duration::from_secs(30));
    }
}
