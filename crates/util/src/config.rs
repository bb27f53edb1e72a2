use std::{env, fmt, path::PathBuf};

use category_actions_core::{IdStrategy, ParseIdStrategyError};

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub id_strategy: IdStrategy,
    /// Destination of the Prometheus text dump written on exit.
    pub metrics_path: Option<PathBuf>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;

        let id_strategy = match env::var("APP_ID_STRATEGY") {
            Ok(value) => value.parse().map_err(ConfigError::IdStrategy)?,
            Err(_) => IdStrategy::default(),
        };

        let metrics_path = env::var_os("APP_METRICS_PATH")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            id_strategy,
            metrics_path,
        })
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    IdStrategy(ParseIdStrategyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::IdStrategy(err) => write!(f, "invalid APP_ID_STRATEGY value: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn clear_vars() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_ID_STRATEGY");
        env::remove_var("APP_METRICS_PATH");
    }

    #[test]
    fn loads_defaults_in_development() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_vars();

        let config = AppConfig::from_env().expect("config should load with defaults");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.id_strategy, IdStrategy::TimeOrdered);
        assert!(config.metrics_path.is_none());
    }

    #[test]
    fn rejects_invalid_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_vars();
        env::set_var("APP_ENV", "invalid");

        let err = AppConfig::from_env().expect_err("invalid env should error");
        assert!(matches!(err, ConfigError::InvalidEnvironment(value) if value == "invalid"));

        clear_vars();
    }

    #[test]
    fn rejects_unknown_id_strategy() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_vars();
        env::set_var("APP_ID_STRATEGY", "sequential");

        let err = AppConfig::from_env().expect_err("unknown strategy should error");
        assert!(matches!(err, ConfigError::IdStrategy(_)));
        assert!(err.to_string().contains("APP_ID_STRATEGY"));

        clear_vars();
    }

    #[test]
    fn parses_production_settings() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_vars();
        env::set_var("APP_ENV", "prod");
        env::set_var("APP_ID_STRATEGY", "random");
        env::set_var("APP_METRICS_PATH", "/var/lib/node_exporter/categories.prom");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.environment.as_str(), "production");
        assert_eq!(config.id_strategy, IdStrategy::Random);
        assert_eq!(
            config.metrics_path,
            Some(PathBuf::from("/var/lib/node_exporter/categories.prom"))
        );

        clear_vars();
    }

    #[test]
    fn empty_metrics_path_is_ignored() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_vars();
        env::set_var("APP_METRICS_PATH", "");

        let config = AppConfig::from_env().expect("config should load");
        assert!(config.metrics_path.is_none());

        clear_vars();
    }
}
