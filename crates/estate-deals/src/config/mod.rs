use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        };

        let store_path = env::var("DEALS_STORE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            booking_fee: env_number("DEALS_BOOKING_FEE", defaults.booking_fee)?,
            booking_term_days: env_number("DEALS_BOOKING_TERM_DAYS", defaults.booking_term_days)?,
            initial_payment_percent: env_number(
                "DEALS_INITIAL_PAYMENT_PERCENT",
                defaults.initial_payment_percent,
            )?,
            comparison_limit: env_number("DEALS_COMPARISON_LIMIT", defaults.comparison_limit)?,
            estimated_completion_days: env_number(
                "DEALS_ESTIMATED_COMPLETION_DAYS",
                defaults.estimated_completion_days,
            )?,
            manager_name: env::var("DEALS_MANAGER_NAME").unwrap_or(defaults.manager_name),
        };

        engine.validate()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            storage: StorageConfig { path: store_path },
            engine,
        })
    }
}

fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Where records are persisted. `None` keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

/// Business constants of the deal lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub booking_fee: u64,
    pub booking_term_days: i64,
    pub initial_payment_percent: u8,
    pub comparison_limit: usize,
    pub estimated_completion_days: i64,
    pub manager_name: String,
}

impl EngineConfig {
    pub const MAX_BOOKING_TERM_DAYS: i64 = 365;
    pub const MAX_ESTIMATED_COMPLETION_DAYS: i64 = 3_650;
    pub const MAX_COMPARISON_LIMIT: usize = 50;

    /// Reject values the deal workflow cannot honour. Names the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (
                "DEALS_BOOKING_TERM_DAYS",
                (1..=Self::MAX_BOOKING_TERM_DAYS).contains(&self.booking_term_days),
            ),
            (
                "DEALS_ESTIMATED_COMPLETION_DAYS",
                (0..=Self::MAX_ESTIMATED_COMPLETION_DAYS).contains(&self.estimated_completion_days),
            ),
            (
                "DEALS_INITIAL_PAYMENT_PERCENT",
                self.initial_payment_percent <= 100,
            ),
            (
                "DEALS_COMPARISON_LIMIT",
                (1..=Self::MAX_COMPARISON_LIMIT).contains(&self.comparison_limit),
            ),
        ];
        match checks.into_iter().find(|(_, valid)| !valid) {
            Some((key, _)) => Err(ConfigError::InvalidNumber { key }),
            None => Ok(()),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            booking_fee: 50_000,
            booking_term_days: 7,
            initial_payment_percent: 30,
            comparison_limit: 4,
            estimated_completion_days: 90,
            manager_name: "Анна Смирнова".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a number within its accepted range")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "DEALS_STORE_PATH",
            "DEALS_BOOKING_FEE",
            "DEALS_BOOKING_TERM_DAYS",
            "DEALS_INITIAL_PAYMENT_PERCENT",
            "DEALS_COMPARISON_LIMIT",
            "DEALS_MANAGER_NAME",
            "DEALS_ESTIMATED_COMPLETION_DAYS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert!(config.storage.path.is_none());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn engine_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DEALS_BOOKING_FEE", "75000");
        env::set_var("DEALS_COMPARISON_LIMIT", "3");
        env::set_var("DEALS_STORE_PATH", "/tmp/deals.json");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.booking_fee, 75_000);
        assert_eq!(config.engine.comparison_limit, 3);
        assert_eq!(
            config.storage.path.as_deref(),
            Some(std::path::Path::new("/tmp/deals.json"))
        );
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_percent() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DEALS_INITIAL_PAYMENT_PERCENT", "140");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "DEALS_INITIAL_PAYMENT_PERCENT"
            })
        ));
        reset_env();
    }

    #[test]
    fn rejects_engine_numbers_out_of_range() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        for (key, value) in [
            ("DEALS_BOOKING_TERM_DAYS", "-7"),
            ("DEALS_BOOKING_TERM_DAYS", "0"),
            ("DEALS_BOOKING_TERM_DAYS", "100000"),
            ("DEALS_ESTIMATED_COMPLETION_DAYS", "-1"),
            ("DEALS_ESTIMATED_COMPLETION_DAYS", "1000000000"),
            ("DEALS_COMPARISON_LIMIT", "0"),
            ("DEALS_COMPARISON_LIMIT", "500"),
        ] {
            reset_env();
            env::set_var(key, value);
            match AppConfig::load() {
                Err(ConfigError::InvalidNumber { key: rejected }) => assert_eq!(rejected, key),
                other => panic!("{key}={value} should be rejected, got {other:?}"),
            }
        }
        reset_env();
    }

    #[test]
    fn engine_bounds_are_inclusive() {
        let config = EngineConfig {
            booking_term_days: EngineConfig::MAX_BOOKING_TERM_DAYS,
            estimated_completion_days: 0,
            comparison_limit: 1,
            initial_payment_percent: 100,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
