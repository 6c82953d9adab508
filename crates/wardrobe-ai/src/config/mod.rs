use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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
    pub database: DatabaseConfig,
    pub remote: RemoteServicesConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database = DatabaseConfig {
            url: non_blank_var("DATABASE_URL"),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
        };

        let remote = RemoteServicesConfig {
            affinity_url: env::var("AFFINITY_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            weather_api_key: non_blank_var("OPENWEATHER_API_KEY"),
            weather_city: env::var("WEATHER_CITY").unwrap_or_else(|_| "London".to_string()),
            weather_base_url: env::var("WEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5".to_string()),
            timeout: Duration::from_millis(parse_var("REMOTE_TIMEOUT_MS", 5_000)?),
            retry_attempts: parse_var("STORE_RETRY_ATTEMPTS", 3)?,
            retry_base_delay: Duration::from_millis(parse_var("STORE_RETRY_BASE_DELAY_MS", 100)?),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database,
            remote,
        })
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_blank_var(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber { key }),
        None => Ok(default),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Catalog and rating store connection. Without a URL the service runs on
/// in-memory stores.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Endpoints and call budget for the image-affinity and weather services.
#[derive(Debug, Clone)]
pub struct RemoteServicesConfig {
    pub affinity_url: String,
    pub weather_api_key: Option<String>,
    pub weather_city: String,
    pub weather_base_url: String,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
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
                write!(f, "{key} must be a non-negative integer")
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
            "DATABASE_URL",
            "DATABASE_MAX_CONNECTIONS",
            "AFFINITY_SERVICE_URL",
            "OPENWEATHER_API_KEY",
            "WEATHER_CITY",
            "WEATHER_BASE_URL",
            "REMOTE_TIMEOUT_MS",
            "STORE_RETRY_ATTEMPTS",
            "STORE_RETRY_BASE_DELAY_MS",
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
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.database.url.is_none());
        assert_eq!(config.remote.affinity_url, "http://localhost:8000");
        assert_eq!(config.remote.weather_city, "London");
        assert!(config.remote.weather_api_key.is_none());
        assert_eq!(config.remote.timeout, Duration::from_secs(5));
        assert_eq!(config.remote.retry_attempts, 3);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8080));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("OPENWEATHER_API_KEY", "   ");
        env::set_var("REMOTE_TIMEOUT_MS", "250");
        let config = AppConfig::load().expect("config loads");
        assert!(config.remote.weather_api_key.is_none());
        assert_eq!(config.remote.timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REMOTE_TIMEOUT_MS", "soon");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key }) => assert_eq!(key, "REMOTE_TIMEOUT_MS"),
            other => panic!("expected invalid number, got {other:?}"),
        }
        reset_env();
    }
}
