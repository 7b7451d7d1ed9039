use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub marketplace: MarketplaceConfig,
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

        let marketplace = MarketplaceConfig::load(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            marketplace,
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Marketplace policy dials shared by the coordinators.
#[derive(Debug, Clone, Copy)]
pub struct MarketplaceConfig {
    /// Percentage of each payment withheld as the platform fee.
    pub platform_fee_percent: u64,
    /// Revision requests a company may issue per project before it must
    /// either approve or reject the work outright.
    pub max_revisions: u32,
    /// Cadence of the expiry sweep that closes unassigned projects whose
    /// deadline has passed.
    pub expiry_sweep_hours: u64,
}

impl MarketplaceConfig {
    fn load(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let platform_fee_percent = parse_env_u64("PLATFORM_FEE_PERCENT", 7)?;
        if platform_fee_percent > 100 {
            return Err(ConfigError::InvalidFeePercent {
                found: platform_fee_percent,
            });
        }

        let max_revisions = parse_env_u64("MAX_SUBMISSION_REVISIONS", 2)? as u32;

        let default_sweep = match environment {
            AppEnvironment::Production => 24,
            _ => 1,
        };
        let expiry_sweep_hours = parse_env_u64("EXPIRY_SWEEP_HOURS", default_sweep)?;

        Ok(Self {
            platform_fee_percent,
            max_revisions,
            expiry_sweep_hours,
        })
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            platform_fee_percent: 7,
            max_revisions: 2,
            expiry_sweep_hours: 24,
        }
    }
}

fn parse_env_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    InvalidFeePercent { found: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a non-negative integer")
            }
            ConfigError::InvalidFeePercent { found } => {
                write!(f, "PLATFORM_FEE_PERCENT must be 0-100, found {found}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
