//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::scan::ScanType;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub dispatch: DispatchConfig,
    pub recon: ReconConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Serve the OpenAPI document at `/api-docs/openapi.json`
    pub enable_docs: bool,
    pub request_timeout_seconds: u64,
    /// Grace period given to background tasks after a shutdown signal
    pub shutdown_timeout_seconds: u64,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_docs: true,
            request_timeout_seconds: 30,
            shutdown_timeout_seconds: 5,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set
    pub level: String,
    /// Either `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Job persistence configuration
///
/// When `url` is unset the in-memory job store is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connect_timeout_seconds: 5,
            run_migrations: true,
        }
    }
}

/// Admission and concurrency settings for one scan-type lane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Jobs of this lane allowed to execute at the same time
    pub max_concurrent_jobs: usize,
    /// Jobs allowed to wait in the lane before submissions are refused
    pub queue_capacity: usize,
    /// Ceiling for a single job's execution, adapters included
    pub job_timeout_seconds: u64,
}

impl LaneConfig {
    pub fn new(max_concurrent_jobs: usize, queue_capacity: usize, job_timeout_seconds: u64) -> Self {
        Self {
            max_concurrent_jobs,
            queue_capacity,
            job_timeout_seconds,
        }
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_seconds)
    }
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self::new(2, 64, 60)
    }
}

/// Per-lane dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub subdomain: LaneConfig,
    pub port_scan: LaneConfig,
    pub tech_stack: LaneConfig,
    /// Used for any other registered scan type
    pub default_lane: LaneConfig,
}

impl DispatchConfig {
    /// Lane settings for the given scan type
    pub fn lane(&self, scan_type: ScanType) -> &LaneConfig {
        match scan_type {
            ScanType::Subdomain => &self.subdomain,
            ScanType::PortScan => &self.port_scan,
            ScanType::TechStack => &self.tech_stack,
            _ => &self.default_lane,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            subdomain: LaneConfig::new(2, 64, 120),
            port_scan: LaneConfig::new(4, 64, 90),
            tech_stack: LaneConfig::new(8, 128, 30),
            default_lane: LaneConfig::default(),
        }
    }
}

/// Reconnaissance adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Subdomain enumerators used when a request does not name any
    pub subdomain_sources: Vec<String>,
    /// Labels tried by the DNS enumerator
    pub dns_wordlist: Vec<String>,
    pub crtsh_base_url: String,
    pub subfinder_executable: String,
    pub amass_executable: String,
    pub sublist3r_executable: String,
    /// Per-enumerator timeout
    pub source_timeout_seconds: u64,
    /// Per-scheme timeout of the liveness prober
    pub liveness_timeout_seconds: u64,
    pub max_concurrent_probes: usize,
    pub nmap_executable: String,
    pub connect_timeout_ms: u64,
    pub max_concurrent_connects: usize,
    /// Largest port list the TCP-connect fallback probes in full
    pub fallback_port_limit: usize,
    pub fingerprint_timeout_seconds: u64,
    pub user_agent: String,
}

impl ReconConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn fingerprint_timeout(&self) -> Duration {
        Duration::from_secs(self.fingerprint_timeout_seconds)
    }
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            subdomain_sources: vec![
                "crtsh".to_string(),
                "dns".to_string(),
                "subfinder".to_string(),
                "amass".to_string(),
            ],
            dns_wordlist: ["www", "mail", "ftp", "api", "admin", "test", "blog", "shop", "dev"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            crtsh_base_url: "https://crt.sh".to_string(),
            subfinder_executable: "subfinder".to_string(),
            amass_executable: "amass".to_string(),
            sublist3r_executable: "sublist3r".to_string(),
            source_timeout_seconds: 30,
            liveness_timeout_seconds: 5,
            max_concurrent_probes: 16,
            nmap_executable: "nmap".to_string(),
            connect_timeout_ms: 3000,
            max_concurrent_connects: 64,
            fallback_port_limit: 100,
            fingerprint_timeout_seconds: 10,
            user_agent: concat!("web-auditor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.database.validate()?;
        self.dispatch.validate()?;
        self.recon.validate()?;
        validation::validate_adapter_deadlines(&self.recon, &self.dispatch)?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("AUDITOR")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .with_list_parse_key("recon.subdomain_sources")
                    .with_list_parse_key("recon.dns_wordlist")
                    .try_parsing(true),
            );

        let mut config: Config = builder.build()?.try_deserialize()?;

        if let Ok(database_url) = std::env::var("DATABASE_URL")
            && !database_url.trim().is_empty()
        {
            config.database.url = Some(database_url);
        }

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
