//! Configuration validation module

use crate::config::{
    DatabaseConfig, DispatchConfig, LaneConfig, LoggingConfig, ReconConfig, ServerConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },

    #[error("Database configuration error: {message}")]
    Database { message: String },

    #[error("Dispatch configuration error: {message}")]
    Dispatch { message: String },

    #[error("Recon configuration error: {message}")]
    Recon { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    pub fn recon(message: impl Into<String>) -> Self {
        Self::Recon {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so only 0 is out of range
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ValidationError::logging(format!(
                "Unknown log format '{}', expected 'json' or 'pretty'",
                other
            ))),
        }
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(ValidationError::database(
                    "Database URL must use the postgres:// or postgresql:// scheme",
                ));
            }

            if self.max_connections == 0 {
                return Err(ValidationError::database(
                    "max_connections must be greater than 0",
                ));
            }
        }

        Ok(())
    }
}

fn validate_lane(name: &str, lane: &LaneConfig) -> Result<(), ValidationError> {
    if lane.max_concurrent_jobs == 0 {
        return Err(ValidationError::dispatch(format!(
            "{}.max_concurrent_jobs must be greater than 0",
            name
        )));
    }

    if lane.queue_capacity == 0 {
        return Err(ValidationError::dispatch(format!(
            "{}.queue_capacity must be greater than 0",
            name
        )));
    }

    if lane.job_timeout_seconds == 0 {
        return Err(ValidationError::dispatch(format!(
            "{}.job_timeout_seconds must be greater than 0",
            name
        )));
    }

    Ok(())
}

impl Validate for DispatchConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_lane("subdomain", &self.subdomain)?;
        validate_lane("port_scan", &self.port_scan)?;
        validate_lane("tech_stack", &self.tech_stack)?;
        validate_lane("default_lane", &self.default_lane)?;
        Ok(())
    }
}

impl Validate for ReconConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.subdomain_sources.is_empty() {
            return Err(ValidationError::recon(
                "At least one subdomain source must be configured",
            ));
        }

        if self.liveness_timeout_seconds == 0
            || self.source_timeout_seconds == 0
            || self.fingerprint_timeout_seconds == 0
            || self.connect_timeout_ms == 0
        {
            return Err(ValidationError::recon("Adapter timeouts must be greater than 0"));
        }

        if self.max_concurrent_probes == 0 || self.max_concurrent_connects == 0 {
            return Err(ValidationError::recon(
                "Probe concurrency must be greater than 0",
            ));
        }

        if self.fallback_port_limit == 0 {
            return Err(ValidationError::recon(
                "fallback_port_limit must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Adapter timeouts may not exceed the job deadline of the lane they run in.
pub(crate) fn validate_adapter_deadlines(
    recon: &ReconConfig,
    dispatch: &DispatchConfig,
) -> Result<(), ValidationError> {
    let checks = [
        (
            "source_timeout_seconds",
            recon.source_timeout_seconds,
            "subdomain",
            dispatch.subdomain.job_timeout_seconds,
        ),
        (
            "liveness_timeout_seconds",
            recon.liveness_timeout_seconds,
            "subdomain",
            dispatch.subdomain.job_timeout_seconds,
        ),
        (
            "fingerprint_timeout_seconds",
            recon.fingerprint_timeout_seconds,
            "tech_stack",
            dispatch.tech_stack.job_timeout_seconds,
        ),
    ];

    for (adapter, adapter_secs, lane, lane_secs) in checks {
        if adapter_secs > lane_secs {
            return Err(ValidationError::recon(format!(
                "{} ({}s) exceeds the {} job timeout ({}s)",
                adapter, adapter_secs, lane, lane_secs
            )));
        }
    }

    Ok(())
}
