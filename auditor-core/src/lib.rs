//! Auditor Core - Foundation crate for the web auditor
//!
//! This crate provides the pieces shared by every other auditor crate:
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with file and environment variable support
//! - [`domain`] — The scan contract: scan types, options, results and the handler trait
//! - [`logging`] — Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! auditor-core/
//! ├── domain/
//! │   └── scan/         # ScanType, ScanOptions, ScanResult, ScanHandler
//! ├── config/           # Configuration management and validation
//! └── logging.rs        # tracing-subscriber bootstrap
//! ```
//!
//! # Configuration
//!
//! Load configuration from files and environment:
//!
//! ```rust,ignore
//! use auditor_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `AUDITOR__` prefix with double underscore separators:
//!
//! ```bash
//! AUDITOR__SERVER__PORT=8000
//! AUDITOR__DISPATCH__PORT_SCAN__MAX_CONCURRENT_JOBS=8
//! ```

pub mod config;
pub mod domain;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
