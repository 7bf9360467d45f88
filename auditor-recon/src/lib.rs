//! Auditor Recon - Reconnaissance scan handlers
//!
//! This crate provides the handlers for the `subdomain`, `port_scan` and
//! `tech_stack` scan types. Each handler fans out to independent tool
//! adapters and merges their partial results.
//!
//! ## Features
//!
//! - Subdomain enumeration from crt.sh, a DNS wordlist, subfinder and amass
//! - HTTP/HTTPS liveness probing, once per unique hostname
//! - nmap SYN scans with a TCP-connect fallback when nmap is unavailable
//! - Header and body fingerprinting against a fixed signature table
//! - Per-adapter deadlines, capped by the job deadline
//!
//! ## Usage
//!
//! ```rust
//! use auditor_core::config::ReconConfig;
//! use auditor_recon::default_handlers;
//!
//! let handlers = default_handlers(&ReconConfig::default());
//! assert_eq!(handlers.len(), 3);
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod module;

pub use module::*;
