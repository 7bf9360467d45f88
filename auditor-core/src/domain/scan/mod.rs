//! Scan handler plugin interface
//!
//! This module defines the contract between the orchestrator and the scan
//! handlers. The orchestrator only ever sees a [`ScanType`], a target, some
//! [`ScanOptions`] and the [`ScanResult`] a handler returns; how a handler
//! gathers that result is its own business.

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::*;
pub use traits::*;
pub use value_objects::*;
