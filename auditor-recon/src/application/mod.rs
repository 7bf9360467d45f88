//! Application layer for reconnaissance

pub mod aggregator;
pub mod use_cases;

pub use use_cases::{EnumerateSubdomainsUseCase, FingerprintUseCase, ScanPortsUseCase};
