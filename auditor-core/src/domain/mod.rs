//! Core domain models shared across the auditor crates

pub mod scan;
