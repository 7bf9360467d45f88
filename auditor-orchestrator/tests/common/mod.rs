//! Shared test support for auditor-orchestrator

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;
