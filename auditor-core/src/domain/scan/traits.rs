//! Scan handler trait definition

use async_trait::async_trait;

use super::entities::ScanResult;
use super::value_objects::{
    ScanContext, ScanExecutionError, ScanOptions, ScanType, ScanValidationError,
};

/// Trait that every scan handler must implement
///
/// A handler owns one scan type. It fans out to its tool adapters, merges their
/// partial results and returns the canonical result for the job. Handlers are
/// registered once at startup and shared across workers.
#[async_trait]
pub trait ScanHandler: Send + Sync {
    /// Get the scan type this handler executes
    fn scan_type(&self) -> ScanType;

    /// Reject malformed targets or options before a job is created
    fn validate(&self, _target: &str, _options: &ScanOptions) -> Result<(), ScanValidationError> {
        Ok(())
    }

    /// Execute the scan
    ///
    /// # Arguments
    /// * `context` - Job id, target, options and the job deadline
    ///
    /// # Returns
    /// * `Ok(ScanResult)` - Merged result, variant matching [`Self::scan_type`]
    /// * `Err(ScanExecutionError)` - Job-invalidating failure
    async fn execute(&self, context: &ScanContext) -> Result<ScanResult, ScanExecutionError>;
}
