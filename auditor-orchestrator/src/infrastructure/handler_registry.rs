//! Handler registry for scan types

use std::collections::HashMap;
use std::sync::Arc;

use auditor_core::domain::scan::{ScanHandler, ScanType};

/// Returned when no handler is registered for a scan type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported scan type: {0}")]
pub struct HandlerNotFound(pub ScanType);

/// Registry for scan handlers
///
/// Filled once at startup, then shared read-only behind an `Arc`.
pub struct HandlerRegistry {
    handlers: HashMap<ScanType, Arc<dyn ScanHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under the scan type it reports. Replaces any earlier one.
    pub fn register(&mut self, handler: Arc<dyn ScanHandler>) {
        let scan_type = handler.scan_type();
        if self.handlers.insert(scan_type, handler).is_some() {
            tracing::warn!(scan_type = %scan_type, "Replacing previously registered scan handler");
        }
    }

    pub fn resolve(&self, scan_type: ScanType) -> Result<Arc<dyn ScanHandler>, HandlerNotFound> {
        self.handlers
            .get(&scan_type)
            .cloned()
            .ok_or(HandlerNotFound(scan_type))
    }

    /// Get all registered scan types, in declaration order
    pub fn registered_types(&self) -> Vec<ScanType> {
        ScanType::ALL
            .into_iter()
            .filter(|t| self.handlers.contains_key(t))
            .collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Arc<dyn ScanHandler>> for HandlerRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ScanHandler>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for handler in iter {
            registry.register(handler);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use auditor_core::domain::scan::{
        ScanContext, ScanExecutionError, ScanResult, TechStackResult,
    };

    struct Noop(ScanType);

    #[async_trait]
    impl ScanHandler for Noop {
        fn scan_type(&self) -> ScanType {
            self.0
        }

        async fn execute(&self, _context: &ScanContext) -> Result<ScanResult, ScanExecutionError> {
            Ok(ScanResult::TechStack(TechStackResult::default()))
        }
    }

    #[test]
    fn test_resolve_registered_and_unknown() {
        let registry: HandlerRegistry = [
            Arc::new(Noop(ScanType::TechStack)) as Arc<dyn ScanHandler>,
            Arc::new(Noop(ScanType::Subdomain)),
        ]
        .into_iter()
        .collect();

        assert!(registry.resolve(ScanType::TechStack).is_ok());
        assert_eq!(
            registry.resolve(ScanType::Xss).err(),
            Some(HandlerNotFound(ScanType::Xss))
        );
        assert_eq!(
            registry.registered_types(),
            vec![ScanType::Subdomain, ScanType::TechStack]
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            HandlerNotFound(ScanType::CmsScan).to_string(),
            "Unsupported scan type: cms_scan"
        );
    }
}
