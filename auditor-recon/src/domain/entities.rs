//! Partial results produced by individual adapters

use std::collections::{BTreeMap, BTreeSet};

use auditor_core::domain::scan::PortProbeStrategy;

/// Candidate hostnames from one subdomain enumerator
pub type SubdomainCandidates = BTreeSet<String>;

/// Outcome of one port-probing strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortProbeOutcome {
    pub strategy: PortProbeStrategy,
    pub open_ports: BTreeSet<u16>,
    /// Service labels reported by the prober itself, if it reports any
    pub services: BTreeMap<u16, String>,
    /// Length of the port list this strategy probed
    pub scanned: usize,
}

impl PortProbeOutcome {
    pub fn empty(strategy: PortProbeStrategy, scanned: usize) -> Self {
        Self {
            strategy,
            open_ports: BTreeSet::new(),
            services: BTreeMap::new(),
            scanned,
        }
    }
}

/// Category a fingerprint signature assigns its label to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TechCategory {
    Cms,
    Framework,
    Language,
    Technology,
}

/// One matched signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    /// Position in the signature table; lower wins CMS ties
    pub rank: usize,
    pub category: TechCategory,
    pub label: String,
}

/// Everything one fingerprint fetch observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechFingerprint {
    pub matches: Vec<SignatureMatch>,
    /// Value of the `Server` response header
    pub server: Option<String>,
}
