//! Domain layer for reconnaissance

pub mod adapter;
pub mod entities;
pub mod value_objects;

pub use adapter::{AdapterError, AdapterErrorKind, ToolAdapter, run_adapter};
pub use entities::{PortProbeOutcome, SignatureMatch, SubdomainCandidates, TechCategory, TechFingerprint};
pub use value_objects::{
    FAST_PORTS, compact_ports, domain_from_target, fallback_ports, guess_service, host_from_target,
    is_within_domain, normalize_hostname, parse_port_spec, requested_ports, web_url_from_target,
};

/// Adapter contributing candidate hostnames for a domain
pub type SubdomainSource = dyn ToolAdapter<Output = SubdomainCandidates>;

/// Adapter deciding whether a hostname answers over HTTP or HTTPS
pub type LivenessProbe = dyn ToolAdapter<Output = bool>;

/// Adapter probing a host's ports
pub type PortProber = dyn ToolAdapter<Output = PortProbeOutcome>;

/// Adapter fetching and fingerprinting a web target
pub type Fingerprinter = dyn ToolAdapter<Output = TechFingerprint>;
