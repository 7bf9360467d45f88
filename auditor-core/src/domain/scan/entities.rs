//! Scan result entities

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::value_objects::ScanType;

/// Final result of a completed scan job
///
/// The variant always matches the job's scan type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanResult {
    Subdomain(SubdomainResult),
    PortScan(PortScanResult),
    TechStack(TechStackResult),
}

impl ScanResult {
    pub fn scan_type(&self) -> ScanType {
        match self {
            Self::Subdomain(_) => ScanType::Subdomain,
            Self::PortScan(_) => ScanType::PortScan,
            Self::TechStack(_) => ScanType::TechStack,
        }
    }
}

/// Subdomains discovered for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainResult {
    /// Lower-cased hostnames without trailing dots, deduplicated across sources
    pub subdomains: BTreeSet<String>,
    /// Subset of `subdomains` that answered over HTTP or HTTPS
    pub live_subdomains: BTreeSet<String>,
}

/// Which probing strategy produced a port scan result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortProbeStrategy {
    /// External SYN scanner
    Syn,
    /// Direct TCP connect fallback
    Connect,
}

/// Open ports found on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortScanResult {
    pub open_ports: BTreeSet<u16>,
    /// Best-effort service name for each open port
    #[serde(with = "port_keyed")]
    pub services: BTreeMap<u16, String>,
    /// Length of the port list actually probed
    pub total_scanned: usize,
    pub strategy: PortProbeStrategy,
}

/// Port-keyed maps as JSON objects with decimal string keys.
///
/// `ScanResult` is internally tagged, so its content is buffered before the
/// variant is decoded and map keys reach the inner type as strings.
mod port_keyed {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(map: &BTreeMap<u16, String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        map.iter()
            .map(|(port, service)| (port.to_string(), service))
            .collect::<BTreeMap<String, &String>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u16, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        BTreeMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(port, service)| {
                port.parse::<u16>()
                    .map(|port| (port, service))
                    .map_err(|_| D::Error::custom(format!("invalid port key: {}", port)))
            })
            .collect()
    }
}

/// Technologies detected on a web target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStackResult {
    pub technologies: BTreeSet<String>,
    pub frameworks: BTreeSet<String>,
    pub programming_languages: BTreeSet<String>,
    pub cms: Option<String>,
    pub web_server: Option<String>,
}
