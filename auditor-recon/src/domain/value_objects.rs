//! Recon value objects: targets, hostnames and port lists

use std::collections::BTreeSet;
use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use auditor_core::domain::scan::{PortScanMode, ScanOptions, ScanValidationError};

/// Well-known ports probed by a fast scan
pub const FAST_PORTS: [u16; 12] = [22, 80, 443, 21, 25, 53, 110, 143, 993, 995, 8080, 8443];

static HOSTNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_]([a-z0-9_-]{0,61}[a-z0-9_])?(\.[a-z0-9_]([a-z0-9_-]{0,61}[a-z0-9_])?)*$")
        .expect("Invalid hostname regex")
});

/// Lower-case a hostname and strip trailing dots.
///
/// Returns `None` when what remains is not a syntactically valid hostname.
pub fn normalize_hostname(raw: &str) -> Option<String> {
    let name = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if name.is_empty() || name.len() > 253 || !HOSTNAME_PATTERN.is_match(&name) {
        return None;
    }
    Some(name)
}

/// Whether `candidate` is `domain` itself or one of its subdomains
pub fn is_within_domain(candidate: &str, domain: &str) -> bool {
    candidate == domain
        || candidate
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Reduce a target to a bare host (hostname or IP address).
///
/// URLs are reduced to their host; a trailing `:port` or path is dropped.
pub fn host_from_target(target: &str) -> Result<String, ScanValidationError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(ScanValidationError::EmptyTarget);
    }

    if trimmed.contains("://") {
        let url = Url::parse(trimmed)
            .map_err(|e| ScanValidationError::invalid_target(trimmed, e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| ScanValidationError::invalid_target(trimmed, "URL has no host"))?;
        return host_from_target(host.trim_start_matches('[').trim_end_matches(']'));
    }

    let authority = trimmed.split('/').next().unwrap_or(trimmed);
    if let Ok(ip) = authority.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    let host = match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    };
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    normalize_hostname(host)
        .ok_or_else(|| ScanValidationError::invalid_target(trimmed, "not a valid hostname or IP address"))
}

/// Reduce a target to a domain name; IP addresses are rejected.
pub fn domain_from_target(target: &str) -> Result<String, ScanValidationError> {
    let host = host_from_target(target)?;
    if host.parse::<IpAddr>().is_ok() {
        return Err(ScanValidationError::invalid_target(
            target.trim(),
            "subdomain enumeration requires a domain name",
        ));
    }
    Ok(host)
}

/// Turn a target into the URL fetched by the fingerprinter.
///
/// A bare host gets an `https://` prefix; other schemes are rejected.
pub fn web_url_from_target(target: &str) -> Result<Url, ScanValidationError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(ScanValidationError::EmptyTarget);
    }

    let lowered = trimmed.to_ascii_lowercase();
    let candidate = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(ScanValidationError::invalid_target(
            trimmed,
            "only http and https URLs are supported",
        ));
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ScanValidationError::invalid_target(trimmed, e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScanValidationError::invalid_target(trimmed, "URL has no host"));
    }
    Ok(url)
}

fn parse_port(item: &str) -> Result<u16, ScanValidationError> {
    let value: u32 = item
        .trim()
        .parse()
        .map_err(|_| ScanValidationError::InvalidPortSpec(format!("'{}' is not a number", item.trim())))?;
    if !(1..=65535).contains(&value) {
        return Err(ScanValidationError::InvalidPortSpec(format!(
            "{} is outside 1-65535",
            value
        )));
    }
    Ok(value as u16)
}

/// Parse a comma-separated port spec such as `22,80,8000-8100`.
///
/// Ranges are inclusive; the result is sorted and deduplicated.
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>, ScanValidationError> {
    if spec.trim().is_empty() {
        return Err(ScanValidationError::InvalidPortSpec(
            "empty port specification".to_string(),
        ));
    }

    let mut ports = BTreeSet::new();
    for item in spec.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(ScanValidationError::InvalidPortSpec(
                "empty item in port list".to_string(),
            ));
        }

        match item.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                if start > end {
                    return Err(ScanValidationError::InvalidPortSpec(format!(
                        "range {} is reversed",
                        item
                    )));
                }
                ports.extend(start..=end);
            }
            None => {
                ports.insert(parse_port(item)?);
            }
        }
    }

    Ok(ports.into_iter().collect())
}

/// The port list a scan with these options asks for
pub fn requested_ports(options: &ScanOptions) -> Result<Vec<u16>, ScanValidationError> {
    match options.port_mode {
        PortScanMode::Fast => Ok(FAST_PORTS.to_vec()),
        PortScanMode::Full => Ok((1..=65535).collect()),
        PortScanMode::Custom => {
            let spec = options
                .ports
                .as_deref()
                .ok_or(ScanValidationError::MissingPorts)?;
            parse_port_spec(spec)
        }
    }
}

/// Restrict a requested port list for the TCP-connect fallback.
///
/// Short lists are probed in full. Longer ones shrink to their well-known
/// ports, or to their first `limit` ports when none are well-known.
pub fn fallback_ports(requested: &[u16], limit: usize) -> Vec<u16> {
    if requested.len() <= limit {
        return requested.to_vec();
    }

    let well_known: Vec<u16> = FAST_PORTS
        .iter()
        .copied()
        .filter(|port| requested.contains(port))
        .collect();
    if !well_known.is_empty() {
        return well_known;
    }

    requested.iter().copied().take(limit).collect()
}

/// Render ports as a compact nmap-style list, e.g. `21-22,80,443`.
pub fn compact_ports(ports: &[u16]) -> String {
    let sorted: BTreeSet<u16> = ports.iter().copied().collect();
    let mut ranges: Vec<(u16, u16)> = Vec::new();

    for port in sorted {
        match ranges.last_mut() {
            Some((_, end)) if u32::from(*end) + 1 == u32::from(port) => *end = port,
            _ => ranges.push((port, port)),
        }
    }

    ranges
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Best-effort service name for a port
pub fn guess_service(port: u16) -> &'static str {
    match port {
        21 => "ftp",
        22 => "ssh",
        25 => "smtp",
        53 => "dns",
        80 => "http",
        110 => "pop3",
        143 => "imap",
        443 => "https",
        993 => "imaps",
        995 => "pop3s",
        8080 => "http-alt",
        8443 => "https-alt",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("WWW.Example.COM."), Some("www.example.com".to_string()));
        assert_eq!(normalize_hostname("  api.example.com  "), Some("api.example.com".to_string()));
        assert_eq!(normalize_hostname("*.example.com"), None);
        assert_eq!(normalize_hostname(""), None);
        assert_eq!(normalize_hostname("bad host.com"), None);
    }

    #[test]
    fn test_is_within_domain() {
        assert!(is_within_domain("example.com", "example.com"));
        assert!(is_within_domain("a.b.example.com", "example.com"));
        assert!(!is_within_domain("badexample.com", "example.com"));
        assert!(!is_within_domain("example.org", "example.com"));
    }

    #[test]
    fn test_host_from_target() {
        assert_eq!(host_from_target("10.0.0.1").unwrap(), "10.0.0.1");
        assert_eq!(host_from_target("Example.com:8443").unwrap(), "example.com");
        assert_eq!(host_from_target("https://www.example.com/login").unwrap(), "www.example.com");
        assert_eq!(host_from_target("http://[::1]:8080/").unwrap(), "::1");
        assert_eq!(host_from_target("10.0.0.1:22").unwrap(), "10.0.0.1");
        assert_eq!(host_from_target("   "), Err(ScanValidationError::EmptyTarget));
        assert!(host_from_target("-oG /tmp/out").is_err());
    }

    #[test]
    fn test_domain_rejects_ip() {
        assert!(domain_from_target("192.168.1.1").is_err());
        assert_eq!(domain_from_target("example.com.").unwrap(), "example.com");
    }

    #[test]
    fn test_web_url_from_target() {
        assert_eq!(web_url_from_target("example.com").unwrap().as_str(), "https://example.com/");
        assert_eq!(
            web_url_from_target("http://example.com/app").unwrap().as_str(),
            "http://example.com/app"
        );
        assert!(web_url_from_target("ftp://example.com").is_err());
        assert!(web_url_from_target("").is_err());
    }

    #[test]
    fn test_parse_port_spec() {
        assert_eq!(parse_port_spec("80, 22,80,20-23").unwrap(), vec![20, 21, 22, 23, 80]);
        assert_eq!(parse_port_spec("65535").unwrap(), vec![65535]);

        for bad in ["", "0", "65536", "80,", "a", "90-80", "1-70000", "-5"] {
            assert!(parse_port_spec(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_requested_ports_per_mode() {
        assert_eq!(requested_ports(&ScanOptions::default()).unwrap().len(), 12);

        let full = ScanOptions {
            port_mode: PortScanMode::Full,
            ..Default::default()
        };
        assert_eq!(requested_ports(&full).unwrap().len(), 65535);

        let custom = ScanOptions {
            port_mode: PortScanMode::Custom,
            ..Default::default()
        };
        assert_eq!(requested_ports(&custom), Err(ScanValidationError::MissingPorts));
    }

    #[test]
    fn test_fallback_ports() {
        assert_eq!(fallback_ports(&[8000, 9000], 100), vec![8000, 9000]);

        let full: Vec<u16> = (1..=65535).collect();
        assert_eq!(fallback_ports(&full, 100), FAST_PORTS.to_vec());

        let high: Vec<u16> = (20000..=20500).collect();
        assert_eq!(fallback_ports(&high, 100), (20000..20100).collect::<Vec<_>>());
    }

    #[test]
    fn test_compact_ports() {
        assert_eq!(compact_ports(&FAST_PORTS), "21-22,25,53,80,110,143,443,993,995,8080,8443");
        assert_eq!(compact_ports(&(1..=65535).collect::<Vec<_>>()), "1-65535");
        assert_eq!(compact_ports(&[]), "");
    }

    #[test]
    fn test_guess_service() {
        assert_eq!(guess_service(22), "ssh");
        assert_eq!(guess_service(8443), "https-alt");
        assert_eq!(guess_service(31337), "unknown");
    }
}
