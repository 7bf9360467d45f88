//! Result aggregation
//!
//! Merges partial adapter outputs into one canonical result. A failing
//! adapter only fails the merge when every adapter failed with a
//! non-degradable error; otherwise failures contribute nothing.

use std::collections::BTreeSet;

use auditor_core::domain::scan::{
    PortProbeStrategy, PortScanResult, ScanExecutionError, TechStackResult,
};

use crate::domain::{
    AdapterError, PortProbeOutcome, SubdomainCandidates, TechCategory, TechFingerprint,
    guess_service, is_within_domain, normalize_hostname,
};

/// Split adapter outcomes, failing when every one failed fatally.
fn collect_outcomes<T>(
    outcomes: impl IntoIterator<Item = Result<T, AdapterError>>,
) -> Result<Vec<T>, ScanExecutionError> {
    let mut successes = Vec::new();
    let mut fatal = Vec::new();
    let mut degraded = 0usize;

    for outcome in outcomes {
        match outcome {
            Ok(value) => successes.push(value),
            Err(e) if e.is_degradable() => degraded += 1,
            Err(e) => fatal.push(e.message),
        }
    }

    if successes.is_empty() && degraded == 0 && !fatal.is_empty() {
        fatal.dedup();
        return Err(ScanExecutionError::AllAdaptersFailed(fatal.join("; ")));
    }

    Ok(successes)
}

/// Union the candidates of every enumerator.
///
/// Names are case-folded, trailing dots are stripped and anything outside
/// `domain` is dropped. The result does not depend on outcome order.
pub fn merge_subdomains(
    domain: &str,
    outcomes: impl IntoIterator<Item = Result<SubdomainCandidates, AdapterError>>,
) -> Result<BTreeSet<String>, ScanExecutionError> {
    let merged = collect_outcomes(outcomes)?
        .into_iter()
        .flatten()
        .filter_map(|name| normalize_hostname(&name))
        .filter(|name| is_within_domain(name, domain))
        .collect();

    Ok(merged)
}

/// Merge the primary and fallback port probes.
///
/// Open ports are unioned. Service labels from the primary strategy win;
/// ports left unlabelled get a guess. `total_scanned` comes from the
/// primary run when it succeeded, else from the fallback.
pub fn merge_ports(
    primary: Result<PortProbeOutcome, AdapterError>,
    fallback: Option<Result<PortProbeOutcome, AdapterError>>,
) -> Result<PortScanResult, ScanExecutionError> {
    let fallback_attempted = fallback.is_some();
    let primary_ran = primary.is_ok();
    let mut outcomes = collect_outcomes(std::iter::once(primary).chain(fallback))?;

    if outcomes.is_empty() {
        let strategy = if fallback_attempted {
            PortProbeStrategy::Connect
        } else {
            PortProbeStrategy::Syn
        };
        outcomes.push(PortProbeOutcome::empty(strategy, 0));
    }

    let mut outcomes = outcomes.into_iter();
    let Some(base) = outcomes.next() else {
        return Err(ScanExecutionError::ExecutionFailed(
            "no port probe outcome".to_string(),
        ));
    };

    let mut result = PortScanResult {
        open_ports: base.open_ports,
        services: base.services,
        total_scanned: base.scanned,
        strategy: if primary_ran {
            PortProbeStrategy::Syn
        } else {
            base.strategy
        },
    };

    for secondary in outcomes {
        result.open_ports.extend(secondary.open_ports);
        for (port, label) in secondary.services {
            result.services.entry(port).or_insert(label);
        }
    }

    result.services.retain(|port, _| result.open_ports.contains(port));
    for port in &result.open_ports {
        result
            .services
            .entry(*port)
            .or_insert_with(|| guess_service(*port).to_string());
    }

    result.total_scanned = result.total_scanned.max(result.open_ports.len());
    Ok(result)
}

/// Union fingerprint labels per category.
///
/// When several CMS signatures match, the one declared first in the
/// signature table wins.
pub fn merge_tech(
    outcomes: impl IntoIterator<Item = Result<TechFingerprint, AdapterError>>,
) -> Result<TechStackResult, ScanExecutionError> {
    let fingerprints = collect_outcomes(outcomes)?;
    let mut result = TechStackResult::default();
    let mut cms_rank = usize::MAX;

    for fingerprint in fingerprints {
        if result.web_server.is_none() {
            result.web_server = fingerprint.server;
        }

        for m in fingerprint.matches {
            match m.category {
                TechCategory::Cms => {
                    if m.rank < cms_rank {
                        cms_rank = m.rank;
                        result.cms = Some(m.label.clone());
                    }
                    result.technologies.insert(m.label);
                }
                TechCategory::Framework => {
                    result.frameworks.insert(m.label);
                }
                TechCategory::Language => {
                    result.programming_languages.insert(m.label);
                }
                TechCategory::Technology => {
                    result.technologies.insert(m.label);
                }
            }
        }
    }

    Ok(result)
}
