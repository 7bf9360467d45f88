//! Technology signature table
//!
//! Declaration order matters: when several CMS signatures match, the first
//! one listed here is reported.

use std::collections::HashMap;

use crate::domain::{SignatureMatch, TechCategory};

/// Where a marker is looked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLocation {
    Body,
    /// Values of the named response header (lower-case name)
    Header(&'static str),
}

/// A literal marker and the label it implies
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub location: MarkerLocation,
    /// Lower-case literal, matched case-insensitively as a substring
    pub marker: &'static str,
    pub category: TechCategory,
    pub label: &'static str,
}

const fn body(marker: &'static str, category: TechCategory, label: &'static str) -> Signature {
    Signature {
        location: MarkerLocation::Body,
        marker,
        category,
        label,
    }
}

const fn header(
    name: &'static str,
    marker: &'static str,
    category: TechCategory,
    label: &'static str,
) -> Signature {
    Signature {
        location: MarkerLocation::Header(name),
        marker,
        category,
        label,
    }
}

pub static SIGNATURES: &[Signature] = &[
    body("wp-content", TechCategory::Cms, "WordPress"),
    body("wordpress", TechCategory::Cms, "WordPress"),
    body("drupal", TechCategory::Cms, "Drupal"),
    body("joomla", TechCategory::Cms, "Joomla"),
    body("cdn.shopify.com", TechCategory::Cms, "Shopify"),
    body("react", TechCategory::Framework, "React"),
    body("angular", TechCategory::Framework, "Angular"),
    body("vue", TechCategory::Framework, "Vue.js"),
    body("__next", TechCategory::Framework, "Next.js"),
    body("jquery", TechCategory::Technology, "jQuery"),
    header("x-powered-by", "php", TechCategory::Language, "PHP"),
    header("x-powered-by", "express", TechCategory::Framework, "Express"),
    header("x-powered-by", "express", TechCategory::Language, "JavaScript"),
    header("x-powered-by", "asp.net", TechCategory::Language, "C#"),
    header("set-cookie", "laravel_session", TechCategory::Framework, "Laravel"),
    header("set-cookie", "csrftoken", TechCategory::Framework, "Django"),
    header("server", "cloudflare", TechCategory::Technology, "Cloudflare"),
];

/// Match a response against [`SIGNATURES`].
///
/// `headers` maps lower-case header names to their lower-cased values joined
/// together; `body` must already be lower-cased.
pub fn match_signatures(headers: &HashMap<String, String>, body: &str) -> Vec<SignatureMatch> {
    SIGNATURES
        .iter()
        .enumerate()
        .filter(|(_, sig)| match sig.location {
            MarkerLocation::Body => body.contains(sig.marker),
            MarkerLocation::Header(name) => headers
                .get(name)
                .is_some_and(|value| value.contains(sig.marker)),
        })
        .map(|(rank, sig)| SignatureMatch {
            rank,
            category: sig.category,
            label: sig.label.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_lower_case() {
        for sig in SIGNATURES {
            assert_eq!(sig.marker, sig.marker.to_ascii_lowercase());
            if let MarkerLocation::Header(name) = sig.location {
                assert_eq!(name, name.to_ascii_lowercase());
            }
        }
    }

    #[test]
    fn test_express_implies_javascript() {
        let headers = HashMap::from([("x-powered-by".to_string(), "express".to_string())]);
        let labels: Vec<String> = match_signatures(&headers, "")
            .into_iter()
            .map(|m| m.label)
            .collect();
        assert_eq!(labels, vec!["Express", "JavaScript"]);
    }

    #[test]
    fn test_no_markers_no_matches() {
        assert!(match_signatures(&HashMap::new(), "<html><body>plain</body></html>").is_empty());
    }
}
