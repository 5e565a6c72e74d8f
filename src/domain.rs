use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::error::GateError;

fn domain_regex() -> &'static Regex {
    static DOMAIN_RE: OnceLock<Regex> = OnceLock::new();
    DOMAIN_RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z0-9]+([\-.][a-z0-9]+)*\.[a-z]{2,}$").expect("domain regex is valid")
    })
}

/// Lowercases a hostname and strips leading `www.` labels.
///
/// No other subdomains are touched, so `m.reddit.com` stays distinct from
/// `reddit.com`. Repeated `www.` prefixes are all removed so that the result
/// is a fixed point.
pub fn normalize_domain(host: &str) -> String {
    let lowered = host.to_lowercase();
    let mut domain = lowered.as_str();
    while let Some(rest) = domain.strip_prefix("www.") {
        domain = rest;
    }
    domain.to_string()
}

/// Normalizes free-form user input for the block list, e.g.
/// `"  HTTPS://www.Reddit.com:443/r/rust "` becomes `reddit.com`.
pub fn normalize_site_input(input: &str) -> String {
    let mut domain = input.trim().to_lowercase();

    for scheme in ["http://", "https://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
            break;
        }
    }

    let host = domain.split('/').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    normalize_domain(host)
}

pub fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty() && domain_regex().is_match(domain)
}

/// Checks `domain` against the block list, normalizing both sides.
pub fn is_blocked(domain: &str, blocked_sites: &[String]) -> bool {
    let normalized = normalize_domain(domain);
    blocked_sites
        .iter()
        .any(|blocked| normalize_domain(blocked) == normalized)
}

pub fn domain_from_url(raw: &str) -> Result<String, GateError> {
    let url = Url::parse(raw).map_err(|source| GateError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(normalize_domain(host)),
        _ => Err(GateError::MissingHost {
            url: raw.to_string(),
        }),
    }
}

pub fn is_web_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}
