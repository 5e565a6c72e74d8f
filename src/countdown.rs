use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::domain::normalize_domain;

pub const COUNTDOWN_PAGE: &str = "countdown.html";
pub const TARGET_PARAM: &str = "target";

// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CountdownError {
    #[error("No target URL specified")]
    MissingTarget,
    #[error("Invalid target URL")]
    InvalidTarget,
}

/// `<extension base>countdown.html?target=<url-encoded target>`
pub fn countdown_url(extension_base: &Url, target: &str) -> Result<Url, url::ParseError> {
    let mut url = extension_base.join(COUNTDOWN_PAGE)?;
    let encoded = utf8_percent_encode(target, URI_COMPONENT);
    url.set_query(Some(&format!("{TARGET_PARAM}={encoded}")));
    Ok(url)
}

/// What the countdown page needs once it has parsed its own address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownRequest {
    pub target: Url,
    pub domain: String,
}

impl CountdownRequest {
    pub fn from_url(countdown_page: &Url) -> Result<Self, CountdownError> {
        let raw = countdown_page
            .query_pairs()
            .find(|(key, _)| key == TARGET_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or(CountdownError::MissingTarget)?;

        let target = Url::parse(&raw).map_err(|_| CountdownError::InvalidTarget)?;
        let domain = target
            .host_str()
            .map(normalize_domain)
            .ok_or(CountdownError::InvalidTarget)?;

        Ok(Self { target, domain })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitTier {
    Excellent,
    Caution,
    Warning,
}

impl VisitTier {
    pub fn for_count(visits: usize) -> Self {
        match visits {
            0..=3 => VisitTier::Excellent,
            4..=10 => VisitTier::Caution,
            _ => VisitTier::Warning,
        }
    }
}

pub fn visit_message(visits: usize) -> &'static str {
    match visits {
        0 => "First visit today. Make it count!",
        1 => "Just once today. You're doing great!",
        2..=3 => "Staying in control. Keep it up!",
        4..=6 => "That's a few visits now. Still need this?",
        7..=10 => "Getting frequent. Consider taking a break.",
        11..=15 => "You've been here quite a bit today.",
        16..=25 => "That's a lot of visits. Maybe step away?",
        _ => "Consider if this is how you want to spend your time.",
    }
}

pub fn visit_summary(visits: usize) -> String {
    let noun = if visits == 1 { "visit" } else { "visits" };
    format!("{visits} {noun} in the last 24 hours")
}
