use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::domain::{is_valid_domain, normalize_site_input};
use crate::error::StoreError;
use crate::storage::{get_typed, set_typed, KeyValueStore};

pub const BLOCKED_SITES_KEY: &str = "blockedSites";
pub const DELAY_SECONDS_KEY: &str = "delaySeconds";
pub const REHAB_MODE_KEY: &str = "rehabMode";

pub const DEFAULT_DELAY: u32 = 30;
pub const MIN_DELAY: u32 = 1;
pub const MAX_DELAY: u32 = 300;

pub fn clamp_delay(seconds: i64) -> u32 {
    seconds.clamp(MIN_DELAY as i64, MAX_DELAY as i64) as u32
}

/// Wall-clock time stored as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn from_time(time: NaiveTime) -> Self {
        Self(time)
    }

    pub fn minutes(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl FromStr for ClockTime {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M").map(Self)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RehabMode {
    pub enabled: bool,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl Default for RehabMode {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: ClockTime(NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default()),
            end_time: ClockTime(NaiveTime::default()),
        }
    }
}

impl RehabMode {
    /// Whether `now` falls inside the edit window. A window whose start is
    /// after its end spans midnight; equal bounds mean the window is always open.
    pub fn window_contains(&self, now: ClockTime) -> bool {
        let start = self.start_time.minutes();
        let end = self.end_time.minutes();
        let current = now.minutes();

        if start > end {
            current >= start || current < end
        } else if start == end {
            true
        } else {
            current >= start && current < end
        }
    }

    /// Restricted edits are allowed when rehab mode is off or the window is open.
    pub fn editing_allowed(&self, now: ClockTime) -> bool {
        !self.enabled || self.window_contains(now)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Please enter a domain")]
    EmptyDomain,
    #[error("'{0}' is not a valid domain (e.g., reddit.com)")]
    InvalidDomain(String),
    #[error("'{0}' is already in your list")]
    DuplicateSite(String),
    #[error("'{0}' is not in your list")]
    UnknownSite(String),
    #[error("Cannot decrease delay outside edit window")]
    DelayDecrease,
    #[error("Cannot modify Rehab Mode settings outside edit window")]
    RehabLocked,
    #[error("Cannot delete or edit sites outside edit window ({})", .0.join(", "))]
    SitesLocked(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub blocked_sites: Vec<String>,
    pub delay_seconds: u32,
    pub rehab_mode: RehabMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blocked_sites: Vec::new(),
            delay_seconds: DEFAULT_DELAY,
            rehab_mode: RehabMode::default(),
        }
    }
}

/// Reads the block list. Errors are left to the caller so the gatekeeper can
/// apply its own fail-open policy.
pub fn load_blocked_sites(store: &impl KeyValueStore) -> Result<Vec<String>, StoreError> {
    Ok(get_typed(store, BLOCKED_SITES_KEY)?.unwrap_or_default())
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(
    store: &impl KeyValueStore,
    key: &str,
) -> T {
    match get_typed(store, key) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(action = "load", component = "settings", key, error = %e, "Falling back to default setting");
            T::default()
        }
    }
}

impl Settings {
    /// Loads all settings; unreadable keys fall back to their defaults.
    pub fn load(store: &impl KeyValueStore) -> Self {
        let delay: Option<i64> = load_or_default(store, DELAY_SECONDS_KEY);
        Self {
            blocked_sites: load_or_default(store, BLOCKED_SITES_KEY),
            delay_seconds: delay
                .filter(|seconds| *seconds != 0)
                .map(clamp_delay)
                .unwrap_or(DEFAULT_DELAY),
            rehab_mode: load_or_default(store, REHAB_MODE_KEY),
        }
    }

    pub fn save(&self, store: &impl KeyValueStore) -> Result<(), StoreError> {
        set_typed(store, BLOCKED_SITES_KEY, &self.blocked_sites)?;
        set_typed(store, DELAY_SECONDS_KEY, &self.delay_seconds)?;
        set_typed(store, REHAB_MODE_KEY, &self.rehab_mode)?;
        Ok(())
    }

    pub fn add_site(&mut self, input: &str) -> Result<String, EditError> {
        let domain = validated_site(input)?;
        if self.blocked_sites.contains(&domain) {
            return Err(EditError::DuplicateSite(domain));
        }
        self.blocked_sites.push(domain.clone());
        Ok(domain)
    }

    pub fn remove_site(&mut self, input: &str) -> Result<String, EditError> {
        let domain = normalize_site_input(input);
        let index = self
            .blocked_sites
            .iter()
            .position(|site| *site == domain)
            .ok_or_else(|| EditError::UnknownSite(domain.clone()))?;
        Ok(self.blocked_sites.remove(index))
    }

    /// Replaces `old` in place, keeping its position in the list.
    pub fn edit_site(&mut self, old: &str, new: &str) -> Result<String, EditError> {
        let old = normalize_site_input(old);
        let index = self
            .blocked_sites
            .iter()
            .position(|site| *site == old)
            .ok_or_else(|| EditError::UnknownSite(old.clone()))?;

        let domain = validated_site(new)?;
        let duplicate = self
            .blocked_sites
            .iter()
            .enumerate()
            .any(|(i, site)| *site == domain && i != index);
        if duplicate {
            return Err(EditError::DuplicateSite(domain));
        }

        self.blocked_sites[index] = domain.clone();
        Ok(domain)
    }

    /// Checks a proposed change against these (saved) settings. Outside the
    /// rehab edit window, only changes that add friction are accepted.
    pub fn validate_change(&self, proposed: &Settings, now: ClockTime) -> Result<(), EditError> {
        if self.rehab_mode.editing_allowed(now) {
            return Ok(());
        }

        if proposed.delay_seconds < self.delay_seconds {
            return Err(EditError::DelayDecrease);
        }
        if proposed.rehab_mode != self.rehab_mode {
            return Err(EditError::RehabLocked);
        }

        let removed: Vec<String> = self
            .blocked_sites
            .iter()
            .filter(|site| !proposed.blocked_sites.contains(site))
            .cloned()
            .collect();
        if !removed.is_empty() {
            return Err(EditError::SitesLocked(removed));
        }

        Ok(())
    }
}

fn validated_site(input: &str) -> Result<String, EditError> {
    let domain = normalize_site_input(input);
    if domain.is_empty() {
        return Err(EditError::EmptyDomain);
    }
    if !is_valid_domain(&domain) {
        return Err(EditError::InvalidDomain(domain));
    }
    Ok(domain)
}
