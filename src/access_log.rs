use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::normalize_domain;
use crate::error::StoreError;
use crate::storage::{get_typed, set_typed, KeyValueStore};

pub const ACCESS_LOG_KEY: &str = "accessLog";

fn window_start(now: DateTime<Utc>) -> i64 {
    (now - Duration::hours(24)).timestamp_millis()
}

/// Millisecond visit timestamps per normalized domain, kept to the trailing 24 hours.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLog {
    visits: BTreeMap<String, Vec<i64>>,
}

impl AccessLog {
    pub fn load(store: &impl KeyValueStore) -> Result<Self, StoreError> {
        Ok(get_typed(store, ACCESS_LOG_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, store: &impl KeyValueStore) -> Result<(), StoreError> {
        set_typed(store, ACCESS_LOG_KEY, self)
    }

    /// Appends a visit and prunes that domain's history.
    pub fn record(&mut self, domain: &str, now: DateTime<Utc>) {
        let cutoff = window_start(now);
        let entries = self.visits.entry(normalize_domain(domain)).or_default();
        entries.push(now.timestamp_millis());
        entries.retain(|timestamp| *timestamp > cutoff);
    }

    pub fn recent_visits(&self, domain: &str, now: DateTime<Utc>) -> usize {
        let cutoff = window_start(now);
        self.visits
            .get(&normalize_domain(domain))
            .map(|entries| entries.iter().filter(|ts| **ts > cutoff).count())
            .unwrap_or(0)
    }

    /// 24h visit counts for every domain that still has recent visits.
    pub fn recent_counts(&self, now: DateTime<Utc>) -> BTreeMap<String, u32> {
        let cutoff = window_start(now);
        self.visits
            .iter()
            .filter_map(|(domain, entries)| {
                let count = entries.iter().filter(|ts| **ts > cutoff).count() as u32;
                (count > 0).then(|| (domain.clone(), count))
            })
            .collect()
    }
}

/// Records a visit in the durable log and returns the updated 24h count.
pub fn log_access(
    store: &impl KeyValueStore,
    domain: &str,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let mut log = AccessLog::load(store)?;
    log.record(domain, now);
    log.save(store)?;
    Ok(log.recent_visits(domain, now))
}
