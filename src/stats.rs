use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::access_log::AccessLog;
use crate::countdown::VisitTier;
use crate::domain::is_blocked;

#[derive(Debug)]
pub struct DomainVisits {
    pub domain: String,
    pub visits: u32,
    pub blocked: bool,
    pub tier: VisitTier,
}

#[derive(Debug)]
pub struct VisitReport {
    pub domains: Vec<DomainVisits>,
    pub total_visits: u32,
}

impl VisitReport {
    /// Most visited first; ties are broken alphabetically.
    pub fn build(log: &AccessLog, blocked_sites: &[String], now: DateTime<Utc>) -> Self {
        let counts: BTreeMap<String, u32> = log.recent_counts(now);
        let total_visits = counts.values().sum();

        let mut domains: Vec<DomainVisits> = counts
            .into_iter()
            .map(|(domain, visits)| DomainVisits {
                blocked: is_blocked(&domain, blocked_sites),
                tier: VisitTier::for_count(visits as usize),
                domain,
                visits,
            })
            .collect();
        domains.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.domain.cmp(&b.domain)));

        Self {
            domains,
            total_visits,
        }
    }
}
