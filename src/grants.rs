use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default, Clone)]
pub struct TabGrantState {
    pub granted_domains: BTreeSet<String>,
    /// Domain used for same-domain passthrough on the next navigation.
    pub last_domain: Option<String>,
    /// Domain of the last committed http(s) page in this tab.
    pub committed_domain: Option<String>,
}

/// Process-lifetime grant state, one entry per tab. Never persisted.
#[derive(Debug, Default)]
pub struct TabGrantStore {
    tabs: HashMap<TabId, TabGrantState>,
}

impl TabGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_grants(&self, tab: TabId) -> Option<&BTreeSet<String>> {
        self.tabs.get(&tab).map(|state| &state.granted_domains)
    }

    pub fn has_grant(&self, tab: TabId, domain: &str) -> bool {
        self.get_grants(tab)
            .is_some_and(|grants| grants.contains(domain))
    }

    pub fn has_any_grant(&self, tab: TabId) -> bool {
        self.get_grants(tab).is_some_and(|grants| !grants.is_empty())
    }

    pub fn add_grant(&mut self, tab: TabId, domain: &str) {
        self.tabs
            .entry(tab)
            .or_default()
            .granted_domains
            .insert(domain.to_string());
    }

    pub fn revoke_grant(&mut self, tab: TabId, domain: &str) -> bool {
        self.tabs
            .get_mut(&tab)
            .is_some_and(|state| state.granted_domains.remove(domain))
    }

    pub fn last_domain(&self, tab: TabId) -> Option<&str> {
        self.tabs.get(&tab).and_then(|state| state.last_domain.as_deref())
    }

    pub fn set_last_domain(&mut self, tab: TabId, domain: &str) {
        self.tabs.entry(tab).or_default().last_domain = Some(domain.to_string());
    }

    pub fn committed_domain(&self, tab: TabId) -> Option<&str> {
        self.tabs
            .get(&tab)
            .and_then(|state| state.committed_domain.as_deref())
    }

    pub fn set_committed_domain(&mut self, tab: TabId, domain: &str) {
        self.tabs.entry(tab).or_default().committed_domain = Some(domain.to_string());
    }

    pub fn clear(&mut self, tab: TabId) -> bool {
        self.tabs.remove(&tab).is_some()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }
}
