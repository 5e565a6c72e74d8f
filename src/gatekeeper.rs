use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::countdown::countdown_url;
use crate::domain::{domain_from_url, is_blocked, is_web_url, normalize_domain};
use crate::error::GateError;
use crate::grants::{TabGrantStore, TabId};
use crate::settings::load_blocked_sites;
use crate::storage::KeyValueStore;

pub const DEFAULT_EXTENSION_BASE: &str = "chrome-extension://timeguard/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub tab_id: TabId,
    #[serde(default)]
    pub frame_id: i64,
    pub url: String,
}

impl Navigation {
    pub fn main_frame(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            frame_id: 0,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Sub-frames, extension pages and non-web schemes.
    Ignore,
    Allow,
    /// Blocked, but the tab is already on this domain.
    SameDomain,
    Redirect(Url),
}

impl Decision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Decision::Redirect(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantResponse {
    pub success: bool,
}

/// Decides every navigation for every tab. Handlers take `&mut self`, so a
/// single owner processes events strictly in arrival order.
pub struct Gatekeeper<S> {
    store: S,
    grants: TabGrantStore,
    extension_base: Url,
}

impl<S: KeyValueStore> Gatekeeper<S> {
    pub fn new(store: S, extension_base: Url) -> Self {
        Self {
            store,
            grants: TabGrantStore::new(),
            extension_base,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn grants(&self) -> &TabGrantStore {
        &self.grants
    }

    fn should_inspect(&self, nav: &Navigation) -> bool {
        nav.frame_id == 0
            && !nav.url.starts_with(self.extension_base.as_str())
            && is_web_url(&nav.url)
    }

    pub fn before_navigate(&mut self, nav: &Navigation) -> Decision {
        if !self.should_inspect(nav) {
            return Decision::Ignore;
        }

        match self.decide(nav) {
            Ok(decision) => {
                info!(
                    action = "decide",
                    component = "gatekeeper",
                    tab_id = %nav.tab_id,
                    url = %nav.url,
                    decision = ?decision,
                    "Navigation decided"
                );
                decision
            }
            Err(e) => {
                let decision = e.fallback();
                warn!(
                    action = "decide",
                    component = "gatekeeper",
                    tab_id = %nav.tab_id,
                    url = %nav.url,
                    error_kind = e.kind(),
                    error = %e,
                    decision = ?decision,
                    "Navigation handler failed, letting it through"
                );
                decision
            }
        }
    }

    fn decide(&mut self, nav: &Navigation) -> Result<Decision, GateError> {
        let tab = nav.tab_id;
        let domain = domain_from_url(&nav.url)?;
        let blocked_sites = load_blocked_sites(&self.store)?;

        if !is_blocked(&domain, &blocked_sites) {
            self.grants.set_last_domain(tab, &domain);
            return Ok(Decision::Allow);
        }

        if self.grants.has_grant(tab, &domain) {
            self.grants.set_last_domain(tab, &domain);
            return Ok(Decision::Allow);
        }

        if self.grants.last_domain(tab) == Some(domain.as_str()) {
            return Ok(Decision::SameDomain);
        }

        let url = countdown_url(&self.extension_base, &nav.url).map_err(|source| {
            GateError::InvalidUrl {
                url: nav.url.clone(),
                source,
            }
        })?;
        Ok(Decision::Redirect(url))
    }

    fn revocation_block_list(&self) -> Vec<String> {
        load_blocked_sites(&self.store).unwrap_or_else(|e| {
            warn!(action = "load", component = "block_list", error = %e, "Treating block list as empty");
            Vec::new()
        })
    }

    /// Commit bookkeeping: revokes the grant for a blocked domain the tab just
    /// left, then records the committed domain.
    pub fn navigation_committed(&mut self, nav: &Navigation) {
        if !self.should_inspect(nav) {
            return;
        }

        let tab = nav.tab_id;
        let current = match domain_from_url(&nav.url) {
            Ok(domain) => domain,
            Err(e) => {
                warn!(action = "commit", component = "gatekeeper", tab_id = %tab, error = %e, "Ignoring committed navigation");
                return;
            }
        };

        if self.grants.has_any_grant(tab) {
            if let Some(previous) = self.grants.committed_domain(tab).map(str::to_string) {
                if previous != current
                    && is_blocked(&previous, &self.revocation_block_list())
                    && self.grants.revoke_grant(tab, &previous)
                {
                    info!(
                        action = "revoke",
                        component = "grants",
                        tab_id = %tab,
                        domain = %previous,
                        next_domain = %current,
                        "Revoked grant after leaving blocked domain"
                    );
                }
            }
        }

        self.grants.set_committed_domain(tab, &current);
        self.grants.set_last_domain(tab, &current);
    }

    pub fn navigation_completed(&mut self, nav: &Navigation) {
        if !self.should_inspect(nav) {
            return;
        }

        match domain_from_url(&nav.url) {
            Ok(domain) => self.grants.set_last_domain(nav.tab_id, &domain),
            Err(e) => debug!(action = "complete", component = "gatekeeper", error = %e, "Ignoring completed navigation"),
        }
    }

    pub fn countdown_complete(&mut self, tab: TabId, domain: &str) -> GrantResponse {
        let domain = normalize_domain(domain);
        self.grants.add_grant(tab, &domain);
        self.grants.set_last_domain(tab, &domain);

        info!(action = "grant", component = "grants", tab_id = %tab, domain = %domain, "Countdown completed, grant installed");
        GrantResponse { success: true }
    }

    pub fn tab_removed(&mut self, tab: TabId) {
        if self.grants.clear(tab) {
            debug!(action = "clear", component = "grants", tab_id = %tab, reason = "removed", "Cleared tab state");
        }
    }

    // Browsers may reuse identifiers.
    pub fn tab_created(&mut self, tab: TabId) {
        if self.grants.clear(tab) {
            debug!(action = "clear", component = "grants", tab_id = %tab, reason = "created", "Cleared stale tab state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn gatekeeper(blocked: &[&str]) -> Gatekeeper<MemoryStore> {
        let store = MemoryStore::new();
        store.set("blockedSites", &json!(blocked)).unwrap();
        Gatekeeper::new(store, Url::parse(DEFAULT_EXTENSION_BASE).unwrap())
    }

    #[test]
    fn ignores_subframes_extension_pages_and_other_schemes() {
        let mut gate = gatekeeper(&["reddit.com"]);
        let subframe = Navigation {
            tab_id: TabId(1),
            frame_id: 4,
            url: "https://reddit.com/".to_string(),
        };
        assert_eq!(gate.before_navigate(&subframe), Decision::Ignore);

        for url in [
            "chrome-extension://timeguard/countdown.html?target=https%3A%2F%2Freddit.com",
            "chrome://settings",
            "file:///home/reddit.com",
            "ftp://reddit.com/",
        ] {
            assert_eq!(
                gate.before_navigate(&Navigation::main_frame(TabId(1), url)),
                Decision::Ignore,
                "{url}"
            );
        }
        assert_eq!(gate.grants().tab_count(), 0);
    }

    #[test]
    fn unblocked_domain_records_last_domain() {
        let mut gate = gatekeeper(&["reddit.com"]);
        let nav = Navigation::main_frame(TabId(1), "https://www.Example.com/a");

        assert_eq!(gate.before_navigate(&nav), Decision::Allow);
        assert_eq!(gate.grants().last_domain(TabId(1)), Some("example.com"));
    }

    #[test]
    fn redirect_leaves_last_domain_untouched() {
        let mut gate = gatekeeper(&["reddit.com"]);
        let decision = gate.before_navigate(&Navigation::main_frame(TabId(1), "https://reddit.com/"));

        assert!(decision.is_redirect());
        assert_eq!(gate.grants().last_domain(TabId(1)), None);
    }

    #[test]
    fn malformed_url_fails_open() {
        let mut gate = gatekeeper(&["reddit.com"]);
        let nav = Navigation::main_frame(TabId(1), "https://[::1");

        assert_eq!(gate.before_navigate(&nav), Decision::Allow);
    }

    #[test]
    fn grant_normalizes_domain() {
        let mut gate = gatekeeper(&["reddit.com"]);
        assert!(gate.countdown_complete(TabId(2), "WWW.reddit.com").success);
        assert!(gate.grants().has_grant(TabId(2), "reddit.com"));
        assert_eq!(gate.grants().last_domain(TabId(2)), Some("reddit.com"));
    }

    #[test]
    fn completed_overwrites_last_domain() {
        let mut gate = gatekeeper(&[]);
        gate.navigation_completed(&Navigation::main_frame(TabId(1), "https://example.org/"));
        assert_eq!(gate.grants().last_domain(TabId(1)), Some("example.org"));
    }
}
