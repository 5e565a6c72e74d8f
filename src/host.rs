//! Line-oriented host protocol.
//!
//! The browser side forwards every navigation event, tab lifecycle event and
//! runtime message as one JSON object per line. Replies are written only for
//! events that need action: redirects, grant responses and visit statistics.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::access_log::{log_access, AccessLog};
use crate::countdown::{visit_message, visit_summary, VisitTier};
use crate::domain::normalize_domain;
use crate::gatekeeper::{Decision, Gatekeeper, Navigation};
use crate::grants::TabId;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum RuntimeMessage {
    #[serde(rename = "COUNTDOWN_COMPLETE", rename_all = "camelCase")]
    CountdownComplete { tab_id: TabId, domain: String },
    #[serde(rename = "LOG_ACCESS")]
    LogAccess { domain: String },
    #[serde(rename = "VISIT_STATS")]
    VisitStats { domain: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    BeforeNavigate(Navigation),
    Committed(Navigation),
    Completed(Navigation),
    #[serde(rename_all = "camelCase")]
    TabRemoved { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    TabCreated { tab_id: TabId },
    Message { message: RuntimeMessage },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HostAction {
    #[serde(rename_all = "camelCase")]
    Redirect { tab_id: TabId, url: String },
    Response { success: bool },
    Stats {
        domain: String,
        visits: usize,
        tier: VisitTier,
        summary: String,
        message: String,
    },
}

fn stats_action(domain: String, visits: usize) -> HostAction {
    HostAction::Stats {
        domain,
        visits,
        tier: VisitTier::for_count(visits),
        summary: visit_summary(visits),
        message: visit_message(visits).to_string(),
    }
}

impl<S: KeyValueStore> Gatekeeper<S> {
    /// Applies one event and returns the reply, if any.
    pub fn handle_event(&mut self, event: HostEvent) -> Option<HostAction> {
        match event {
            HostEvent::BeforeNavigate(nav) => match self.before_navigate(&nav) {
                Decision::Redirect(url) => Some(HostAction::Redirect {
                    tab_id: nav.tab_id,
                    url: url.into(),
                }),
                _ => None,
            },
            HostEvent::Committed(nav) => {
                self.navigation_committed(&nav);
                None
            }
            HostEvent::Completed(nav) => {
                self.navigation_completed(&nav);
                None
            }
            HostEvent::TabRemoved { tab_id } => {
                self.tab_removed(tab_id);
                None
            }
            HostEvent::TabCreated { tab_id } => {
                self.tab_created(tab_id);
                None
            }
            HostEvent::Message { message } => Some(self.handle_message(message)),
        }
    }

    fn handle_message(&mut self, message: RuntimeMessage) -> HostAction {
        match message {
            RuntimeMessage::CountdownComplete { tab_id, domain } => {
                let response = self.countdown_complete(tab_id, &domain);
                HostAction::Response {
                    success: response.success,
                }
            }
            RuntimeMessage::LogAccess { domain } => {
                let domain = normalize_domain(&domain);
                match log_access(self.store(), &domain, Utc::now()) {
                    Ok(visits) => stats_action(domain, visits),
                    Err(e) => {
                        warn!(action = "log_access", component = "access_log", domain = %domain, error = %e, "Failed to record visit");
                        stats_action(domain, 0)
                    }
                }
            }
            RuntimeMessage::VisitStats { domain } => {
                let domain = normalize_domain(&domain);
                let visits = match AccessLog::load(self.store()) {
                    Ok(log) => log.recent_visits(&domain, Utc::now()),
                    Err(e) => {
                        warn!(action = "load", component = "access_log", error = %e, "Failed to read access log");
                        0
                    }
                };
                stats_action(domain, visits)
            }
        }
    }
}

/// Runs the event loop until `input` is exhausted. Events are applied one
/// at a time, so no two decisions for a tab can interleave.
pub fn serve<S, R, W>(gatekeeper: &mut Gatekeeper<S>, input: R, mut output: W) -> Result<u64>
where
    S: KeyValueStore,
    R: BufRead,
    W: Write,
{
    info!(action = "start", component = "host", "Listening for browser events");
    let mut handled = 0u64;
    let mut input = input;
    let mut buf = Vec::new();
    let mut line_num = 0usize;

    loop {
        buf.clear();
        let read = input
            .read_until(b'\n', &mut buf)
            .context("Failed to read event stream")?;
        if read == 0 {
            break;
        }
        line_num += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(action = "parse", component = "host", line_number = line_num, error = %e, "Skipping event that is not UTF-8");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let event: HostEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(action = "parse", component = "host", line_number = line_num, error = %e, "Skipping malformed event");
                continue;
            }
        };

        handled += 1;
        if let Some(reply) = gatekeeper.handle_event(event) {
            serde_json::to_writer(&mut output, &reply).context("Failed to encode reply")?;
            output.write_all(b"\n")?;
            output.flush()?;
        }
    }

    info!(
        action = "complete",
        component = "host",
        events = handled,
        open_tabs = gatekeeper.grants().tab_count(),
        "Event stream closed"
    );
    Ok(handled)
}
