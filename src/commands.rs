use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::io;
use std::time::Instant;
use tracing::info;
use url::Url;

use crate::access_log::AccessLog;
use crate::args::{Args, Command, RehabAction, SitesAction};
use crate::countdown::{countdown_url, CountdownRequest};
use crate::gatekeeper::Gatekeeper;
use crate::host;
use crate::settings::{clamp_delay, ClockTime, RehabMode, Settings};
use crate::sqlite::{default_database_path, SqliteStore};
use crate::stats::VisitReport;
use crate::utils::{format_number, redact_domain};

fn open_store(args: &Args) -> Result<SqliteStore> {
    let path = match &args.db {
        Some(path) => path.clone(),
        None => default_database_path()?,
    };
    SqliteStore::open(&path).with_context(|| format!("Failed to open database at {:?}", path))
}

fn now_local() -> ClockTime {
    ClockTime::from_time(Local::now().time())
}

/// Saves `proposed` if the rehab-mode rules of the saved settings allow it.
fn commit_settings(store: &SqliteStore, saved: &Settings, proposed: &Settings) -> Result<()> {
    saved.validate_change(proposed, now_local())?;
    proposed.save(store).context("Failed to save settings")?;
    info!(action = "save", component = "settings", sites = proposed.blocked_sites.len(), delay_seconds = proposed.delay_seconds, "Settings saved");
    Ok(())
}

pub fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Serve { extension_base } => serve(args, extension_base),
        Command::Sites { action } => sites(args, action),
        Command::Delay { seconds } => delay(args, *seconds),
        Command::Rehab { action } => rehab(args, action),
        Command::Stats { top, redact } => stats(args, *top, *redact),
        Command::CountdownUrl {
            target,
            extension_base,
        } => {
            let base = parse_extension_base(extension_base)?;
            let url = countdown_url(&base, target)?;
            let request = CountdownRequest::from_url(&url)
                .with_context(|| format!("'{}' cannot be used as a countdown target", target))?;
            println!("{}", url);
            info!(action = "build", component = "countdown_url", domain = %request.domain, "Countdown URL built");
            Ok(())
        }
    }
}

fn parse_extension_base(raw: &str) -> Result<Url> {
    let base = Url::parse(raw).with_context(|| format!("Invalid extension base URL '{}'", raw))?;
    if !base.path().ends_with('/') {
        anyhow::bail!("Extension base URL must end with '/': {}", raw);
    }
    Ok(base)
}

fn serve(args: &Args, extension_base: &str) -> Result<()> {
    let start_time = Instant::now();
    let base = parse_extension_base(extension_base)?;
    let mut gatekeeper = Gatekeeper::new(open_store(args)?, base);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let handled = host::serve(&mut gatekeeper, stdin.lock(), stdout.lock())?;

    info!(
        action = "complete",
        component = "serve",
        events = handled,
        duration_ms = start_time.elapsed().as_millis(),
        "Gatekeeper stopped"
    );
    Ok(())
}

fn sites(args: &Args, action: &SitesAction) -> Result<()> {
    let store = open_store(args)?;
    let saved = Settings::load(&store);
    let mut proposed = saved.clone();

    match action {
        SitesAction::List => {
            if saved.blocked_sites.is_empty() {
                println!("No blocked sites yet. Add one with `timeguard sites add <domain>`.");
            }
            for site in &saved.blocked_sites {
                println!("- {}", site);
            }
            return Ok(());
        }
        SitesAction::Add { domain } => {
            let added = proposed.add_site(domain)?;
            commit_settings(&store, &saved, &proposed)?;
            println!("Added {}", added);
        }
        SitesAction::Remove { domain } => {
            let removed = proposed.remove_site(domain)?;
            commit_settings(&store, &saved, &proposed)?;
            println!("Removed {}", removed);
        }
        SitesAction::Edit { old, new } => {
            let replaced = proposed.edit_site(old, new)?;
            commit_settings(&store, &saved, &proposed)?;
            println!("Replaced {} with {}", old, replaced);
        }
    }
    Ok(())
}

fn delay(args: &Args, seconds: Option<i64>) -> Result<()> {
    let store = open_store(args)?;
    let saved = Settings::load(&store);

    match seconds {
        None => println!("Countdown: {} seconds", saved.delay_seconds),
        Some(seconds) => {
            let mut proposed = saved.clone();
            proposed.delay_seconds = clamp_delay(seconds);
            commit_settings(&store, &saved, &proposed)?;
            println!("Countdown set to {} seconds", proposed.delay_seconds);
        }
    }
    Ok(())
}

fn rehab(args: &Args, action: &RehabAction) -> Result<()> {
    let store = open_store(args)?;
    let saved = Settings::load(&store);
    let mut proposed = saved.clone();

    match action {
        RehabAction::Status => {
            print_rehab_status(&saved.rehab_mode, now_local());
            return Ok(());
        }
        RehabAction::Enable { start, end } => {
            proposed.rehab_mode = RehabMode {
                enabled: true,
                start_time: start
                    .parse()
                    .with_context(|| format!("Invalid start time '{}', expected HH:MM", start))?,
                end_time: end
                    .parse()
                    .with_context(|| format!("Invalid end time '{}', expected HH:MM", end))?,
            };
        }
        RehabAction::Disable => proposed.rehab_mode.enabled = false,
    }

    commit_settings(&store, &saved, &proposed)?;
    print_rehab_status(&proposed.rehab_mode, now_local());
    Ok(())
}

fn print_rehab_status(rehab: &RehabMode, now: ClockTime) {
    if !rehab.enabled {
        println!("Rehab mode is off. All settings can be changed.");
        return;
    }

    let state = if rehab.window_contains(now) {
        "open"
    } else {
        "closed"
    };
    println!(
        "Rehab mode is on. Edit window {} to {} is currently {}.",
        rehab.start_time, rehab.end_time, state
    );
}

fn stats(args: &Args, top: Option<usize>, redact: bool) -> Result<()> {
    let store = open_store(args)?;
    let settings = Settings::load(&store);
    let log = AccessLog::load(&store).context("Failed to read access log")?;
    let report = VisitReport::build(&log, &settings.blocked_sites, Utc::now());

    println!("\n--- Visits in the last 24 hours ---");
    println!(
        "Total visits through the countdown: {}",
        format_number(report.total_visits)
    );

    let shown = top.unwrap_or(report.domains.len());
    for entry in report.domains.iter().take(shown) {
        let display_domain = if redact {
            redact_domain(&entry.domain)
        } else {
            entry.domain.clone()
        };
        let marker = if entry.blocked { "" } else { " (no longer blocked)" };
        println!(
            "- {}: {} visits [{:?}]{}",
            display_domain,
            format_number(entry.visits),
            entry.tier,
            marker
        );
    }
    Ok(())
}
