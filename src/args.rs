use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::gatekeeper::DEFAULT_EXTENSION_BASE;

#[derive(Parser, Debug)]
#[command(
    name = "timeguard",
    about = "Put a countdown between you and the sites you waste time on",
    version,
    long_about = None
)]
pub struct Args {
    /// Settings database (defaults to ~/.timeguard.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the navigation gatekeeper over JSON events on stdin
    Serve {
        /// URL prefix of the extension's own pages
        #[arg(long, default_value = DEFAULT_EXTENSION_BASE)]
        extension_base: String,
    },

    /// Manage the block list
    Sites {
        #[command(subcommand)]
        action: SitesAction,
    },

    /// Show or set the countdown length in seconds (1-300)
    Delay { seconds: Option<i64> },

    /// Manage rehab mode, which locks settings outside a daily edit window
    Rehab {
        #[command(subcommand)]
        action: RehabAction,
    },

    /// Show visits to each domain over the last 24 hours
    Stats {
        /// Number of most visited domains to display
        #[arg(short, long)]
        top: Option<usize>,

        /// Redact domain names for privacy
        #[arg(long)]
        redact: bool,
    },

    /// Print the countdown page address for a destination
    CountdownUrl {
        target: String,

        #[arg(long, default_value = DEFAULT_EXTENSION_BASE)]
        extension_base: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SitesAction {
    List,
    Add { domain: String },
    Remove { domain: String },
    Edit { old: String, new: String },
}

#[derive(Subcommand, Debug)]
pub enum RehabAction {
    Status,
    Enable {
        /// Start of the daily edit window (HH:MM)
        #[arg(long, default_value = "23:00")]
        start: String,

        /// End of the daily edit window (HH:MM)
        #[arg(long, default_value = "00:00")]
        end: String,
    },
    Disable,
}
