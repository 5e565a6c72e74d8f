use anyhow::Result;
use clap::Parser;
use tracing::error;

use timeguard::{commands, utils, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    if let Err(e) = commands::run(&args) {
        error!(action = "exit", component = "main", error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
