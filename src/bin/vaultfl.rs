//! `vaultfl` is a command line utility for working with [OCFL](https://ocfl.io/) repositories.
//!
//! It is intended to be run from within an OCFL storage root, or pointed at one with `--root`.
//! Run `vaultfl help` or `vaultfl help <COMMAND>` for details on the available subcommands.

use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::error;

use vaultfl::cmd::opts::VaultflArgs;
use vaultfl::cmd::{eprintln, exec_command, paint};
use vaultfl::config::load_config;
use vaultfl::ocfl::VaultflError;

fn main() {
    let args = VaultflArgs::parse();

    let log_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let terminate = Arc::new(AtomicBool::new(false));
    let ctrlc_terminate = terminate.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        ctrlc_terminate.store(true, Ordering::Release);
    }) {
        error!("Failed to install Ctrl-C handler: {}", e);
    }

    let config = match load_config(&args.name) {
        Ok(config) => config,
        Err(e) => fail(&e, args.quiet),
    };

    if let Err(e) = config.validate() {
        fail(&e, args.quiet);
    }

    if let Err(e) = exec_command(&args, &config, &terminate) {
        fail(&e, args.quiet);
    }
}

fn fail(e: &VaultflError, quiet: bool) -> ! {
    if !quiet {
        eprintln(paint(
            false,
            ansi_term::Colour::Red.bold(),
            format!("Error: {}", e),
        ));
    }
    exit(1);
}
