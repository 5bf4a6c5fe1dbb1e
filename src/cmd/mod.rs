//! The CLI layer. This is a thin client over the `ocfl` core: every subcommand maps to one or
//! two calls into `OcflRepo` and renders the result. None of this module's logic participates in
//! the core's correctness invariants.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::atomic::AtomicBool;

use ansi_term::Style;
#[cfg(feature = "s3")]
use rusoto_core::Region;

use crate::cmd::opts::{VaultflArgs, Storage};
use crate::config::Config;
use crate::ocfl::{OcflRepo, Result, VaultflError};

pub mod cmds;
pub mod diff;
pub mod opts;
pub mod style;
pub mod table;
pub mod validate;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Arguments that are relevant to (almost) every subcommand, plucked out of `VaultflArgs` so that
/// individual `Cmd` implementations don't need the whole CLI parse tree.
#[derive(Debug, Clone, Copy)]
pub struct GlobalArgs {
    pub quiet: bool,
    pub verbose: bool,
    pub no_styles: bool,
}

impl GlobalArgs {
    pub fn new(args: &VaultflArgs) -> Self {
        Self {
            quiet: args.quiet,
            verbose: args.verbose,
            no_styles: args.no_styles,
        }
    }
}

/// Implemented by every CLI subcommand. `config` carries the resolved (file + env + flag) user
/// configuration; `terminate` is flipped by the Ctrl-C handler installed in `main` and is polled
/// by long-running commands (`ls`, `validate`) so they can stop cleanly between objects instead
/// of leaving partially written output.
#[enum_dispatch::enum_dispatch]
pub trait Cmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        args: GlobalArgs,
        config: &Config,
        terminate: &AtomicBool,
    ) -> Result<()>;
}

/// Dispatches a parsed CLI invocation to the command's `Cmd::exec` implementation.
pub fn exec_command(args: &VaultflArgs, config: &Config, terminate: &AtomicBool) -> Result<()> {
    let repo = create_repo(args, config)?;
    let global = GlobalArgs::new(args);
    let result = args.command.exec(&repo, global, config, terminate);
    repo.close();
    result
}

fn create_repo(args: &VaultflArgs, config: &Config) -> Result<OcflRepo> {
    let root = args
        .root
        .clone()
        .or_else(|| config.root.clone())
        .unwrap_or_else(|| ".".to_string());

    match args.target_storage(config) {
        Storage::FileSystem => OcflRepo::fs_repo(&root),
        #[cfg(feature = "s3")]
        Storage::S3 {
            region,
            bucket,
            endpoint,
            prefix,
        } => {
            let region = match endpoint {
                Some(endpoint) => Region::Custom {
                    name: region,
                    endpoint,
                },
                None => region.parse::<Region>()?,
            };
            let staging_root = args
                .staging_root
                .clone()
                .or_else(|| config.staging_root.clone())
                .map(Ok)
                .unwrap_or_else(|| crate::config::s3_staging_path(config))?;
            OcflRepo::s3_repo(region, &bucket, prefix.as_deref(), &staging_root)
        }
        #[cfg(not(feature = "s3"))]
        Storage::S3 { .. } => Err(VaultflError::IllegalArgument(
            "This build was compiled without S3 support".to_string(),
        )),
    }
}

/// Prints a styled fragment of text, stripping styling when `no_styles` is set (matches the
/// `--no-styles` flag and a non-tty stdout).
pub fn paint(no_styles: bool, style: Style, text: impl Display) -> String {
    if no_styles {
        text.to_string()
    } else {
        style.paint(text.to_string()).to_string()
    }
}

/// Writes a line to stdout, swallowing broken-pipe errors (e.g. piping into `head`).
pub fn println(value: impl Display) -> Result<()> {
    if let Err(e) = writeln!(io::stdout(), "{}", value) {
        if e.kind() != io::ErrorKind::BrokenPipe {
            return Err(e.into());
        }
    }
    Ok(())
}

/// Writes text to stdout without a trailing newline, swallowing broken-pipe errors.
pub fn print(value: impl Display) -> Result<()> {
    if let Err(e) = write!(io::stdout(), "{}", value) {
        if e.kind() != io::ErrorKind::BrokenPipe {
            return Err(e.into());
        }
    }
    Ok(())
}

/// Writes a line to stderr.
pub fn eprintln(value: impl Display) {
    let _ = writeln!(io::stderr(), "{}", value);
}
