//! `mpm`: mine (and optionally evaluate) a MAC policy from audit-log
//! evidence (§6 CLI surface).
//!
//! This binary supplies the reference collaborators `mpm-core` only
//! consumes through traits — a JSONL [`audit_source::JsonlAuditSource`],
//! a JSON [`fs_snapshot::DirectoryManifest`], the SELinux [`contexts`]
//! tables, and the [`export`] result writer — and wires them together
//! in [`pipeline::run`].

mod audit_source;
mod cli;
mod config;
mod contexts;
mod exit_codes;
mod export;
mod fs_snapshot;
mod pipeline;

use std::path::Path;

use clap::Parser;

use cli::args::Cli;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => exit_codes::OK,
                _ => exit_codes::ARGS_ERROR,
            };
            err.print().ok();
            std::process::exit(code);
        }
    }
}

fn main() {
    init_tracing();
    let cli = parse_args();

    let code = match pipeline::run(&cli, Path::new(".")) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fatal: {err:?}");
            exit_codes::FATAL
        }
    };
    std::process::exit(code);
}
