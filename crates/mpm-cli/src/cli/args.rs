//! Argument surface (§6 CLI surface):
//!
//! ```text
//! mpm CASE SERVICE1_LOGS... [-- SERVICE2_LOGS...]
//!     [--user=U[,U...]] [--group=G[,G...]] [--subject=NAME] [--object=NAME]
//! ```
//!
//! `SERVICE1_LOGS` are the individual-run audit logs mined into the
//! policy under evaluation; `SERVICE2_LOGS`, when present after a `--`
//! separator, are logs for a second run group the multi-run
//! generalizer (C8) diffs the first group against and the evaluator
//! treats as the reference to score hits/misses against. `--subject`/
//! `--object` are repeatable and consult the SELinux context tables
//! (A4) by service name.

use std::path::PathBuf;

use clap::Parser;

/// Mine (and optionally evaluate) a MAC policy from audit-log evidence.
#[derive(Debug, Parser)]
#[command(name = "mpm", version, about)]
pub struct Cli {
    /// Name of the case being mined (used as the `results/<case>/...`
    /// export directory, §6 File formats).
    pub case: String,

    /// Audit logs for the first run group (one file per run).
    #[arg(required = true, num_args = 1..)]
    pub service1_logs: Vec<PathBuf>,

    /// Audit logs for a second run group, given after a literal `--`.
    /// When present, these are diffed against the first group (C8) and
    /// used as the evaluator's reference policy.
    #[arg(last = true)]
    pub service2_logs: Vec<PathBuf>,

    /// Uids whose accesses the evaluator/exporter restricts its report
    /// to. Repeatable; comma-separated values are also split.
    #[arg(long, value_delimiter = ',')]
    pub user: Vec<u32>,

    /// Gids whose accesses the evaluator/exporter restricts its report
    /// to. Repeatable; comma-separated values are also split.
    #[arg(long, value_delimiter = ',')]
    pub group: Vec<u32>,

    /// Service name(s) whose SELinux subject contexts (A4) bound the
    /// domains FHS rules and ownership lookups are applied for.
    /// Repeatable.
    #[arg(long)]
    pub subject: Vec<String>,

    /// Service name(s) whose SELinux object types (A4) label the
    /// accessed paths in exported reports. Repeatable.
    #[arg(long)]
    pub object: Vec<String>,

    /// Optional TOML file overriding the default [`mpm_core::MiningConfig`] (A1).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Optional JSON directory-manifest filesystem snapshot (A5),
    /// consulted by C5', C6, C7, and C12.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Optional FHS ambient-rules text file (C10).
    #[arg(long = "fhs-rules")]
    pub fhs_rules: Option<PathBuf>,
}
