//! Mining pipeline: wires the reference collaborators (audit source,
//! filesystem snapshot, FHS rules) and `mpm-core`'s generalization
//! passes into the single end-to-end run the CLI surface describes
//! (§6 CLI surface, §2 data flow).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use mpm_core::audit::AuditSource as _;
use mpm_core::generalize::{nonexistent, owner, promote, runs, threshold};
use mpm_core::trie::Trie;
use mpm_core::{merge, MiningConfig};

use crate::audit_source::JsonlAuditSource;
use crate::cli::args::Cli;
use crate::export::{self, ConfusionMatrix};
use crate::fs_snapshot::DirectoryManifest;

/// One run group's per-run tries plus their §4.9 merge — the unit both
/// the mined side and (when present) the reference side of an
/// evaluation are built from.
struct RunGroup {
    per_run: Vec<Trie>,
    merged: Trie,
}

fn load_run(path: &Path) -> Result<Trie> {
    let source = JsonlAuditSource::new(path);
    let entries = source
        .entries()
        .with_context(|| format!("reading audit log '{}'", path.display()))?;
    let mut trie = Trie::new();
    trie.load_log(&entries);
    Ok(trie)
}

fn load_run_group(paths: &[PathBuf]) -> Result<RunGroup> {
    let per_run: Vec<Trie> = paths.iter().map(|p| load_run(p)).collect::<Result<_>>()?;
    let merged = merge::merge_all(&per_run).context("merging run group")?;
    Ok(RunGroup { per_run, merged })
}

fn accessed_path_sets(per_run: &[Trie]) -> Vec<HashSet<String>> {
    per_run.iter().map(|t| t.accessed_paths().into_keys().collect()).collect()
}

/// Apply the enabled generalization passes (C5–C8, C11) to `trie` in
/// place.
///
/// Order is fixed by this pipeline, not by the spec (which only
/// constrains data flow, §2): threshold lift first (the cheapest,
/// purely-local pass), then owner lift and nonexistent-path lift (both
/// need `snapshot`), then multi-run synthesis (only when more than one
/// run contributed to this group), and promotion last so every earlier
/// pass's `generalized` output gets a chance to turn into a live regex
/// child.
fn generalize(trie: &mut Trie, run_paths: &[HashSet<String>], snapshot: Option<&DirectoryManifest>, config: &MiningConfig) {
    match snapshot {
        Some(snapshot) => {
            threshold::generalize_fs(trie, snapshot, config);
            owner::generalize_by_owner(trie, snapshot, config);
            nonexistent::generalize_nonexistent(trie, snapshot, config);
        }
        None => threshold::generalize(trie, config),
    }

    if run_paths.len() > 1 {
        runs::generalize_multiple_runs(trie, run_paths, config);
    }

    promote::promote_generalized(trie);
}

/// Apply the ambient, non-`generalized`-staged rules: FHS rules (C10)
/// land accesses directly, as does the owner-by-directory variant of
/// C6 (§4.6 last paragraph) — neither goes through promotion, so this
/// runs after [`generalize`].
fn apply_ambient_rules(
    trie: &mut Trie,
    snapshot: Option<&DirectoryManifest>,
    fhs_rules: Option<&[mpm_core::fhs::FhsRule]>,
    users: &[u32],
    groups: &[u32],
) -> Result<()> {
    let domains = trie.domains();

    if let Some(rules) = fhs_rules {
        mpm_core::fhs::apply_rules(trie, rules, &domains);
    }

    if let Some(snapshot) = snapshot {
        if !(users.is_empty() && groups.is_empty()) {
            owner::generalize_by_owner_directory(trie, snapshot, users, groups, &domains)
                .context("running owner-by-directory generalization")?;
        }
    }

    Ok(())
}

fn mine_group(
    paths: &[PathBuf],
    snapshot: Option<&DirectoryManifest>,
    fhs_rules: Option<&[mpm_core::fhs::FhsRule]>,
    config: &MiningConfig,
    users: &[u32],
    groups: &[u32],
) -> Result<Trie> {
    let group = load_run_group(paths)?;
    let mut trie = group.merged;
    let run_paths = accessed_path_sets(&group.per_run);
    generalize(&mut trie, &run_paths, snapshot, config);
    apply_ambient_rules(&mut trie, snapshot, fhs_rules, users, groups)?;
    Ok(trie)
}

/// Run the full mining (and, when a second run group is supplied,
/// evaluation) pipeline for one CLI invocation, writing result files
/// under `results_root/results/<case>/<eval_case>/` (§6 File formats)
/// and returning the process exit code to use.
pub fn run(cli: &Cli, results_root: &Path) -> Result<i32> {
    log_contexts(&cli.subject, &cli.object);

    let config = crate::config::load(cli.config.as_deref()).context("loading mining configuration")?;

    let snapshot = cli
        .db
        .as_deref()
        .map(DirectoryManifest::load)
        .transpose()
        .context("loading filesystem snapshot")?;

    let fhs_rules = cli
        .fhs_rules
        .as_deref()
        .map(load_fhs_rules)
        .transpose()
        .context("loading FHS rules")?;

    let mut mined = mine_group(&cli.service1_logs, snapshot.as_ref(), fhs_rules.as_deref(), &config, &cli.user, &cli.group)?;

    let (eval_case, report) = if cli.service2_logs.is_empty() {
        (
            "mined".to_string(),
            export::EvaluationReport::default(),
        )
    } else {
        let mut reference = mine_group(&cli.service2_logs, snapshot.as_ref(), fhs_rules.as_deref(), &config, &cli.user, &cli.group)?;
        ("reference".to_string(), export::evaluate(&mut mined, &mut reference))
    };

    let confusion = ConfusionMatrix::from_report(&report);
    tracing::info!(
        case = %cli.case,
        eval_case = %eval_case,
        hit = confusion.hit,
        correct_denial = confusion.correct_denial,
        underpermission = confusion.underpermission,
        overpermission = confusion.overpermission,
        "mining complete"
    );

    let dir = export::result_dir(results_root, &cli.case, &eval_case);
    export::write_results(&dir, &report, &confusion, &mined.dump())
        .with_context(|| format!("writing results to '{}'", dir.display()))?;

    Ok(crate::exit_codes::OK)
}

/// Resolve `--subject`/`--object` service names against the SELinux
/// context tables (A4) and log what was found, purely for operator
/// visibility — these never feed back into the generalization engine
/// (§1 Non-goals: the core doesn't know about SELinux).
fn log_contexts(subjects: &[String], objects: &[String]) {
    for service in subjects {
        match crate::contexts::subject_contexts(service) {
            Some(contexts) => tracing::info!(service = %service, ?contexts, "resolved subject contexts"),
            None => tracing::warn!(service = %service, "no subject contexts known for this service"),
        }
    }
    for service in objects {
        match crate::contexts::object_types(service) {
            Some(types) => tracing::info!(service = %service, ?types, "resolved object types"),
            None => tracing::warn!(service = %service, "no object types known for this service"),
        }
    }
}

fn load_fhs_rules(path: &Path) -> Result<Vec<mpm_core::fhs::FhsRule>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading FHS rules '{}'", path.display()))?;
    Ok(mpm_core::fhs::parse_rules_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_log(entries: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in entries {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn entry(path: &str, perm: &str, uid: u32) -> String {
        format!(
            r#"{{"proctitle":"t","path":"{path}","permission":{perm},"uid":{uid},"pid":1,"ppid":0,"operation":"open","domain":[{{"binary_path":"/bin/t","effective_uid":{uid}}}]}}"#
        )
    }

    #[test]
    fn mining_a_single_run_with_no_db_just_loads_the_log() {
        let file = write_log(&[&entry("/etc/passwd", "1", 0)]);
        let cli = Cli {
            case: "c".to_string(),
            service1_logs: vec![file.path().to_path_buf()],
            service2_logs: Vec::new(),
            user: Vec::new(),
            group: Vec::new(),
            subject: Vec::new(),
            object: Vec::new(),
            config: None,
            db: None,
            fhs_rules: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let code = run(&cli, dir.path()).unwrap();
        assert_eq!(code, crate::exit_codes::OK);

        let tree = std::fs::read_to_string(dir.path().join("results/c/mined/tree.txt")).unwrap();
        assert!(tree.contains("passwd"));
    }

    #[test]
    fn two_groups_produce_a_reference_evaluation() {
        let mined_file = write_log(&[&entry("/etc/passwd", "1", 0), &entry("/etc/shadow", "1", 0)]);
        let reference_file = write_log(&[&entry("/etc/passwd", "3", 0)]);
        // reference grants READ|WRITE on /etc/passwd, mined only grants
        // READ: READ is a hit, WRITE is an underpermission.

        let cli = Cli {
            case: "c2".to_string(),
            service1_logs: vec![mined_file.path().to_path_buf()],
            service2_logs: vec![reference_file.path().to_path_buf()],
            user: Vec::new(),
            group: Vec::new(),
            subject: Vec::new(),
            object: Vec::new(),
            config: None,
            db: None,
            fhs_rules: None,
        };

        let dir = tempfile::tempdir().unwrap();
        run(&cli, dir.path()).unwrap();

        let confusion = std::fs::read_to_string(dir.path().join("results/c2/reference/confusion.txt")).unwrap();
        assert!(confusion.contains("hit=1"));
        assert!(confusion.contains("underpermission=1"));
    }
}
