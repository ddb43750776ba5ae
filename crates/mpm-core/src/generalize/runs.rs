//! Multi-run generalizer (C8): compare several independent mining runs
//! of the *same* service and turn sibling paths that differ only in
//! some run-specific token (a pid, a session id, a timestamp) into a
//! single regex child.
//!
//! A path is a *candidate* for this pass only if it is "unique" across
//! runs — present in an odd number of the run sets. The source project
//! computes this two ways (a `Counter`-based count, and a fold of
//! `^` over every run's path set) but only ever uses the second result;
//! the first is dead code. This module only implements the fold, which
//! is the one semantics that matters (§9 Open Question, resolved).
//!
//! Regex synthesis never deletes the concrete accesses it generalizes
//! over: if the synthesized regex turned out to be wrong, deleting the
//! originals would leave a node with no permissions at all, silently
//! turning "over-broad" into "denies everything". The synthesized regex
//! node is additive.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use similar::{ChangeTag, TextDiff};

use crate::config::{MiningConfig, MultipleRunsStrategy};
use crate::trie::Trie;

/// Elements present in an odd number of `runs` (iterated fold of
/// symmetric difference — matches the one code path the source project
/// actually exercises).
pub fn unique_paths(runs: &[HashSet<String>]) -> HashSet<String> {
    runs.iter().fold(HashSet::new(), |acc, run| {
        acc.symmetric_difference(run).cloned().collect()
    })
}

/// Run the multi-run generalizer over `trie`, using `run_paths` (the
/// accessed-path set of each individual run that was merged into
/// `trie`, see C9) to find unique, run-specific paths worth
/// generalizing.
///
/// Matches §4.8 steps 2-3 and the source project's `group_similar_strings`
/// + `dmp.diff_main` (`runs.py:144-158`): unique paths are bucketed by
/// their `/`-separator count (depth), not by parent directory, and
/// clustered/diffed as *whole paths*, not basenames — two paths under
/// different parents at the same depth can still cluster and be
/// generalized together.
pub fn generalize_multiple_runs(trie: &mut Trie, run_paths: &[HashSet<String>], config: &MiningConfig) {
    let unique = unique_paths(run_paths);

    let mut by_depth: HashMap<usize, Vec<String>> = HashMap::new();
    for path in &unique {
        by_depth.entry(path.matches('/').count()).or_default().push(path.clone());
    }

    let mut depths: Vec<usize> = by_depth.keys().copied().collect();
    depths.sort_unstable();

    for depth in depths {
        let mut paths = by_depth.remove(&depth).expect("just collected");
        paths.sort();

        for cluster in cluster_similar(&paths, config.similarity_threshold) {
            let Some(pattern) = synthesize_regex(&cluster, config) else {
                tracing::warn!(depth, cluster_size = cluster.len(), "no covering regex found for cluster, leaving concrete paths as-is");
                continue;
            };

            let regex_node = trie.add_path_generalization(&pattern);
            trie.node_mut(regex_node).is_regexp = true;

            for path in &cluster {
                if let Some(&node) = trie.accessed_paths().get(path) {
                    let accesses = trie.node(node).accesses.clone();
                    trie.node_mut(regex_node).accesses.extend(&accesses);
                }
            }
        }
    }
}

/// Greedily cluster `items` by normalized Levenshtein similarity: each
/// unclustered item starts a new cluster (becoming its leader) and pulls
/// in every later item similar enough to it. Mirrors the source
/// project's depth-bucketed `group_similar_strings` step.
fn cluster_similar(items: &[String], threshold: f64) -> Vec<Vec<String>> {
    let mut clusters: Vec<Vec<String>> = Vec::new();
    let mut assigned = vec![false; items.len()];

    for i in 0..items.len() {
        if assigned[i] {
            continue;
        }
        let mut cluster = vec![items[i].clone()];
        assigned[i] = true;
        for j in (i + 1)..items.len() {
            if assigned[j] {
                continue;
            }
            if strsim::normalized_levenshtein(&items[i], &items[j]) >= threshold {
                cluster.push(items[j].clone());
                assigned[j] = true;
            }
        }
        clusters.push(cluster);
    }
    clusters
}

fn synthesize_regex(cluster: &[String], config: &MiningConfig) -> Option<String> {
    match cluster {
        [] => None,
        [single] => match config.multiple_runs_strategy {
            MultipleRunsStrategy::NoAction => None,
            MultipleRunsStrategy::NumericalGeneralization => Some(numeric_regexp(single)),
            MultipleRunsStrategy::FullGeneralization => Some(".*".to_string()),
        },
        [leader, rest @ ..] => {
            for candidate_against in rest {
                let candidate = regex_from_diff(leader, candidate_against);
                if rest.iter().all(|member| fullmatch(&candidate, member)) {
                    return Some(candidate);
                }
            }
            prefix_suffix_fallback(cluster)
        }
    }
}

/// Escape every character Python's `re.escape` treats as special —
/// regex metacharacters *and* whitespace — unlike [`regex::escape`],
/// which leaves whitespace untouched (§8 scenario 2: `hello world` →
/// `hello\ world`). The source project's synthesis runs on `re.escape`
/// output, so this port matches it character-for-character rather than
/// the Rust crate's narrower notion of "meta".
fn python_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '(' | ')' | '[' | ']' | '{' | '}' | '?' | '*' | '+' | '-' | '|' | '^' | '$' | '\\' | '.' | '&' | '~' | '#'
                | ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape `s` entirely, then replace every run of digits with `\d*`
/// (escaping first means the digits themselves need no special
/// handling — only literal digit characters can form a run).
fn numeric_regexp(s: &str) -> String {
    static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
    let escaped = python_escape(s);
    DIGIT_RUN.replace_all(&escaped, r"\d*").into_owned()
}

/// Build a regex from a char-level diff of `a` against `b`: equal spans
/// are emitted as escaped literals, and any run of inserts/deletes
/// collapses into a single non-greedy `.*?` (so `12` vs `345` yields a
/// single wildcard, not one per differing character).
fn regex_from_diff(a: &str, b: &str) -> String {
    let diff = TextDiff::from_chars(a, b);
    let mut out = String::new();
    let mut in_gap = false;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                in_gap = false;
                out.push_str(&python_escape(change.value()));
            }
            ChangeTag::Insert | ChangeTag::Delete => {
                if !in_gap {
                    out.push_str(".*?");
                    in_gap = true;
                }
            }
        }
    }
    out
}

fn fullmatch(pattern: &str, s: &str) -> bool {
    Regex::new(&format!("^(?:{pattern})$"))
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}

/// Last-resort synthesis: the longest common prefix and suffix across
/// every member, joined by `.*`. Sanity-checked against every member
/// before being returned — a common prefix/suffix that happens to
/// overlap badly can still fail to cover the set.
fn prefix_suffix_fallback(cluster: &[String]) -> Option<String> {
    let prefix = common_prefix(cluster);
    let suffix = common_suffix(cluster, prefix.len());
    let pattern = format!("{}.*{}", python_escape(&prefix), python_escape(&suffix));
    if cluster.iter().all(|member| fullmatch(&pattern, member)) {
        Some(pattern)
    } else {
        None
    }
}

fn common_prefix(items: &[String]) -> String {
    let mut prefix = items[0].clone();
    for item in &items[1..] {
        let common_len = prefix
            .chars()
            .zip(item.chars())
            .take_while(|(a, b)| a == b)
            .count();
        prefix = prefix.chars().take(common_len).collect();
    }
    prefix
}

fn common_suffix(items: &[String], reserved_prefix_len: usize) -> String {
    let mut suffix = items[0].clone();
    for item in &items[1..] {
        let common_len = suffix
            .chars()
            .rev()
            .zip(item.chars().rev())
            .take_while(|(a, b)| a == b)
            .count();
        let start = suffix.chars().count().saturating_sub(common_len);
        suffix = suffix.chars().skip(start).collect();
    }
    // Don't let an overlapping prefix/suffix double-count shared characters
    // on short strings.
    let max_len = items.iter().map(|s| s.chars().count()).min().unwrap_or(0);
    let allowed = max_len.saturating_sub(reserved_prefix_len);
    let skip = suffix.chars().count().saturating_sub(allowed.min(suffix.chars().count()));
    suffix.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_paths_is_symmetric_difference_fold() {
        let run_a: HashSet<String> = ["/proc/1/status".to_string(), "/proc/common".to_string()].into();
        let run_b: HashSet<String> = ["/proc/2/status".to_string(), "/proc/common".to_string()].into();
        let unique = unique_paths(&[run_a, run_b]);
        assert!(unique.contains("/proc/1/status"));
        assert!(unique.contains("/proc/2/status"));
        assert!(!unique.contains("/proc/common"));
    }

    #[test]
    fn numeric_strategy_generalizes_singleton_digits() {
        let config = MiningConfig {
            multiple_runs_strategy: MultipleRunsStrategy::NumericalGeneralization,
            ..MiningConfig::default()
        };
        let pattern = synthesize_regex(&["session-482".to_string()], &config).unwrap();
        assert!(fullmatch(&pattern, "session-482"));
        assert!(fullmatch(&pattern, "session-1"));
    }

    #[test]
    fn no_action_strategy_skips_singletons() {
        let config = MiningConfig {
            multiple_runs_strategy: MultipleRunsStrategy::NoAction,
            ..MiningConfig::default()
        };
        assert!(synthesize_regex(&["only-one".to_string()], &config).is_none());
    }

    #[test]
    fn diff_based_regex_covers_a_pid_cluster() {
        let config = MiningConfig::default();
        let cluster = vec!["123".to_string(), "456".to_string(), "78".to_string()];
        let pattern = synthesize_regex(&cluster, &config).unwrap();
        for member in &cluster {
            assert!(fullmatch(&pattern, member), "pattern {pattern} must match {member}");
        }
    }

    #[test]
    fn numeric_regexp_matches_spec_scenario_2() {
        assert_eq!(numeric_regexp("123something123"), r"\d*something\d*");
        assert_eq!(numeric_regexp("123some1thing123"), r"\d*some\d*thing\d*");
        assert_eq!(numeric_regexp("a1b2c"), r"a\d*b\d*c");
        assert_eq!(numeric_regexp("hello world"), r"hello\ world");
    }

    #[test]
    fn numeric_regexp_over_digit_free_input_is_just_the_escaped_input() {
        assert_eq!(numeric_regexp("hello world"), python_escape("hello world"));
    }

    #[test]
    fn unique_paths_at_the_same_depth_but_different_parents_can_still_cluster() {
        // "/run/user/1000" and "/run/user/2000" are different *parent*
        // directories of "bus" — the old parent-keyed bucketing could
        // never cluster these; depth-keyed bucketing over full paths does.
        let mut trie = Trie::new();
        trie.insert("/run/user/1000/bus");
        trie.insert("/run/user/2000/bus");

        let run_a: HashSet<String> = ["/run/user/1000/bus".to_string()].into();
        let run_b: HashSet<String> = ["/run/user/2000/bus".to_string()].into();
        generalize_multiple_runs(&mut trie, &[run_a, run_b], &MiningConfig::default());

        let regex_nodes: Vec<_> = trie
            .post_order()
            .into_iter()
            .filter(|&n| trie.node(n).is_regexp)
            .collect();
        assert!(!regex_nodes.is_empty(), "same-depth paths under different parents should still cluster and synthesize a regex node");
    }
}
