//! Config enumeration (§6) and owner/multi-run strategy types (C6, C8).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which owner-based generalization strategies (C6) are enabled, and in
/// what preference order they are tried. Order is fixed by the spec
/// (OWN_DIR → OWN_FILES → READ_FILES → WRITE_FILES, §4.6) — this type
/// only controls which of the four are *enabled*, not their order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerGeneralizationStrategy {
    /// Lift an access when `uid` owns the directory itself.
    pub own_dir: bool,
    /// Lift an access when `uid` owns every (non-empty) child.
    pub own_files: bool,
    /// Lift an access when `uid` can read every (non-empty) child.
    pub read_files: bool,
    /// Lift an access when `uid` can write every (non-empty) child.
    pub write_files: bool,
}

impl OwnerGeneralizationStrategy {
    /// All four strategies enabled (the documented default).
    pub const fn all() -> Self {
        Self {
            own_dir: true,
            own_files: true,
            read_files: true,
            write_files: true,
        }
    }

    /// No strategies enabled.
    pub const fn none() -> Self {
        Self {
            own_dir: false,
            own_files: false,
            read_files: false,
            write_files: false,
        }
    }
}

impl Default for OwnerGeneralizationStrategy {
    fn default() -> Self {
        Self::all()
    }
}

/// How the multi-run generalizer (C8) handles a singleton similarity
/// cluster (a unique path with no sibling to diff against).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultipleRunsStrategy {
    /// Skip — no generalization is created for the singleton.
    NoAction,
    /// Replace runs of digits with `\d*` (regex-escaping everything else).
    NumericalGeneralization,
    /// Emit a universal `.*` for the singleton.
    FullGeneralization,
}

impl Default for MultipleRunsStrategy {
    fn default() -> Self {
        MultipleRunsStrategy::NumericalGeneralization
    }
}

/// All tunable thresholds and strategy choices for a mining run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Fraction of children (counted from the logs) that must share an
    /// access for the threshold generalizer (C5) to lift it.
    pub generalize_threshold: f64,
    /// Same as `generalize_threshold`, but children are counted from the
    /// filesystem snapshot (C5′).
    pub generalize_fs_threshold: f64,
    /// Enables the `/proc/PID/` → `/proc/[0-9]+/` rewrite on final
    /// output paths.
    pub generalize_proc: bool,
    /// Enabled owner-generalization strategies (C6).
    pub owner_generalization_strategy: OwnerGeneralizationStrategy,
    /// Strategy used for multi-run singleton clusters (C8).
    pub multiple_runs_strategy: MultipleRunsStrategy,
    /// Similarity threshold used to cluster unique paths of equal depth
    /// before diffing (C8). Tuned empirically in the source project:
    /// 0.5 and 0.45 were both too permissive, 0.425 was right.
    pub similarity_threshold: f64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            generalize_threshold: 1.0,
            generalize_fs_threshold: 1.0,
            generalize_proc: true,
            owner_generalization_strategy: OwnerGeneralizationStrategy::all(),
            multiple_runs_strategy: MultipleRunsStrategy::default(),
            similarity_threshold: 0.425,
        }
    }
}

/// Rewrite `/proc/<pid>/...` paths to `/proc/[0-9]+/...` when
/// [`MiningConfig::generalize_proc`] is enabled.
pub fn generalize_proc_path(path: &str, config: &MiningConfig) -> String {
    if !config.generalize_proc {
        return path.to_string();
    }
    static PROC_PID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/proc/[0-9]+/").unwrap());
    PROC_PID.replace(path, "/proc/[0-9]+/").into_owned()
}
