//! Error taxonomy (§7, A3): the fatal/non-fatal split the spec draws.
//!
//! "Missing path" during lookup is deliberately *not* a variant here —
//! `Trie::find` returns `Option<NodeId>` and the caller treats `None` as
//! "no permission", per §7. Only genuinely fatal conditions are errors.

use thiserror::Error;

/// Errors raised by the generalization engine.
#[derive(Debug, Error)]
pub enum MpmError {
    /// An attempted reassignment of an already-set `Access` field, or a
    /// merge between nodes whose `is_regexp` flags disagree (I1–I5).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A collaborator (filesystem-snapshot DB, rules file, result
    /// directory) failed.
    #[error("external I/O failure: {0}")]
    ExternalIo(#[from] std::io::Error),

    /// The multi-run generalizer (C8) could not synthesize a regex that
    /// covers every member of a similarity cluster, and the
    /// prefix/suffix fallback also failed to cover every member.
    #[error("regex synthesis failed for cluster of {cluster_size} paths: {reason}")]
    RegexSynthesisFailure {
        /// Number of paths in the cluster that could not be covered.
        cluster_size: usize,
        /// Why synthesis failed.
        reason: String,
    },

    /// A regex pattern stored on a trie node failed to compile.
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying compile error.
        #[source]
        source: regex::Error,
    },

    /// CLI argument error (usage message, exit –1).
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// A rules-file line could not be parsed.
    #[error("malformed FHS rule on line {line}: {reason}")]
    MalformedRule {
        /// 1-based line number in the rules file.
        line: usize,
        /// Why the line was rejected.
        reason: String,
    },
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, MpmError>;
