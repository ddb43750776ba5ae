//! Audit-log record shape consumed by the trie (§6, C3 `load_log`).
//!
//! The tokenizer that produces these records is explicitly out of scope
//! (§1, §6) — it is an external collaborator. This module only defines
//! the narrow interface the engine consumes.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::permission::Permission;

/// One syscall-decision record, already assembled by the (external)
/// audit-log parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Process title at the time of the access, recorded for debugging
    /// only — never participates in trie equality or generalization.
    pub proctitle: String,
    /// Absolute path accessed. May carry a trailing `" (deleted)"`
    /// marker, which `Trie::load_log` strips before insertion.
    pub path: String,
    /// Permission bits exercised.
    pub permission: Permission,
    /// Acting uid.
    pub uid: u32,
    /// Process id (informational; not used by the engine).
    pub pid: u32,
    /// Parent process id (informational; not used by the engine).
    pub ppid: u32,
    /// Operation name as reported by the audit subsystem (informational).
    pub operation: String,
    /// The process's exec-history domain at the time of the access.
    pub domain: Domain,
}

/// A source of [`AuditEntry`] records — the consumer-side boundary for
/// the out-of-scope audit-log tokenizer.
pub trait AuditSource {
    /// Error type surfaced when entries cannot be produced.
    type Error: std::error::Error + 'static;

    /// Yield every entry from this source.
    fn entries(&self) -> Result<Vec<AuditEntry>, Self::Error>;
}
