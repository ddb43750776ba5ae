//! FHS rule loader/applier (C10): ambient rules injected into the trie
//! independent of observed accesses, e.g. the handful of paths every
//! process on the box is allowed to see regardless of what the audit
//! log happened to record (`/lib`, `/usr/lib`, `/proc/self`, …).
//!
//! The rules file format is line-oriented plain text (§6 File formats):
//! one rule per non-blank, non-comment line, four whitespace-separated
//! fields —
//!
//! ```text
//! <path-pattern> <perm-bits> <recursive: 0|1> <regexp: 0|1>
//! ```
//!
//! `perm-bits` is a comma-separated list of [`Permission`] mnemonics
//! (`READ`, `WRITE`, `SEE`). Lines starting with `#` and blank lines are
//! ignored.

use std::io::BufRead;

use crate::domain::Domain;
use crate::error::{MpmError, Result};
use crate::permission::Permission;
use crate::trie::Trie;

/// One ambient rule parsed from an FHS rules file (§3 FHSRule).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FhsRule {
    /// Path the rule applies to. May itself contain a regex component
    /// (e.g. `[0-9]+`) when `is_regexp` is set.
    pub path_pattern: String,
    /// Permission bits granted.
    pub permissions: Permission,
    /// Whether the destination node should be marked `is_recursive`
    /// (applies to the whole descendant subtree, §3 I5).
    pub recursive: bool,
    /// Whether the destination node's final component should be marked
    /// `is_regexp`.
    pub is_regexp: bool,
}

fn parse_permissions(field: &str, line: usize) -> Result<Permission> {
    let mut perm = Permission::NONE;
    for token in field.split(',') {
        let token = token.trim();
        perm |= match token {
            "READ" => Permission::READ,
            "WRITE" => Permission::WRITE,
            "SEE" => Permission::SEE,
            other => {
                return Err(MpmError::MalformedRule {
                    line,
                    reason: format!("unknown permission token '{other}'"),
                })
            }
        };
    }
    Ok(perm)
}

fn parse_flag(field: &str, name: &str, line: usize) -> Result<bool> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(MpmError::MalformedRule {
            line,
            reason: format!("expected 0 or 1 for {name}, got '{other}'"),
        }),
    }
}

/// Parse a complete rules file from an in-memory string.
pub fn parse_rules_str(content: &str) -> Result<Vec<FhsRule>> {
    parse_rules(content.as_bytes())
}

/// Parse a complete rules file from any `Read` source (§5 "File handles
/// … are released on all exit paths" — the caller owns the reader, this
/// function never keeps it open past its own return).
pub fn parse_rules<R: std::io::Read>(source: R) -> Result<Vec<FhsRule>> {
    let reader = std::io::BufReader::new(source);
    let mut rules = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(MpmError::ExternalIo)?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [path, perms, recursive, regexp] = fields[..] else {
            return Err(MpmError::MalformedRule {
                line: line_no,
                reason: format!("expected 4 fields, got {}", fields.len()),
            });
        };
        rules.push(FhsRule {
            path_pattern: path.to_string(),
            permissions: parse_permissions(perms, line_no)?,
            recursive: parse_flag(recursive, "recursive", line_no)?,
            is_regexp: parse_flag(regexp, "regexp", line_no)?,
        });
    }
    Ok(rules)
}

/// Apply every rule in `rules` to `trie`, emitting an access at the
/// rule's path for every domain in `domains` (§4.10). The uid of each
/// emitted access is the domain's current effective uid (0 for the
/// empty/initial domain).
pub fn apply_rules(trie: &mut Trie, rules: &[FhsRule], domains: &[Domain]) {
    for rule in rules {
        let node = trie.insert(&rule.path_pattern);
        trie.node_mut(node).is_regexp = rule.is_regexp;
        trie.node_mut(node).is_recursive = rule.recursive;

        for domain in domains {
            let uid = domain.current().map(|link| link.effective_uid).unwrap_or(0);
            trie.node_mut(node)
                .accesses
                .add_access(crate::access::Access::new(rule.permissions, uid, domain.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[test]
    fn parses_a_rules_file_skipping_blanks_and_comments() {
        let text = "\
# ambient FHS rules
/usr/lib READ 0 0

/proc/[0-9]+ READ,SEE 1 1
";
        let rules = parse_rules_str(text).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].path_pattern, "/usr/lib");
        assert_eq!(rules[0].permissions, Permission::READ);
        assert!(!rules[0].recursive);
        assert!(!rules[0].is_regexp);

        assert_eq!(rules[1].permissions, Permission::READ | Permission::SEE);
        assert!(rules[1].recursive);
        assert!(rules[1].is_regexp);
    }

    #[test]
    fn malformed_permission_token_is_rejected() {
        let err = parse_rules_str("/x BOGUS 0 0").unwrap_err();
        assert!(matches!(err, MpmError::MalformedRule { .. }));
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let err = parse_rules_str("/x READ 0").unwrap_err();
        assert!(matches!(err, MpmError::MalformedRule { .. }));
    }

    #[test]
    fn apply_rules_grants_access_per_domain_and_sets_flags() {
        let mut trie = Trie::new();
        let rules = vec![FhsRule {
            path_pattern: "/proc/[0-9]+".to_string(),
            permissions: Permission::READ,
            recursive: true,
            is_regexp: true,
        }];
        let domains = vec![Domain::empty().exec("/usr/sbin/sshd", 0)];

        apply_rules(&mut trie, &rules, &domains);

        let node = trie.insert("/proc/[0-9]+");
        assert!(trie.node(node).is_regexp);
        assert!(trie.node(node).is_recursive);
        assert!(trie.node(node).accesses.get(0, &domains[0]).is_some());
    }
}
