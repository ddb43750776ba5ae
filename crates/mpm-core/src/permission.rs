//! Permission bitset (C1): a closed flag set over {READ, WRITE, SEE}.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// A single permission bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionBit {
    /// Read access.
    Read,
    /// Write access.
    Write,
    /// Directory traversal / visibility access.
    See,
}

impl PermissionBit {
    const ALL: [PermissionBit; 3] = [PermissionBit::Read, PermissionBit::Write, PermissionBit::See];

    fn mask(self) -> u8 {
        match self {
            PermissionBit::Read => 0b001,
            PermissionBit::Write => 0b010,
            PermissionBit::See => 0b100,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            PermissionBit::Read => "READ",
            PermissionBit::Write => "WRITE",
            PermissionBit::See => "SEE",
        }
    }

    fn short(self) -> char {
        match self {
            PermissionBit::Read => 'r',
            PermissionBit::Write => 'w',
            PermissionBit::See => 's',
        }
    }
}

/// Union of [`PermissionBit`] flags attached to an [`Access`](crate::access::Access).
///
/// Value semantics: equality, hashing and ordering are by the underlying
/// bitmask, so two `Permission`s built from the same flags in any order
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Permission(u8);

impl Permission {
    /// The empty permission set.
    pub const NONE: Permission = Permission(0);
    /// Read-only.
    pub const READ: Permission = Permission(0b001);
    /// Write-only.
    pub const WRITE: Permission = Permission(0b010);
    /// See-only.
    pub const SEE: Permission = Permission(0b100);

    /// Build a `Permission` from a single bit.
    pub fn from_bit(bit: PermissionBit) -> Self {
        Permission(bit.mask())
    }

    /// `true` if no bits are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if every bit in `other` is also set in `self`.
    pub fn contains(self, other: Permission) -> bool {
        self.0 & other.0 == other.0
    }

    /// Iterate over the individual bits present in this permission set, in
    /// `READ, WRITE, SEE` order (stable — relied on by deterministic
    /// generalization counting, §5).
    pub fn iter_bits(self) -> impl Iterator<Item = Permission> + 'static {
        PermissionBit::ALL
            .into_iter()
            .filter(move |b| self.0 & b.mask() != 0)
            .map(Permission::from_bit)
    }

    /// Mnemonic rendering, e.g. `READ|WRITE`.
    pub fn mnemonic(self) -> String {
        if self.is_empty() {
            return "NONE".to_string();
        }
        PermissionBit::ALL
            .into_iter()
            .filter(|b| self.0 & b.mask() != 0)
            .map(PermissionBit::mnemonic)
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Compact one-character-per-flag rendering, e.g. `rw`.
    pub fn short_repr(self) -> String {
        PermissionBit::ALL
            .into_iter()
            .filter(|b| self.0 & b.mask() != 0)
            .map(PermissionBit::short)
            .collect()
    }
}

impl BitOr for Permission {
    type Output = Permission;
    fn bitor(self, rhs: Self) -> Self::Output {
        Permission(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permission {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<PermissionBit> for Permission {
    fn from(bit: PermissionBit) -> Self {
        Permission::from_bit(bit)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_commutative() {
        let a = Permission::READ | Permission::WRITE;
        let b = Permission::WRITE | Permission::READ;
        assert_eq!(a, b);
    }

    #[test]
    fn mnemonic_rendering() {
        let p = Permission::READ | Permission::WRITE;
        assert_eq!(p.mnemonic(), "READ|WRITE");
        assert_eq!(p.short_repr(), "rw");
    }

    #[test]
    fn iter_bits_is_ordered() {
        let p = Permission::SEE | Permission::READ;
        let bits: Vec<_> = p.iter_bits().collect();
        assert_eq!(bits, vec![Permission::READ, Permission::SEE]);
    }

    #[test]
    fn contains_checks_subset() {
        let p = Permission::READ | Permission::WRITE;
        assert!(p.contains(Permission::READ));
        assert!(!p.contains(Permission::SEE));
    }
}
