// src/permissions/types.rs

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr};

use crate::identifier::ResourceIdentifier;

/// Access bits of a grant, using the host's flag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct GrantFlags(u32);

impl GrantFlags {
    pub const READ: Self = Self(0x1);
    pub const WRITE: Self = Self(0x2);

    const ALL_BITS: u32 = 0x3;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Keeps only the read/write bits; any other host flags are dropped.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub const fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }
}

impl BitAnd for GrantFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitOr for GrantFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl From<u32> for GrantFlags {
    fn from(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<GrantFlags> for u32 {
    fn from(flags: GrantFlags) -> Self {
        flags.bits()
    }
}

/// Access to a picked resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub identifier: ResourceIdentifier,
    pub flags: GrantFlags,
    /// Whether the host agreed to keep the grant across restarts
    pub persisted: bool,
}
