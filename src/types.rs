// SPDX-License-Identifier: Apache-2.0

// types.rs for hwx-shufti
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{LOW_NIBBLE_MASK, NIBBLE_TABLE_LEN};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShuftiError {
    /// The vector extension required by the compiled accelerated path is missing.
    #[error("Unsupported architecture: {0}")]
    ArchError(String),
    /// Tables or lane widths that do not satisfy the matcher contract.
    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, ShuftiError>;

/// Byte width of one hardware-parallel unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LaneWidth {
    W16,
    W32,
    W64,
}

impl LaneWidth {
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            LaneWidth::W16 => 16,
            LaneWidth::W32 => 32,
            LaneWidth::W64 => 64,
        }
    }

    pub fn from_bytes(bytes: usize) -> Result<Self> {
        match bytes {
            16 => Ok(LaneWidth::W16),
            32 => Ok(LaneWidth::W32),
            64 => Ok(LaneWidth::W64),
            other => Err(ShuftiError::PreconditionViolation(format!(
                "lane width must be 16, 32 or 64 bytes, got {}",
                other
            ))),
        }
    }

    /// Number of independent 16-byte lookup groups in one lane.
    #[inline]
    pub const fn groups(self) -> usize {
        self.bytes() / NIBBLE_TABLE_LEN
    }
}

/// Low/high nibble lookup tables for one character class.
///
/// A byte `b` is a member of the class when
/// `lo[b & 0xf] & hi[b >> 4] == 0`. The tables are produced by the pattern
/// compiler and are treated as opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NibbleMaskPair {
    pub lo: [u8; NIBBLE_TABLE_LEN],
    pub hi: [u8; NIBBLE_TABLE_LEN],
}

impl NibbleMaskPair {
    #[inline]
    pub const fn new(lo: [u8; NIBBLE_TABLE_LEN], hi: [u8; NIBBLE_TABLE_LEN]) -> Self {
        Self { lo, hi }
    }

    /// Builds a pair from untyped slices, checking the 16-entry contract.
    pub fn from_slices(lo: &[u8], hi: &[u8]) -> Result<Self> {
        Ok(Self {
            lo: nibble_table(lo, "low")?,
            hi: nibble_table(hi, "high")?,
        })
    }

    /// Scalar membership test, bit-for-bit what the vector matcher computes.
    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        let lo = self.lo[(byte & LOW_NIBBLE_MASK) as usize];
        let hi = self.hi[((byte >> 4) & LOW_NIBBLE_MASK) as usize];
        lo & hi == 0
    }
}

fn nibble_table(table: &[u8], which: &str) -> Result<[u8; NIBBLE_TABLE_LEN]> {
    table.try_into().map_err(|_| {
        ShuftiError::PreconditionViolation(format!(
            "{} nibble table must have {} entries, got {}",
            which,
            NIBBLE_TABLE_LEN,
            table.len()
        ))
    })
}

/// Checks that a lane-wide table is a 16-entry table replicated across every
/// 16-byte group of a `width`-byte lane.
///
/// Hot-path matchers never call this; it exists for offline and test-time
/// validation of compiled tables.
pub fn validate_tiled_table(table: &[u8], width: usize) -> Result<()> {
    let width = LaneWidth::from_bytes(width)?;
    if table.len() != width.bytes() {
        return Err(ShuftiError::PreconditionViolation(format!(
            "tiled table length {} does not match lane width {}",
            table.len(),
            width.bytes()
        )));
    }

    let first = &table[..NIBBLE_TABLE_LEN];
    for (group, tile) in table.chunks_exact(NIBBLE_TABLE_LEN).enumerate().skip(1) {
        if tile != first {
            return Err(ShuftiError::PreconditionViolation(format!(
                "table group {} differs from group 0",
                group
            )));
        }
    }
    Ok(())
}
