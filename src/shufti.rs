// SPDX-License-Identifier: Apache-2.0

//! Shufti: byte-class membership via nibble table lookups
//!
//! A character class of up to 256 symbols is encoded as two 16-entry tables,
//! one indexed by the low nibble and one by the high nibble of each input byte.
//! A byte is a member when the AND of its two looked-up values is zero.
//!
//! Two block primitives are provided, both generic over [`VectorLane`]:
//!
//! - [`shufti_block`] flags every byte of one block that belongs to a class.
//! - [`shufti_double_block`] flags the second byte of every (class 1, class 2)
//!   pair, including a pair whose first byte ended the previous block. The
//!   first-byte vector of each block is returned as a [`PairCarry`] that the
//!   caller feeds into the next call.
//!
//! The slice drivers at the bottom of this file are monomorphized per backend
//! and wrapped in `#[target_feature]` entry points that `dispatch` selects.

// Some clippy lints are noisy for low-level SIMD code; we opt out at the module level.
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]

use log::trace;

use crate::constants::{LOW_NIBBLE_MASK, MAX_LANE_BYTES};
use crate::lane::{ScalarLane16, ScalarLane32, ScalarLane64, VectorLane};
use crate::types::{validate_tiled_table, NibbleMaskPair, Result};

#[cfg(target_arch = "x86_64")]
use crate::lane::{Avx2Lane, Ssse3Lane};

#[cfg(all(feature = "hwx-nightly", target_arch = "x86_64"))]
use crate::lane::Avx512Lane;

#[cfg(target_arch = "aarch64")]
use crate::lane::NeonLane;

// =============================================================================
// LANE-WIDE TABLES
// =============================================================================

/// A [`NibbleMaskPair`] tiled across every 16-byte group of lane `L`.
#[derive(Debug, Clone, Copy)]
pub struct ShuftiMasks<L: VectorLane> {
    lo: L,
    hi: L,
}

impl<L: VectorLane> ShuftiMasks<L> {
    #[inline(always)]
    pub unsafe fn new(pair: &NibbleMaskPair) -> Self {
        Self {
            lo: L::tile(&pair.lo),
            hi: L::tile(&pair.hi),
        }
    }

    /// Loads already-tiled tables after validating them against `L::WIDTH`.
    pub unsafe fn from_tiled(lo: &[u8], hi: &[u8]) -> Result<Self> {
        validate_tiled_table(lo, L::WIDTH)?;
        validate_tiled_table(hi, L::WIDTH)?;
        Ok(Self {
            lo: L::load(lo.as_ptr()),
            hi: L::load(hi.as_ptr()),
        })
    }

    #[inline]
    pub fn lo(&self) -> L {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> L {
        self.hi
    }
}

// =============================================================================
// SINGLE CLASS
// =============================================================================

/// Returns a lane that is 0xff at every byte of `chars` belonging to the class
/// and 0x00 elsewhere.
#[inline(always)]
pub unsafe fn shufti_block<L: VectorLane>(masks: &ShuftiMasks<L>, chars: L) -> L {
    let low4bits = L::splat(LOW_NIBBLE_MASK);

    let c_lo = masks.lo.lookup(chars.and(low4bits));
    let c_hi = masks.hi.lookup(chars.shr64_4().and(low4bits));

    c_lo.and(c_hi).cmpeq(L::zeroes())
}

// =============================================================================
// DOUBLE CLASS
// =============================================================================

/// First-byte candidates of the previous block of a stream.
///
/// Start every independent stream from [`PairCarry::neutral`].
#[derive(Debug, Clone, Copy)]
pub struct PairCarry<L: VectorLane>(L);

impl<L: VectorLane> PairCarry<L> {
    /// No first-byte candidate; lane 0 of the next result cannot match.
    #[inline(always)]
    pub unsafe fn neutral() -> Self {
        PairCarry(L::zeroes())
    }

    #[inline]
    pub fn lane(&self) -> L {
        self.0
    }
}

/// Flags lane i when `chars[i - 1]` is in class 1 and `chars[i]` is in class 2.
/// Lane 0 pairs with the last byte of the block that produced `carry`.
///
/// Returns the match lane and the carry for the next block of the same stream.
#[inline(always)]
pub unsafe fn shufti_double_block<L: VectorLane>(
    masks1: &ShuftiMasks<L>,
    masks2: &ShuftiMasks<L>,
    carry: PairCarry<L>,
    chars: L,
) -> (L, PairCarry<L>) {
    let c1 = shufti_block(masks1, chars);
    let c2 = shufti_block(masks2, chars);

    let offset_c1 = shift_in_carry(carry.0, c1);

    // both inputs are normalized to 0x00/0xff, so a pair is an all-ones byte
    let matched = offset_c1.and(c2).cmpeq(L::ones());

    (matched, PairCarry(c1))
}

// Shifts `c1` up by one byte and fills byte 0 from the last byte of `carry`.
// There is no portable cross-register byte shift with fill, so the two lanes
// go through a 2 * WIDTH stack buffer and are reloaded at offset WIDTH - 1.
#[inline(always)]
unsafe fn shift_in_carry<L: VectorLane>(carry: L, c1: L) -> L {
    debug_assert_eq!(std::mem::size_of::<L::Bytes>(), L::WIDTH);

    let zero = L::zeroes().to_bytes();
    let mut staging = [zero; 2];
    carry.store(staging[0].as_mut().as_mut_ptr());
    c1.store(staging[1].as_mut().as_mut_ptr());

    L::load(staging.as_ptr().cast::<u8>().add(L::WIDTH - 1))
}

// =============================================================================
// SCALAR PATHS
// =============================================================================

pub(crate) fn shufti_find_first_scalar(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| masks.contains(b))
}

pub(crate) fn shufti_find_last_scalar(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
    haystack.iter().rposition(|&b| masks.contains(b))
}

pub(crate) fn shufti_double_find_first_scalar(
    masks1: &NibbleMaskPair,
    masks2: &NibbleMaskPair,
    haystack: &[u8],
) -> Option<usize> {
    haystack
        .windows(2)
        .position(|w| masks1.contains(w[0]) && masks2.contains(w[1]))
}

// =============================================================================
// SLICE DRIVERS
// =============================================================================

// Loads fewer than WIDTH bytes into a zero-padded lane; the mask marks the
// lanes backed by real input.
#[inline(always)]
unsafe fn load_partial<L: VectorLane>(bytes: &[u8]) -> (L, u64) {
    debug_assert!(bytes.len() < L::WIDTH && L::WIDTH <= MAX_LANE_BYTES);
    let mut block = L::zeroes().to_bytes();
    block.as_mut()[..bytes.len()].copy_from_slice(bytes);
    (L::load(block.as_ref().as_ptr()), (1u64 << bytes.len()) - 1)
}

#[inline(always)]
unsafe fn find_first_impl<L: VectorLane>(pair: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
    let masks = ShuftiMasks::<L>::new(pair);
    let len = haystack.len();
    let ptr = haystack.as_ptr();

    let mut i = 0;
    while i + L::WIDTH <= len {
        let z = shufti_block(&masks, L::load(ptr.add(i))).movemask();
        if z != 0 {
            return Some(i + z.trailing_zeros() as usize);
        }
        i += L::WIDTH;
    }

    if i < len {
        let (chars, valid) = load_partial::<L>(&haystack[i..]);
        let z = shufti_block(&masks, chars).movemask() & valid;
        if z != 0 {
            return Some(i + z.trailing_zeros() as usize);
        }
    }
    None
}

#[inline(always)]
unsafe fn find_last_impl<L: VectorLane>(pair: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
    let masks = ShuftiMasks::<L>::new(pair);
    let ptr = haystack.as_ptr();

    let mut end = haystack.len();
    while end >= L::WIDTH {
        end -= L::WIDTH;
        let z = shufti_block(&masks, L::load(ptr.add(end))).movemask();
        if z != 0 {
            return Some(end + 63 - z.leading_zeros() as usize);
        }
    }

    if end > 0 {
        let (chars, valid) = load_partial::<L>(&haystack[..end]);
        let z = shufti_block(&masks, chars).movemask() & valid;
        if z != 0 {
            return Some(63 - z.leading_zeros() as usize);
        }
    }
    None
}

// Returns the index of the first byte of the first pair.
#[inline(always)]
unsafe fn double_find_first_impl<L: VectorLane>(
    pair1: &NibbleMaskPair,
    pair2: &NibbleMaskPair,
    haystack: &[u8],
) -> Option<usize> {
    let masks1 = ShuftiMasks::<L>::new(pair1);
    let masks2 = ShuftiMasks::<L>::new(pair2);
    let len = haystack.len();
    let ptr = haystack.as_ptr();

    let mut carry = PairCarry::<L>::neutral();
    let mut i = 0;
    while i + L::WIDTH <= len {
        let (matched, next) = shufti_double_block(&masks1, &masks2, carry, L::load(ptr.add(i)));
        carry = next;
        let z = matched.movemask();
        if z != 0 {
            // a neutral carry keeps lane 0 of the first block clear, so i > 0 here
            return Some(i + z.trailing_zeros() as usize - 1);
        }
        i += L::WIDTH;
    }

    if i < len {
        let (chars, valid) = load_partial::<L>(&haystack[i..]);
        let (matched, _) = shufti_double_block(&masks1, &masks2, carry, chars);
        let z = matched.movemask() & valid;
        if z != 0 {
            return Some(i + z.trailing_zeros() as usize - 1);
        }
    }
    None
}

macro_rules! lane_entry_points {
    ($lane:ty, $first:ident, $last:ident, $pair:ident) => {
        #[inline]
        pub(crate) unsafe fn $first(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
            trace!("{}: len={}", stringify!($first), haystack.len());
            find_first_impl::<$lane>(masks, haystack)
        }

        #[inline]
        pub(crate) unsafe fn $last(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
            trace!("{}: len={}", stringify!($last), haystack.len());
            find_last_impl::<$lane>(masks, haystack)
        }

        #[inline]
        pub(crate) unsafe fn $pair(
            masks1: &NibbleMaskPair,
            masks2: &NibbleMaskPair,
            haystack: &[u8],
        ) -> Option<usize> {
            trace!("{}: len={}", stringify!($pair), haystack.len());
            double_find_first_impl::<$lane>(masks1, masks2, haystack)
        }
    };
    ($lane:ty, $feature:literal, $first:ident, $last:ident, $pair:ident) => {
        #[target_feature(enable = $feature)]
        pub(crate) unsafe fn $first(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
            trace!("{}: len={}", stringify!($first), haystack.len());
            find_first_impl::<$lane>(masks, haystack)
        }

        #[target_feature(enable = $feature)]
        pub(crate) unsafe fn $last(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
            trace!("{}: len={}", stringify!($last), haystack.len());
            find_last_impl::<$lane>(masks, haystack)
        }

        #[target_feature(enable = $feature)]
        pub(crate) unsafe fn $pair(
            masks1: &NibbleMaskPair,
            masks2: &NibbleMaskPair,
            haystack: &[u8],
        ) -> Option<usize> {
            trace!("{}: len={}", stringify!($pair), haystack.len());
            double_find_first_impl::<$lane>(masks1, masks2, haystack)
        }
    };
}

lane_entry_points!(
    ScalarLane16,
    shufti_find_first_portable16,
    shufti_find_last_portable16,
    shufti_double_find_first_portable16
);
lane_entry_points!(
    ScalarLane32,
    shufti_find_first_portable32,
    shufti_find_last_portable32,
    shufti_double_find_first_portable32
);
lane_entry_points!(
    ScalarLane64,
    shufti_find_first_portable64,
    shufti_find_last_portable64,
    shufti_double_find_first_portable64
);

#[cfg(target_arch = "x86_64")]
lane_entry_points!(
    Ssse3Lane,
    "ssse3",
    shufti_find_first_ssse3,
    shufti_find_last_ssse3,
    shufti_double_find_first_ssse3
);

#[cfg(target_arch = "x86_64")]
lane_entry_points!(
    Avx2Lane,
    "avx2",
    shufti_find_first_avx2,
    shufti_find_last_avx2,
    shufti_double_find_first_avx2
);

#[cfg(all(feature = "hwx-nightly", target_arch = "x86_64"))]
lane_entry_points!(
    Avx512Lane,
    "avx512f,avx512bw",
    shufti_find_first_avx512,
    shufti_find_last_avx512,
    shufti_double_find_first_avx512
);

#[cfg(target_arch = "aarch64")]
lane_entry_points!(
    NeonLane,
    "neon",
    shufti_find_first_neon,
    shufti_find_last_neon,
    shufti_double_find_first_neon
);
