// SPDX-License-Identifier: Apache-2.0

//! Test-only helpers.
//!
//! The real table compiler lives outside this crate; `build_class_masks` is a
//! minimal stand-in so tests can express classes as byte sets.

use crate::types::NibbleMaskPair;

pub type ByteClass = [bool; 256];

pub fn class_of(bytes: &[u8]) -> ByteClass {
    let mut class = [false; 256];
    for &b in bytes {
        class[b as usize] = true;
    }
    class
}

pub fn class_where(pred: impl Fn(u8) -> bool) -> ByteClass {
    let mut class = [false; 256];
    for b in 0..=255u8 {
        class[b as usize] = pred(b);
    }
    class
}

/// Builds tables where `lo[l] & hi[h] != 0` exactly for bytes outside `class`.
///
/// High nibbles that exclude the same set of low nibbles share one bit, so this
/// returns `None` when more than 8 distinct exclusion rows are needed.
pub fn build_class_masks(class: &ByteClass) -> Option<NibbleMaskPair> {
    let mut lo = [0u8; 16];
    let mut hi = [0u8; 16];
    let mut rows: Vec<u16> = Vec::new();

    for h in 0..16 {
        let mut excluded = 0u16;
        for l in 0..16 {
            if !class[(h << 4) | l] {
                excluded |= 1 << l;
            }
        }
        if excluded == 0 {
            continue;
        }
        let bit = match rows.iter().position(|&row| row == excluded) {
            Some(bit) => bit,
            None if rows.len() == 8 => return None,
            None => {
                rows.push(excluded);
                rows.len() - 1
            }
        };
        hi[h] |= 1 << bit;
    }

    for (bit, row) in rows.iter().enumerate() {
        for (l, entry) in lo.iter_mut().enumerate() {
            if row & (1 << l) != 0 {
                *entry |= 1 << bit;
            }
        }
    }

    Some(NibbleMaskPair::new(lo, hi))
}

pub fn masks_for(bytes: &[u8]) -> NibbleMaskPair {
    build_class_masks(&class_of(bytes)).expect("class needs more than 8 exclusion rows")
}

/// Deterministic pseudo-random bytes drawn from `alphabet`.
pub fn noise(len: usize, seed: u64, alphabet: &[u8]) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            alphabet[(state % alphabet.len() as u64) as usize]
        })
        .collect()
}

/// Runs a generic `fn check<L: VectorLane>()` on every lane type this build and
/// CPU can execute.
macro_rules! for_each_lane {
    ($check:ident) => {{
        $check::<$crate::lane::ScalarLane16>();
        $check::<$crate::lane::ScalarLane32>();
        $check::<$crate::lane::ScalarLane64>();

        #[allow(unused_variables)]
        let caps = $crate::dispatch::get_hw_capabilities();

        #[cfg(target_arch = "x86_64")]
        {
            if caps.has_ssse3 {
                $check::<$crate::lane::Ssse3Lane>();
            }
            if caps.has_avx2 {
                $check::<$crate::lane::Avx2Lane>();
            }
            #[cfg(feature = "hwx-nightly")]
            if caps.has_avx512bw {
                $check::<$crate::lane::Avx512Lane>();
            }
        }

        #[cfg(target_arch = "aarch64")]
        if caps.has_neon {
            $check::<$crate::lane::NeonLane>();
        }
    }};
}

pub(crate) use for_each_lane;
