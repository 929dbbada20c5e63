// SPDX-License-Identifier: Apache-2.0

//! Vector lane adapters
//!
//! `VectorLane` is the thin register abstraction the shufti matchers are written
//! against. Each implementation wraps one fixed-width register type:
//!
//! | Lane            | Width | Requires                          |
//! |-----------------|-------|-----------------------------------|
//! | `ScalarLane<N>` | N     | nothing (portable fallback)       |
//! | `Ssse3Lane`     | 16    | SSSE3 (x86_64)                    |
//! | `Avx2Lane`      | 32    | AVX2 (x86_64)                     |
//! | `Avx512Lane`    | 64    | AVX-512BW (x86_64, `hwx-nightly`) |
//! | `NeonLane`      | 16    | NEON (aarch64)                    |
//!
//! Every method is `unsafe`: calling a hardware lane's methods on a CPU without
//! its extension is undefined behavior. Callers verify the extension once (see
//! `dispatch::check_capability`) and never again on the hot path.
//!
//! The 16-entry table lookup is confined to 16-byte groups on every backend,
//! matching the per-128-bit-lane behavior of `pshufb` on AVX2 and AVX-512.

// Some clippy lints are noisy for low-level SIMD code; we opt out at the module level.
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]

use std::fmt;

use crate::constants::{LOW_NIBBLE_MASK, NIBBLE_TABLE_LEN};

#[cfg(target_arch = "x86_64")]
use crate::constants::{LANES_AVX2_BYTES, LANES_SSSE3_BYTES};

#[cfg(all(feature = "hwx-nightly", target_arch = "x86_64"))]
use crate::constants::LANES_AVX512_BYTES;

#[cfg(target_arch = "aarch64")]
use crate::constants::LANES_NEON_BYTES;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{
    __m128i, __m256i, _mm256_and_si256, _mm256_andnot_si256, _mm256_broadcastsi128_si256,
    _mm256_cmpeq_epi8, _mm256_loadu_si256, _mm256_movemask_epi8, _mm256_or_si256,
    _mm256_set1_epi8, _mm256_shuffle_epi8, _mm256_srli_epi64, _mm256_storeu_si256,
    _mm_and_si128, _mm_andnot_si128, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8,
    _mm_or_si128, _mm_set1_epi8, _mm_shuffle_epi8, _mm_srli_epi64, _mm_storeu_si128,
};

// AVX-512 intrinsics (nightly feature only)
#[cfg(all(feature = "hwx-nightly", target_arch = "x86_64"))]
use std::arch::x86_64::{
    __m512i, _mm512_and_si512, _mm512_andnot_si512, _mm512_broadcast_i32x4,
    _mm512_cmpeq_epi8_mask, _mm512_loadu_si512, _mm512_movepi8_mask, _mm512_movm_epi8,
    _mm512_or_si512, _mm512_set1_epi8, _mm512_shuffle_epi8, _mm512_srli_epi64,
    _mm512_storeu_si512,
};

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::{
    uint8x16_t, vandq_u8, vbicq_u8, vceqq_u8, vdupq_n_u8, vld1q_u8, vorrq_u8, vqtbl1q_u8,
    vreinterpretq_u64_u8, vreinterpretq_u8_u64, vshrq_n_u64, vst1q_u8,
};

/// A fixed-width byte register.
///
/// `Bytes` must be `[u8; WIDTH]`; the double-class matcher relies on two
/// adjacent `Bytes` values forming one contiguous `2 * WIDTH` buffer.
pub trait VectorLane: Copy + fmt::Debug {
    const WIDTH: usize;

    type Bytes: Copy + AsRef<[u8]> + AsMut<[u8]>;

    /// Unaligned load of `WIDTH` bytes.
    unsafe fn load(ptr: *const u8) -> Self;

    /// Unaligned store of `WIDTH` bytes.
    unsafe fn store(self, ptr: *mut u8);

    unsafe fn splat(byte: u8) -> Self;

    #[inline(always)]
    unsafe fn zeroes() -> Self {
        Self::splat(0)
    }

    #[inline(always)]
    unsafe fn ones() -> Self {
        Self::splat(0xff)
    }

    /// Replicates a 16-entry table into every 16-byte group.
    unsafe fn tile(table: &[u8; NIBBLE_TABLE_LEN]) -> Self;

    unsafe fn and(self, other: Self) -> Self;

    unsafe fn or(self, other: Self) -> Self;

    /// `!self & other`
    unsafe fn andnot(self, other: Self) -> Self;

    /// Per-byte equality; 0xff where equal, 0x00 elsewhere.
    unsafe fn cmpeq(self, other: Self) -> Self;

    /// Right shift by 4 bits within each 64-bit sub-lane.
    unsafe fn shr64_4(self) -> Self;

    /// `pshufb`-style lookup: treats `self` as tiled 16-entry tables and
    /// `indices` as per-byte indices into the table of the same 16-byte group.
    /// Indices with the high bit set yield zero.
    unsafe fn lookup(self, indices: Self) -> Self;

    /// Bit i is the high bit of byte i.
    unsafe fn movemask(self) -> u64;

    unsafe fn to_bytes(self) -> Self::Bytes;
}

// =============================================================================
// PORTABLE BACKEND
// =============================================================================

/// Plain byte-array lane; the scalar 16-way lookup stands in for `pshufb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarLane<const N: usize>(pub [u8; N]);

pub type ScalarLane16 = ScalarLane<16>;
pub type ScalarLane32 = ScalarLane<32>;
pub type ScalarLane64 = ScalarLane<64>;

impl<const N: usize> ScalarLane<N> {
    #[inline(always)]
    fn map2(self, other: Self, f: impl Fn(u8, u8) -> u8) -> Self {
        let mut out = [0u8; N];
        for i in 0..N {
            out[i] = f(self.0[i], other.0[i]);
        }
        ScalarLane(out)
    }
}

impl<const N: usize> VectorLane for ScalarLane<N> {
    const WIDTH: usize = N;

    type Bytes = [u8; N];

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        ScalarLane(std::ptr::read_unaligned(ptr.cast::<[u8; N]>()))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        std::ptr::write_unaligned(ptr.cast::<[u8; N]>(), self.0);
    }

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        ScalarLane([byte; N])
    }

    #[inline(always)]
    unsafe fn tile(table: &[u8; NIBBLE_TABLE_LEN]) -> Self {
        debug_assert_eq!(N % NIBBLE_TABLE_LEN, 0);
        let mut out = [0u8; N];
        for (i, b) in out.iter_mut().enumerate() {
            *b = table[i % NIBBLE_TABLE_LEN];
        }
        ScalarLane(out)
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        self.map2(other, |a, b| a & b)
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        self.map2(other, |a, b| a | b)
    }

    #[inline(always)]
    unsafe fn andnot(self, other: Self) -> Self {
        self.map2(other, |a, b| !a & b)
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        self.map2(other, |a, b| if a == b { 0xff } else { 0x00 })
    }

    #[inline(always)]
    unsafe fn shr64_4(self) -> Self {
        let mut out = self.0;
        for word in out.chunks_exact_mut(8) {
            let mut le = [0u8; 8];
            le.copy_from_slice(word);
            let shifted = u64::from_le_bytes(le) >> 4;
            word.copy_from_slice(&shifted.to_le_bytes());
        }
        ScalarLane(out)
    }

    #[inline(always)]
    unsafe fn lookup(self, indices: Self) -> Self {
        let mut out = [0u8; N];
        for i in 0..N {
            let idx = indices.0[i];
            if idx & 0x80 == 0 {
                let group = i - i % NIBBLE_TABLE_LEN;
                out[i] = self.0[group + (idx & LOW_NIBBLE_MASK) as usize];
            }
        }
        ScalarLane(out)
    }

    #[inline(always)]
    unsafe fn movemask(self) -> u64 {
        let mut mask = 0u64;
        for (i, &b) in self.0.iter().enumerate() {
            mask |= ((b >> 7) as u64) << i;
        }
        mask
    }

    #[inline(always)]
    unsafe fn to_bytes(self) -> Self::Bytes {
        self.0
    }
}

// =============================================================================
// x86_64 BACKENDS
// =============================================================================

#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy)]
pub struct Ssse3Lane(pub __m128i);

#[cfg(target_arch = "x86_64")]
impl VectorLane for Ssse3Lane {
    const WIDTH: usize = LANES_SSSE3_BYTES;

    type Bytes = [u8; 16];

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Ssse3Lane(_mm_loadu_si128(ptr.cast()))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        _mm_storeu_si128(ptr.cast(), self.0);
    }

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Ssse3Lane(_mm_set1_epi8(byte as i8))
    }

    #[inline(always)]
    unsafe fn tile(table: &[u8; NIBBLE_TABLE_LEN]) -> Self {
        Ssse3Lane(_mm_loadu_si128(table.as_ptr().cast()))
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        Ssse3Lane(_mm_and_si128(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        Ssse3Lane(_mm_or_si128(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn andnot(self, other: Self) -> Self {
        Ssse3Lane(_mm_andnot_si128(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        Ssse3Lane(_mm_cmpeq_epi8(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn shr64_4(self) -> Self {
        Ssse3Lane(_mm_srli_epi64::<4>(self.0))
    }

    #[inline(always)]
    unsafe fn lookup(self, indices: Self) -> Self {
        Ssse3Lane(_mm_shuffle_epi8(self.0, indices.0))
    }

    #[inline(always)]
    unsafe fn movemask(self) -> u64 {
        _mm_movemask_epi8(self.0) as u32 as u64
    }

    #[inline(always)]
    unsafe fn to_bytes(self) -> Self::Bytes {
        std::mem::transmute::<__m128i, [u8; 16]>(self.0)
    }
}

#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy)]
pub struct Avx2Lane(pub __m256i);

#[cfg(target_arch = "x86_64")]
impl VectorLane for Avx2Lane {
    const WIDTH: usize = LANES_AVX2_BYTES;

    type Bytes = [u8; 32];

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Avx2Lane(_mm256_loadu_si256(ptr.cast()))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        _mm256_storeu_si256(ptr.cast(), self.0);
    }

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Avx2Lane(_mm256_set1_epi8(byte as i8))
    }

    #[inline(always)]
    unsafe fn tile(table: &[u8; NIBBLE_TABLE_LEN]) -> Self {
        Avx2Lane(_mm256_broadcastsi128_si256(_mm_loadu_si128(
            table.as_ptr().cast(),
        )))
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        Avx2Lane(_mm256_and_si256(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        Avx2Lane(_mm256_or_si256(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn andnot(self, other: Self) -> Self {
        Avx2Lane(_mm256_andnot_si256(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        Avx2Lane(_mm256_cmpeq_epi8(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn shr64_4(self) -> Self {
        Avx2Lane(_mm256_srli_epi64::<4>(self.0))
    }

    #[inline(always)]
    unsafe fn lookup(self, indices: Self) -> Self {
        // vpshufb already works per 128-bit lane
        Avx2Lane(_mm256_shuffle_epi8(self.0, indices.0))
    }

    #[inline(always)]
    unsafe fn movemask(self) -> u64 {
        _mm256_movemask_epi8(self.0) as u32 as u64
    }

    #[inline(always)]
    unsafe fn to_bytes(self) -> Self::Bytes {
        std::mem::transmute::<__m256i, [u8; 32]>(self.0)
    }
}

#[cfg(all(feature = "hwx-nightly", target_arch = "x86_64"))]
#[derive(Debug, Clone, Copy)]
pub struct Avx512Lane(pub __m512i);

#[cfg(all(feature = "hwx-nightly", target_arch = "x86_64"))]
impl VectorLane for Avx512Lane {
    const WIDTH: usize = LANES_AVX512_BYTES;

    type Bytes = [u8; 64];

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Avx512Lane(_mm512_loadu_si512(ptr.cast()))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        _mm512_storeu_si512(ptr.cast(), self.0);
    }

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Avx512Lane(_mm512_set1_epi8(byte as i8))
    }

    #[inline(always)]
    unsafe fn tile(table: &[u8; NIBBLE_TABLE_LEN]) -> Self {
        Avx512Lane(_mm512_broadcast_i32x4(_mm_loadu_si128(table.as_ptr().cast())))
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        Avx512Lane(_mm512_and_si512(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        Avx512Lane(_mm512_or_si512(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn andnot(self, other: Self) -> Self {
        Avx512Lane(_mm512_andnot_si512(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        let mask = _mm512_cmpeq_epi8_mask(self.0, other.0);
        Avx512Lane(_mm512_movm_epi8(mask))
    }

    #[inline(always)]
    unsafe fn shr64_4(self) -> Self {
        Avx512Lane(_mm512_srli_epi64::<4>(self.0))
    }

    #[inline(always)]
    unsafe fn lookup(self, indices: Self) -> Self {
        Avx512Lane(_mm512_shuffle_epi8(self.0, indices.0))
    }

    #[inline(always)]
    unsafe fn movemask(self) -> u64 {
        _mm512_movepi8_mask(self.0)
    }

    #[inline(always)]
    unsafe fn to_bytes(self) -> Self::Bytes {
        std::mem::transmute::<__m512i, [u8; 64]>(self.0)
    }
}

// =============================================================================
// AARCH64 BACKEND
// =============================================================================

#[cfg(target_arch = "aarch64")]
#[derive(Debug, Clone, Copy)]
pub struct NeonLane(pub uint8x16_t);

#[cfg(target_arch = "aarch64")]
impl VectorLane for NeonLane {
    const WIDTH: usize = LANES_NEON_BYTES;

    type Bytes = [u8; 16];

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        NeonLane(vld1q_u8(ptr))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        vst1q_u8(ptr, self.0);
    }

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        NeonLane(vdupq_n_u8(byte))
    }

    #[inline(always)]
    unsafe fn tile(table: &[u8; NIBBLE_TABLE_LEN]) -> Self {
        NeonLane(vld1q_u8(table.as_ptr()))
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        NeonLane(vandq_u8(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        NeonLane(vorrq_u8(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn andnot(self, other: Self) -> Self {
        // vbic computes a & !b
        NeonLane(vbicq_u8(other.0, self.0))
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        NeonLane(vceqq_u8(self.0, other.0))
    }

    #[inline(always)]
    unsafe fn shr64_4(self) -> Self {
        NeonLane(vreinterpretq_u8_u64(vshrq_n_u64::<4>(vreinterpretq_u64_u8(
            self.0,
        ))))
    }

    #[inline(always)]
    unsafe fn lookup(self, indices: Self) -> Self {
        // tbl zeroes indices >= 16; keep bit 7 so it still zeroes like pshufb
        let translated = vandq_u8(indices.0, vdupq_n_u8(0x8f));
        NeonLane(vqtbl1q_u8(self.0, translated))
    }

    #[inline(always)]
    unsafe fn movemask(self) -> u64 {
        let bytes = self.to_bytes();
        let mut mask = 0u64;
        for (i, &b) in bytes.iter().enumerate() {
            mask |= ((b >> 7) as u64) << i;
        }
        mask
    }

    #[inline(always)]
    unsafe fn to_bytes(self) -> Self::Bytes {
        let mut out = [0u8; 16];
        vst1q_u8(out.as_mut_ptr(), self.0);
        out
    }
}
