// SPDX-License-Identifier: Apache-2.0

//! Common constants used across implementations
//!
//! This module centralizes lane widths, table sizes and dispatch thresholds used
//! by the scalar and SIMD shufti paths.

// =============================================================================
// NIBBLE TABLES
// =============================================================================

/// Entries in one nibble lookup table; also the span of one lookup group.
pub const NIBBLE_TABLE_LEN: usize = 16;

pub const LOW_NIBBLE_MASK: u8 = 0x0f;

// =============================================================================
// SIMD Lane Widths by Architecture
// =============================================================================

pub const LANES_PORTABLE_BYTES: usize = 16;

// Widest lane any backend can produce; bounds movemask results to a u64.
pub const MAX_LANE_BYTES: usize = 64;

#[cfg(target_arch = "x86_64")]
pub use x86_constants::*;
#[cfg(target_arch = "x86_64")]
mod x86_constants {
    pub const LANES_SSSE3_BYTES: usize = 16; // 128/8
    pub const LANES_AVX2_BYTES: usize = 32; // 256/8
    pub const LANES_AVX512_BYTES: usize = 64; // 512/8
}

#[cfg(target_arch = "aarch64")]
pub use neon_constants::*;
#[cfg(target_arch = "aarch64")]
mod neon_constants {
    pub const LANES_NEON_BYTES: usize = 16; // 128/8
}

// =============================================================================
// SIMD Dispatch Thresholds
// =============================================================================

// When disable-hwx is enabled every scan driver stays on the scalar loop.
#[cfg(feature = "disable-hwx")]
mod thresholds {
    pub const SIMD_THRESHOLD_SHUFTI: usize = usize::MAX;
    pub const SIMD_THRESHOLD_SHUFTI_DOUBLE: usize = usize::MAX;
}

#[cfg(not(feature = "disable-hwx"))]
mod thresholds {
    // Below one 128-bit lane the scalar loop wins.
    pub const SIMD_THRESHOLD_SHUFTI: usize = 16;
    pub const SIMD_THRESHOLD_SHUFTI_DOUBLE: usize = 16;
}

pub use thresholds::*;
