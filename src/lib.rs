// SPDX-License-Identifier: Apache-2.0

//! hwx-shufti
//!
//! Hardware-accelerated byte-class matching for multi-pattern scanners.
//!
//! - Single-class test: which bytes of a block belong to a 256-symbol class
//! - Double-class test: which bytes complete a two-byte class/literal pair,
//!   including pairs that straddle the previous block
//! - A one-shot platform capability gate and a width-specialized backend factory
//!
//! Classes are encoded as two 16-entry nibble tables ([`NibbleMaskPair`]) built
//! by an external pattern compiler.
//!
//! ## Hardware support
//! - **SSSE3 / AVX2** on x86_64, **NEON** on aarch64, on stable Rust
//! - **AVX-512BW** behind the `hwx-nightly` feature
//! - A portable scalar lane backend everywhere; `disable-hwx` forces it
//!
//! ## Usage
//!
//! ```rust
//! use hwx_shufti::{check_capability, shufti_find_first, Backend, NibbleMaskPair};
//!
//! // Once, during engine setup
//! let backend = match check_capability() {
//!     Ok(()) => hwx_shufti::active_backend(),
//!     Err(_) => Backend::fallback(),
//! };
//! println!("scanning with {} ({} byte lanes)", backend.name(), backend.lane_width().bytes());
//!
//! // Class {'a'}
//! let mut lo = [0b11u8; 16];
//! lo[0x1] = 0b01;
//! let mut hi = [0b01u8; 16];
//! hi[0x6] = 0b10;
//! let masks = NibbleMaskPair::new(lo, hi);
//! assert_eq!(shufti_find_first(&masks, b"the quick brown fox jumps over a lazy dog"), Some(31));
//! ```

#![allow(clippy::missing_safety_doc)]

pub mod constants;
pub mod dispatch;
pub mod lane;
pub mod shufti;
pub mod types;

pub use dispatch::*;
pub use lane::VectorLane;
pub use shufti::{shufti_block, shufti_double_block, PairCarry, ShuftiMasks};
pub use types::*;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod dispatch_tests;
#[cfg(test)]
#[path = "tests/lane_tests.rs"]
mod lane_tests;
#[cfg(test)]
#[path = "tests/shufti_tests.rs"]
mod shufti_tests;
