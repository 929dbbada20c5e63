// SPDX-License-Identifier: Apache-2.0

//! # Shufti dispatch framework
//!
//! This module owns the platform capability gate and the backend factory:
//!
//! - [`check_capability`] is the one-shot query a host calls before enabling any
//!   accelerated path. It returns `ShuftiError::ArchError` when the vector
//!   extension the build relies on is missing.
//! - [`Backend::select`] picks the widest lane backend the CPU supports, once.
//!   Block loops are monomorphized per backend, so the per-block hot path never
//!   branches on lane width.
//! - The `shufti_*find*` functions are slice-level scans that use the scalar
//!   path for short inputs and the selected backend otherwise.

use std::sync::OnceLock;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::constants::*;

use crate::shufti;
use crate::types::{LaneWidth, NibbleMaskPair, Result, ShuftiError};

#[cfg(target_arch = "aarch64")]
use std::arch::is_aarch64_feature_detected;

// =============================================================================
//  HARDWARE DETECTION & SIMD CAPABILITIES
// =============================================================================

/// Hardware capability detection used by the shufti dispatch layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HardwareCapabilities {
    pub has_ssse3: bool,
    pub has_sse42: bool,
    pub has_avx2: bool,
    pub has_avx512bw: bool,
    pub has_neon: bool,
}

impl HardwareCapabilities {
    /// Probes the running CPU. Prefer [`get_hw_capabilities`], which caches.
    #[inline]
    pub fn detect() -> Self {
        HardwareCapabilities {
            has_ssse3: Self::detect_x86("ssse3"),
            has_sse42: Self::detect_x86("sse4.2"),
            has_avx2: Self::detect_x86("avx2"),
            has_avx512bw: Self::detect_avx512bw(),
            has_neon: Self::detect_neon(),
        }
    }

    fn detect_x86(feature: &str) -> bool {
        #[cfg(target_arch = "x86_64")]
        let detected = match feature {
            "ssse3" => is_x86_feature_detected!("ssse3"),
            "sse4.2" => is_x86_feature_detected!("sse4.2"),
            "avx2" => is_x86_feature_detected!("avx2"),
            _ => false,
        };
        #[cfg(not(target_arch = "x86_64"))]
        let detected = {
            let _ = feature;
            false
        };

        detected
    }

    fn detect_avx512bw() -> bool {
        #[allow(unused_mut)]
        let mut detected_avx512 = false;

        #[cfg(all(target_arch = "x86_64", feature = "hwx-nightly"))]
        if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw") {
            detected_avx512 = true;
        }

        detected_avx512
    }

    fn detect_neon() -> bool {
        #[allow(unused_mut)]
        let mut detected_neon = false;

        #[cfg(target_arch = "aarch64")]
        if is_aarch64_feature_detected!("neon") {
            detected_neon = true;
        }

        detected_neon
    }
}

static HW_CAPABILITIES: OnceLock<HardwareCapabilities> = OnceLock::new();

/// Get information about available SIMD capabilities, probed once per process.
#[inline]
pub fn get_hw_capabilities() -> HardwareCapabilities {
    *HW_CAPABILITIES.get_or_init(|| {
        let caps = HardwareCapabilities::detect();
        debug!("shufti hardware capabilities: {:?}", caps);
        caps
    })
}

/// Check if a specific SIMD instruction set is available
#[inline]
pub fn has_hw_support(instruction_set: &str) -> bool {
    let caps = get_hw_capabilities();
    match instruction_set {
        "ssse3" => caps.has_ssse3,
        "sse4.2" | "sse42" => caps.has_sse42,
        "avx2" => caps.has_avx2,
        "avx512" | "avx512bw" => caps.has_avx512bw,
        "neon" => caps.has_neon,
        _ => false,
    }
}

// =============================================================================
//  PLATFORM CAPABILITY GATE
// =============================================================================

/// Verifies that this build's accelerated path may run on the current CPU.
///
/// Call once during engine setup. On `Err(ShuftiError::ArchError)` the host must
/// fall back to a non-accelerated path (see [`Backend::fallback`]) or abort
/// setup; matchers themselves never re-check.
///
/// - x86_64 builds require SSE4.2 (and with it the SSSE3 byte shuffle).
/// - aarch64 builds require NEON.
/// - `disable-hwx` builds and other architectures run the portable lanes and
///   always succeed.
#[inline]
pub fn check_capability() -> Result<()> {
    check_capability_with(&get_hw_capabilities())
}

/// [`check_capability`] against an explicit capability set.
pub fn check_capability_with(caps: &HardwareCapabilities) -> Result<()> {
    if cfg!(feature = "disable-hwx") {
        return Ok(());
    }

    let (required, present) = if cfg!(target_arch = "x86_64") {
        ("sse4.2", caps.has_sse42 && caps.has_ssse3)
    } else if cfg!(target_arch = "aarch64") {
        ("neon", caps.has_neon)
    } else {
        return Ok(());
    };

    if present {
        Ok(())
    } else {
        warn!("shufti capability check failed: {} not available", required);
        Err(ShuftiError::ArchError(format!(
            "required vector extension {} is not available on this CPU",
            required
        )))
    }
}

// =============================================================================
//  BACKEND FACTORY
// =============================================================================

/// One monomorphic lane implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    Portable16,
    Portable32,
    Portable64,
    Ssse3,
    Avx2,
    Avx512,
    Neon,
}

impl Backend {
    pub const ALL: [Backend; 7] = [
        Backend::Portable16,
        Backend::Portable32,
        Backend::Portable64,
        Backend::Ssse3,
        Backend::Avx2,
        Backend::Avx512,
        Backend::Neon,
    ];

    /// Capability-checked factory: passes the platform gate, then picks the
    /// widest backend the CPU supports.
    pub fn select(caps: &HardwareCapabilities) -> Result<Backend> {
        check_capability_with(caps)?;

        let widest = [Backend::Avx512, Backend::Avx2, Backend::Ssse3, Backend::Neon]
            .into_iter()
            .find(|backend| backend.is_available(caps))
            .unwrap_or(Backend::Portable16);

        trace!("BACKEND SELECT: {:?} from {:?}", widest, caps);
        Ok(widest)
    }

    /// The non-accelerated path a host uses after an `ArchError`.
    #[inline]
    pub const fn fallback() -> Backend {
        Backend::Portable16
    }

    /// Parses a backend name as it would appear in host configuration.
    pub fn from_name(name: &str) -> Result<Backend> {
        Backend::ALL
            .into_iter()
            .find(|backend| backend.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ShuftiError::Unsupported(format!("unknown shufti backend: {}", name)))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Backend::Portable16 => "portable16",
            Backend::Portable32 => "portable32",
            Backend::Portable64 => "portable64",
            Backend::Ssse3 => "ssse3",
            Backend::Avx2 => "avx2",
            Backend::Avx512 => "avx512",
            Backend::Neon => "neon",
        }
    }

    pub const fn lane_width(self) -> LaneWidth {
        match self {
            Backend::Portable16 | Backend::Ssse3 | Backend::Neon => LaneWidth::W16,
            Backend::Portable32 | Backend::Avx2 => LaneWidth::W32,
            Backend::Portable64 | Backend::Avx512 => LaneWidth::W64,
        }
    }

    /// Whether this build contains the backend and `caps` allows running it.
    pub fn is_available(self, caps: &HardwareCapabilities) -> bool {
        match self {
            Backend::Portable16 | Backend::Portable32 | Backend::Portable64 => true,
            _ if cfg!(feature = "disable-hwx") => false,
            Backend::Ssse3 => cfg!(target_arch = "x86_64") && caps.has_ssse3,
            Backend::Avx2 => cfg!(target_arch = "x86_64") && caps.has_avx2,
            Backend::Avx512 => {
                cfg!(all(target_arch = "x86_64", feature = "hwx-nightly")) && caps.has_avx512bw
            }
            Backend::Neon => cfg!(target_arch = "aarch64") && caps.has_neon,
        }
    }

    fn ensure_available(self) -> Result<()> {
        if self.is_available(&get_hw_capabilities()) {
            Ok(())
        } else {
            Err(ShuftiError::Unsupported(format!(
                "shufti backend {} is not available in this build or on this CPU",
                self.name()
            )))
        }
    }

    /// Index of the first byte of `haystack` in the class.
    ///
    /// The scan methods re-check availability so a hand-built `Backend` cannot
    /// run unsupported instructions. `shufti_block` and `shufti_double_block`
    /// are the unchecked per-block hot path.
    pub fn find_first(self, masks: &NibbleMaskPair, haystack: &[u8]) -> Result<Option<usize>> {
        self.ensure_available()?;
        // SAFETY: ensure_available verified the backend's CPU features.
        let found = unsafe {
            match self {
                Backend::Portable16 => shufti::shufti_find_first_portable16(masks, haystack),
                Backend::Portable32 => shufti::shufti_find_first_portable32(masks, haystack),
                Backend::Portable64 => shufti::shufti_find_first_portable64(masks, haystack),
                #[cfg(target_arch = "x86_64")]
                Backend::Ssse3 => shufti::shufti_find_first_ssse3(masks, haystack),
                #[cfg(target_arch = "x86_64")]
                Backend::Avx2 => shufti::shufti_find_first_avx2(masks, haystack),
                #[cfg(all(target_arch = "x86_64", feature = "hwx-nightly"))]
                Backend::Avx512 => shufti::shufti_find_first_avx512(masks, haystack),
                #[cfg(target_arch = "aarch64")]
                Backend::Neon => shufti::shufti_find_first_neon(masks, haystack),
                #[allow(unreachable_patterns)]
                _ => unreachable!("unavailable backend {:?} passed availability check", self),
            }
        };
        Ok(found)
    }

    /// Index of the last byte of `haystack` in the class.
    pub fn find_last(self, masks: &NibbleMaskPair, haystack: &[u8]) -> Result<Option<usize>> {
        self.ensure_available()?;
        // SAFETY: ensure_available verified the backend's CPU features.
        let found = unsafe {
            match self {
                Backend::Portable16 => shufti::shufti_find_last_portable16(masks, haystack),
                Backend::Portable32 => shufti::shufti_find_last_portable32(masks, haystack),
                Backend::Portable64 => shufti::shufti_find_last_portable64(masks, haystack),
                #[cfg(target_arch = "x86_64")]
                Backend::Ssse3 => shufti::shufti_find_last_ssse3(masks, haystack),
                #[cfg(target_arch = "x86_64")]
                Backend::Avx2 => shufti::shufti_find_last_avx2(masks, haystack),
                #[cfg(all(target_arch = "x86_64", feature = "hwx-nightly"))]
                Backend::Avx512 => shufti::shufti_find_last_avx512(masks, haystack),
                #[cfg(target_arch = "aarch64")]
                Backend::Neon => shufti::shufti_find_last_neon(masks, haystack),
                #[allow(unreachable_patterns)]
                _ => unreachable!("unavailable backend {:?} passed availability check", self),
            }
        };
        Ok(found)
    }

    /// Index of the first byte of the first (class 1, class 2) pair.
    pub fn double_find_first(
        self,
        masks1: &NibbleMaskPair,
        masks2: &NibbleMaskPair,
        haystack: &[u8],
    ) -> Result<Option<usize>> {
        self.ensure_available()?;
        // SAFETY: ensure_available verified the backend's CPU features.
        let found = unsafe {
            match self {
                Backend::Portable16 => {
                    shufti::shufti_double_find_first_portable16(masks1, masks2, haystack)
                }
                Backend::Portable32 => {
                    shufti::shufti_double_find_first_portable32(masks1, masks2, haystack)
                }
                Backend::Portable64 => {
                    shufti::shufti_double_find_first_portable64(masks1, masks2, haystack)
                }
                #[cfg(target_arch = "x86_64")]
                Backend::Ssse3 => shufti::shufti_double_find_first_ssse3(masks1, masks2, haystack),
                #[cfg(target_arch = "x86_64")]
                Backend::Avx2 => shufti::shufti_double_find_first_avx2(masks1, masks2, haystack),
                #[cfg(all(target_arch = "x86_64", feature = "hwx-nightly"))]
                Backend::Avx512 => {
                    shufti::shufti_double_find_first_avx512(masks1, masks2, haystack)
                }
                #[cfg(target_arch = "aarch64")]
                Backend::Neon => shufti::shufti_double_find_first_neon(masks1, masks2, haystack),
                #[allow(unreachable_patterns)]
                _ => unreachable!("unavailable backend {:?} passed availability check", self),
            }
        };
        Ok(found)
    }
}

static ACTIVE_BACKEND: OnceLock<Backend> = OnceLock::new();

/// The backend the slice scans use: [`Backend::select`] on the detected CPU,
/// or [`Backend::fallback`] when the capability gate fails.
pub fn active_backend() -> Backend {
    *ACTIVE_BACKEND.get_or_init(|| {
        Backend::select(&get_hw_capabilities()).unwrap_or_else(|err| {
            warn!("shufti falling back to {:?}: {}", Backend::fallback(), err);
            Backend::fallback()
        })
    })
}

// =============================================================================
//  SLICE SCANS
// =============================================================================

/// Find the first byte of `haystack` that belongs to the class.
///
/// # Examples
/// ```rust
/// use hwx_shufti::{shufti_find_first, shufti_find_last, NibbleMaskPair};
///
/// // Tables for the class {'a'}: every other byte hits an overlapping bit.
/// let mut lo = [0b11u8; 16];
/// lo[0x1] = 0b01;
/// let mut hi = [0b01u8; 16];
/// hi[0x6] = 0b10;
/// let masks = NibbleMaskPair::new(lo, hi);
///
/// let haystack = [b"zzzzzzzzzzzzzzzzzzz".as_slice(), b"a-a"].concat();
/// assert_eq!(shufti_find_first(&masks, &haystack), Some(19));
/// assert_eq!(shufti_find_last(&masks, &haystack), Some(21));
/// assert_eq!(shufti_find_first(&masks, b"no hit here"), None);
/// ```
///
/// # Performance
/// - Small inputs (< SIMD_THRESHOLD_SHUFTI): scalar table lookups
/// - Larger inputs: one monomorphic SIMD loop on the active backend
#[inline]
pub fn shufti_find_first(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
    trace!("SHUFTI_FIND_FIRST DISPATCH: len={}", haystack.len());
    if haystack.len() < SIMD_THRESHOLD_SHUFTI {
        return shufti::shufti_find_first_scalar(masks, haystack);
    }
    active_backend()
        .find_first(masks, haystack)
        .unwrap_or_else(|_| shufti::shufti_find_first_scalar(masks, haystack))
}

/// Find the last byte of `haystack` that belongs to the class.
#[inline]
pub fn shufti_find_last(masks: &NibbleMaskPair, haystack: &[u8]) -> Option<usize> {
    trace!("SHUFTI_FIND_LAST DISPATCH: len={}", haystack.len());
    if haystack.len() < SIMD_THRESHOLD_SHUFTI {
        return shufti::shufti_find_last_scalar(masks, haystack);
    }
    active_backend()
        .find_last(masks, haystack)
        .unwrap_or_else(|_| shufti::shufti_find_last_scalar(masks, haystack))
}

/// Find the first position `i` with `haystack[i]` in class 1 and
/// `haystack[i + 1]` in class 2.
#[inline]
pub fn shufti_double_find_first(
    masks1: &NibbleMaskPair,
    masks2: &NibbleMaskPair,
    haystack: &[u8],
) -> Option<usize> {
    trace!("SHUFTI_DOUBLE_FIND_FIRST DISPATCH: len={}", haystack.len());
    if haystack.len() < SIMD_THRESHOLD_SHUFTI_DOUBLE {
        return shufti::shufti_double_find_first_scalar(masks1, masks2, haystack);
    }
    active_backend()
        .double_find_first(masks1, masks2, haystack)
        .unwrap_or_else(|_| shufti::shufti_double_find_first_scalar(masks1, masks2, haystack))
}
