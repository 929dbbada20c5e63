// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// CAPABILITY GATE, BACKEND FACTORY AND SLICE SCAN TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::constants::{LANES_PORTABLE_BYTES, SIMD_THRESHOLD_SHUFTI};
    use crate::dispatch::*;
    use crate::shufti::{
        shufti_double_find_first_scalar, shufti_find_first_scalar, shufti_find_last_scalar,
    };
    use crate::test_utils::{build_class_masks, class_of, class_where, masks_for, noise};
    use crate::types::{validate_tiled_table, LaneWidth, NibbleMaskPair, ShuftiError};

    fn all_caps() -> HardwareCapabilities {
        HardwareCapabilities {
            has_ssse3: true,
            has_sse42: true,
            has_avx2: true,
            has_avx512bw: true,
            has_neon: true,
        }
    }

    fn available_backends() -> Vec<Backend> {
        let caps = get_hw_capabilities();
        Backend::ALL
            .into_iter()
            .filter(|backend| backend.is_available(&caps))
            .collect()
    }

    // =============================================================================
    // PLATFORM CAPABILITY GATE
    // =============================================================================

    #[test]
    fn test_capability_gate_without_extensions() {
        let result = check_capability_with(&HardwareCapabilities::default());

        if cfg!(feature = "disable-hwx")
            || !(cfg!(target_arch = "x86_64") || cfg!(target_arch = "aarch64"))
        {
            assert_eq!(result, Ok(()));
        } else {
            assert!(matches!(result, Err(ShuftiError::ArchError(_))));
        }
    }

    #[test]
    fn test_capability_gate_with_required_extension() {
        let caps = if cfg!(target_arch = "aarch64") {
            HardwareCapabilities {
                has_neon: true,
                ..Default::default()
            }
        } else {
            HardwareCapabilities {
                has_ssse3: true,
                has_sse42: true,
                ..Default::default()
            }
        };
        assert_eq!(check_capability_with(&caps), Ok(()));
        assert_eq!(check_capability_with(&all_caps()), Ok(()));
    }

    #[cfg(all(target_arch = "x86_64", not(feature = "disable-hwx")))]
    #[test]
    fn test_capability_gate_x86_needs_sse42_not_just_ssse3() {
        let caps = HardwareCapabilities {
            has_ssse3: true,
            has_avx2: true,
            ..Default::default()
        };
        let err = check_capability_with(&caps).unwrap_err();
        assert!(err.to_string().contains("sse4.2"), "{}", err);
    }

    #[test]
    fn test_capability_gate_matches_detected_caps() {
        let caps = get_hw_capabilities();
        assert_eq!(check_capability(), check_capability_with(&caps));
        // cached probe is stable
        assert_eq!(get_hw_capabilities(), caps);
    }

    #[test]
    fn test_has_hw_support_names() {
        let caps = get_hw_capabilities();
        assert_eq!(has_hw_support("ssse3"), caps.has_ssse3);
        assert_eq!(has_hw_support("sse42"), caps.has_sse42);
        assert_eq!(has_hw_support("sse4.2"), caps.has_sse42);
        assert_eq!(has_hw_support("avx2"), caps.has_avx2);
        assert_eq!(has_hw_support("avx512bw"), caps.has_avx512bw);
        assert_eq!(has_hw_support("neon"), caps.has_neon);
        assert!(!has_hw_support("altivec"));
    }

    // =============================================================================
    // BACKEND FACTORY
    // =============================================================================

    #[test]
    fn test_select_picks_widest_backend() {
        let selected = Backend::select(&all_caps()).unwrap();

        let expected = if cfg!(feature = "disable-hwx") {
            Backend::Portable16
        } else if cfg!(all(target_arch = "x86_64", feature = "hwx-nightly")) {
            Backend::Avx512
        } else if cfg!(target_arch = "x86_64") {
            Backend::Avx2
        } else if cfg!(target_arch = "aarch64") {
            Backend::Neon
        } else {
            Backend::Portable16
        };
        assert_eq!(selected, expected);
    }

    #[cfg(all(target_arch = "x86_64", not(feature = "disable-hwx")))]
    #[test]
    fn test_select_x86_without_avx2_uses_ssse3() {
        let caps = HardwareCapabilities {
            has_ssse3: true,
            has_sse42: true,
            ..Default::default()
        };
        assert_eq!(Backend::select(&caps), Ok(Backend::Ssse3));
        assert!(matches!(
            Backend::select(&HardwareCapabilities::default()),
            Err(ShuftiError::ArchError(_))
        ));
    }

    #[test]
    fn test_active_backend_is_available() {
        let backend = active_backend();
        assert!(backend.is_available(&get_hw_capabilities()));
        assert_eq!(active_backend(), backend);
        if check_capability().is_ok() {
            assert_eq!(Ok(backend), Backend::select(&get_hw_capabilities()));
        } else {
            assert_eq!(backend, Backend::fallback());
        }
    }

    #[test]
    fn test_fallback_is_portable() {
        let fallback = Backend::fallback();
        assert!(fallback.is_available(&HardwareCapabilities::default()));
        assert_eq!(fallback.lane_width().bytes(), LANES_PORTABLE_BYTES);
    }

    #[test]
    fn test_backend_names_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(Backend::from_name(backend.name()), Ok(backend));
        }
        assert_eq!(Backend::from_name("AVX2"), Ok(Backend::Avx2));
        assert!(matches!(
            Backend::from_name("sse2"),
            Err(ShuftiError::Unsupported(_))
        ));
    }

    #[test]
    fn test_backend_lane_widths() {
        assert_eq!(Backend::Portable16.lane_width(), LaneWidth::W16);
        assert_eq!(Backend::Ssse3.lane_width(), LaneWidth::W16);
        assert_eq!(Backend::Neon.lane_width(), LaneWidth::W16);
        assert_eq!(Backend::Avx2.lane_width(), LaneWidth::W32);
        assert_eq!(Backend::Portable64.lane_width().bytes(), 64);
        assert_eq!(Backend::Avx512.lane_width().groups(), 4);
    }

    #[test]
    fn test_unavailable_backend_is_rejected() {
        let caps = get_hw_capabilities();
        let masks = masks_for(b"a");
        let mut rejected = 0;

        for backend in Backend::ALL.into_iter().filter(|b| !b.is_available(&caps)) {
            let err = backend.find_first(&masks, b"aaaa").unwrap_err();
            assert!(matches!(err, ShuftiError::Unsupported(_)), "{:?}", backend);
            assert!(backend.find_last(&masks, b"aaaa").is_err());
            assert!(backend.double_find_first(&masks, &masks, b"aaaa").is_err());
            rejected += 1;
        }

        // SSSE3 and NEON never coexist in one build
        assert!(rejected > 0);
    }

    // =============================================================================
    // SLICE SCANS AGAINST THE SCALAR REFERENCE
    // =============================================================================

    fn scan_classes() -> Vec<NibbleMaskPair> {
        vec![
            masks_for(b"a"),
            masks_for(b"\r\n"),
            masks_for(&[0]),
            build_class_masks(&class_where(|b| b.is_ascii_digit())).unwrap(),
            build_class_masks(&class_where(|b| b >= 0x80)).unwrap(),
            build_class_masks(&class_where(|_| false)).unwrap(),
        ]
    }

    #[test]
    fn test_every_backend_matches_scalar_scans() {
        let classes = scan_classes();
        for backend in available_backends() {
            for len in 0..200usize {
                let haystack = noise(len, len as u64, b"abc\r\n\x00\x80159");
                for masks in &classes {
                    assert_eq!(
                        backend.find_first(masks, &haystack).unwrap(),
                        shufti_find_first_scalar(masks, &haystack),
                        "{:?} find_first len {}",
                        backend,
                        len
                    );
                    assert_eq!(
                        backend.find_last(masks, &haystack).unwrap(),
                        shufti_find_last_scalar(masks, &haystack),
                        "{:?} find_last len {}",
                        backend,
                        len
                    );
                }
                for pair in classes.windows(2) {
                    assert_eq!(
                        backend.double_find_first(&pair[0], &pair[1], &haystack).unwrap(),
                        shufti_double_find_first_scalar(&pair[0], &pair[1], &haystack),
                        "{:?} double_find_first len {}",
                        backend,
                        len
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_padding_never_matches_nul_class() {
        let nul = masks_for(&[0]);
        let haystack = vec![b'x'; 37];
        for backend in available_backends() {
            assert_eq!(backend.find_first(&nul, &haystack).unwrap(), None);
            assert_eq!(backend.find_last(&nul, &haystack).unwrap(), None);
            assert_eq!(
                backend.double_find_first(&masks_for(b"x"), &nul, &haystack).unwrap(),
                None
            );
        }
    }

    #[test]
    fn test_pair_straddling_every_block_boundary() {
        let first = masks_for(b"<");
        let second = masks_for(b"/");
        for backend in available_backends() {
            let width = backend.lane_width().bytes();
            for at in [width - 1, 2 * width - 1, 3 * width - 1] {
                let mut haystack = vec![b'.'; 4 * width];
                haystack[at] = b'<';
                haystack[at + 1] = b'/';
                assert_eq!(
                    backend.double_find_first(&first, &second, &haystack).unwrap(),
                    Some(at),
                    "{:?} at {}",
                    backend,
                    at
                );
            }
        }
    }

    #[test]
    fn test_public_scans_across_threshold() {
        let masks = masks_for(b"z");
        let second = masks_for(b"q");
        for len in [0, 1, SIMD_THRESHOLD_SHUFTI.min(64) - 1, 16, 17, 100, 1000] {
            let mut haystack = vec![b'-'; len];
            if len > 3 {
                haystack[len / 2] = b'z';
                haystack[len / 2 + 1] = b'q';
                haystack[len - 1] = b'z';
            }
            assert_eq!(
                shufti_find_first(&masks, &haystack),
                shufti_find_first_scalar(&masks, &haystack),
                "len {}",
                len
            );
            assert_eq!(
                shufti_find_last(&masks, &haystack),
                shufti_find_last_scalar(&masks, &haystack),
                "len {}",
                len
            );
            assert_eq!(
                shufti_double_find_first(&masks, &second, &haystack),
                shufti_double_find_first_scalar(&masks, &second, &haystack),
                "len {}",
                len
            );
        }
    }

    #[test]
    fn test_scenario_tables_for_single_byte_class() {
        // Hand-written tables for {'a'} instead of the test builder
        let mut lo = [0b11u8; 16];
        lo[0x1] = 0b01;
        let mut hi = [0b01u8; 16];
        hi[0x6] = 0b10;
        let masks = NibbleMaskPair::new(lo, hi);

        for b in 0..=255u8 {
            assert_eq!(masks.contains(b), b == b'a', "byte {:#04x}", b);
        }
        assert_eq!(shufti_find_first(&masks, b"no hit here"), None);
        assert_eq!(shufti_find_first(&masks, b"no match here"), Some(4));
        let haystack = [b"zzzzzzzzzzzzzzzzzzz".as_slice(), b"a-a"].concat();
        assert_eq!(shufti_find_first(&masks, &haystack), Some(19));
        assert_eq!(shufti_find_last(&masks, &haystack), Some(21));

        let text = b"the quick brown fox jumps over a lazy dog";
        assert_eq!(shufti_find_first(&masks, text), Some(31));
        assert_eq!(shufti_find_last(&masks, text), Some(34));
    }

    // =============================================================================
    // TYPES AND SERIALIZATION
    // =============================================================================

    #[test]
    fn test_nibble_pair_from_slices() {
        let masks = masks_for(b"k");
        assert_eq!(NibbleMaskPair::from_slices(&masks.lo, &masks.hi), Ok(masks));

        let err = NibbleMaskPair::from_slices(&masks.lo[..15], &masks.hi).unwrap_err();
        assert!(matches!(err, ShuftiError::PreconditionViolation(_)));
        assert!(err.to_string().contains("low"));

        let long = [0u8; 17];
        assert!(NibbleMaskPair::from_slices(&masks.lo, &long).is_err());
    }

    #[test]
    fn test_validate_tiled_table() {
        let table: Vec<u8> = (0..16u8).collect();
        assert_eq!(validate_tiled_table(&table, 16), Ok(()));
        assert_eq!(validate_tiled_table(&table.repeat(2), 32), Ok(()));
        assert_eq!(validate_tiled_table(&table.repeat(4), 64), Ok(()));

        assert!(validate_tiled_table(&table, 8).is_err());
        assert!(validate_tiled_table(&table.repeat(2), 64).is_err());

        let mut skewed = table.repeat(4);
        skewed[63] ^= 0xff;
        let err = validate_tiled_table(&skewed, 64).unwrap_err();
        assert!(err.to_string().contains("group 3"), "{}", err);
    }

    #[test]
    fn test_lane_width_from_bytes() {
        assert_eq!(LaneWidth::from_bytes(16), Ok(LaneWidth::W16));
        assert_eq!(LaneWidth::from_bytes(32), Ok(LaneWidth::W32));
        assert_eq!(LaneWidth::from_bytes(64), Ok(LaneWidth::W64));
        assert!(matches!(
            LaneWidth::from_bytes(48),
            Err(ShuftiError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_serde_round_trips() {
        let masks = build_class_masks(&class_of(b"+-*/")).unwrap();
        let json = serde_json::to_string(&masks).unwrap();
        let back: NibbleMaskPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, masks);

        let caps = get_hw_capabilities();
        let json = serde_json::to_string(&caps).unwrap();
        assert!(json.contains("has_sse42"));
        let back: HardwareCapabilities = serde_json::from_str(&json).unwrap();
        assert_eq!(back, caps);

        let json = serde_json::to_string(&Backend::Avx2).unwrap();
        assert_eq!(serde_json::from_str::<Backend>(&json).unwrap(), Backend::Avx2);
    }

    // =============================================================================
    // PROPERTY TESTS
    // =============================================================================

    proptest! {
        #[test]
        fn prop_scans_match_scalar(
            members in prop::collection::vec(any::<u8>(), 1..4),
            haystack in prop::collection::vec(any::<u8>(), 0..300),
        ) {
            let Some(masks) = build_class_masks(&class_of(&members)) else {
                return Ok(());
            };
            prop_assert_eq!(
                shufti_find_first(&masks, &haystack),
                shufti_find_first_scalar(&masks, &haystack)
            );
            prop_assert_eq!(
                shufti_find_last(&masks, &haystack),
                shufti_find_last_scalar(&masks, &haystack)
            );
        }

        #[test]
        fn prop_double_scan_matches_scalar(
            a in any::<u8>(),
            b in any::<u8>(),
            haystack in prop::collection::vec(prop::sample::select(vec![0u8, 1, 2, 0xff]), 0..300),
        ) {
            let first = masks_for(&[a % 3]);
            let second = masks_for(&[b % 3]);
            for backend in available_backends() {
                prop_assert_eq!(
                    backend.double_find_first(&first, &second, &haystack).unwrap(),
                    shufti_double_find_first_scalar(&first, &second, &haystack)
                );
            }
        }
    }
}
