use proptest::prelude::*;
use scope_model::mirror::MirrorState;

/// spec.md §8 boundary behavior: enabling the 9th logic channel on a 2-POD
/// model auto-enables POD1; disabling all 8 channels of a POD auto-disables
/// the POD.
#[test]
fn ninth_channel_enables_second_pod() {
    let mut mirror = MirrorState::defaults_for(0, 16, 2);
    assert!(!mirror.pods[1].enabled);

    mirror.enable_logic_channel(8, true);
    assert!(mirror.pods[1].enabled);
    assert!(!mirror.pods[0].enabled);

    mirror.enable_logic_channel(8, false);
    assert!(!mirror.pods[1].enabled);
}

#[test]
fn disabling_all_pod0_channels_disables_pod0() {
    let mut mirror = MirrorState::defaults_for(0, 16, 2);
    for i in 0..8 {
        mirror.enable_logic_channel(i, true);
    }
    assert!(mirror.pods[0].enabled);
    for i in 0..8 {
        mirror.enable_logic_channel(i, false);
    }
    assert!(!mirror.pods[0].enabled);
}

proptest! {
    /// For all boolean channel assignments, a POD's enable equals the OR of
    /// its 8 channels' enables (spec.md §3 invariant).
    #[test]
    fn pod_enable_is_or_of_its_channels(bits in proptest::collection::vec(any::<bool>(), 16)) {
        let mut mirror = MirrorState::defaults_for(0, 16, 2);
        for (i, &b) in bits.iter().enumerate() {
            mirror.enable_logic_channel(i, b);
        }
        for pod in 0..2 {
            let expect = bits[pod * 8..pod * 8 + 8].iter().any(|&b| b);
            prop_assert_eq!(mirror.pods[pod].enabled, expect);
        }
    }

    /// Trigger position 0.0 maps to `+timebase*hdivs*0.5`, 1.0 to the
    /// negative of the same magnitude (spec.md §8 boundary behavior).
    #[test]
    fn trigger_offset_endpoints(timebase in 1.0e-9f64..1000.0, hdivs in 4u32..20) {
        let mut mirror = MirrorState::defaults_for(1, 0, 0);
        mirror.timebase = timebase;

        mirror.horizontal_trigger_position = 0.0;
        let at_zero = mirror.trigger_offset_seconds(hdivs);
        prop_assert!((at_zero - timebase * hdivs as f64 * 0.5).abs() < 1e-12 * timebase.max(1.0) * hdivs as f64);

        mirror.horizontal_trigger_position = 1.0;
        let at_one = mirror.trigger_offset_seconds(hdivs);
        prop_assert!((at_one + timebase * hdivs as f64 * 0.5).abs() < 1e-12 * timebase.max(1.0) * hdivs as f64);
    }
}
