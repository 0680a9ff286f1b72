use proptest::prelude::*;

use super::*;
use crate::foundation::core::Dimensions;
use crate::palette::quantize::{QuantizeOpts, quantize_frame};

fn dims(w: u32, h: u32) -> Dimensions {
    Dimensions::new(w, h).unwrap()
}

/// A horizontal gradient with `w` distinct colors.
fn gradient(w: u32, h: u32) -> RgbFrame {
    let mut data = Vec::with_capacity((w * h * 3) as usize);
    for _ in 0..h {
        for x in 0..w {
            let v = ((x * 255) / (w - 1).max(1)) as u8;
            data.extend_from_slice(&[v, 255 - v, v / 2]);
        }
    }
    RgbFrame::new(dims(w, h), data).unwrap()
}

fn opts(policy: PalettePolicy, colors: usize) -> PaletteOpts {
    PaletteOpts {
        policy,
        colors,
        ..PaletteOpts::default()
    }
}

#[test]
fn every_policy_yields_exactly_k_entries() {
    let frames = vec![gradient(200, 4), gradient(64, 8)];
    for policy in [
        PalettePolicy::KMeans,
        PalettePolicy::Distinct,
        PalettePolicy::MedianCut,
    ] {
        for k in [2usize, 8, 16, 256] {
            let pal = build_palette(&frames, &opts(policy, k)).unwrap();
            assert_eq!(pal.len(), k, "{policy:?} k={k}");
        }
    }
}

#[test]
fn empty_sample_gives_all_zero_palette() {
    for policy in [
        PalettePolicy::KMeans,
        PalettePolicy::Distinct,
        PalettePolicy::MedianCut,
    ] {
        let pal = build_palette(&[], &opts(policy, 16)).unwrap();
        assert_eq!(pal.len(), 16);
        assert!(pal.colors().iter().all(|&c| c == [0, 0, 0]));
    }
}

#[test]
fn few_distinct_colors_are_kept_verbatim_and_padded() {
    let red = RgbFrame::solid(dims(4, 4), [255, 0, 0]);
    let blue = RgbFrame::solid(dims(4, 4), [0, 0, 255]);
    let pal = build_palette(&[red, blue], &opts(PalettePolicy::KMeans, 8)).unwrap();
    assert_eq!(pal.colors()[0], [0, 0, 255]);
    assert_eq!(pal.colors()[1], [255, 0, 0]);
    assert!(pal.colors()[2..].iter().all(|&c| c == [0, 0, 0]));
}

#[test]
fn distinct_policy_picks_evenly_spaced_sorted_entries() {
    let frame = gradient(256, 1);
    let pal = build_palette(&[frame], &opts(PalettePolicy::Distinct, 4)).unwrap();
    let mut sorted = pal.colors().to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, pal.colors());
    assert_eq!(pal.colors()[0][0], 0);
}

#[test]
fn kmeans_is_reproducible_for_a_fixed_seed() {
    let frames = vec![gradient(300, 3)];
    let a = build_palette(&frames, &opts(PalettePolicy::KMeans, 8)).unwrap();
    let b = build_palette(&frames, &opts(PalettePolicy::KMeans, 8)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn clustering_beats_the_padded_zero_palette() {
    let frames = vec![gradient(300, 3)];
    let km = build_palette(&frames, &opts(PalettePolicy::KMeans, 16)).unwrap();
    let mc = build_palette(&frames, &opts(PalettePolicy::MedianCut, 16)).unwrap();
    let zeros = Palette::zeros(16);
    assert!(palette_mse(&frames, &km) < palette_mse(&frames, &zeros));
    assert!(palette_mse(&frames, &mc) < palette_mse(&frames, &zeros));
}

#[test]
fn out_of_range_palette_sizes_are_rejected() {
    assert!(build_palette(&[], &opts(PalettePolicy::KMeans, 1)).is_err());
    assert!(build_palette(&[], &opts(PalettePolicy::KMeans, 257)).is_err());
}

fn arb_policy() -> impl Strategy<Value = PalettePolicy> {
    prop_oneof![
        Just(PalettePolicy::KMeans),
        Just(PalettePolicy::Distinct),
        Just(PalettePolicy::MedianCut),
    ]
}

fn arb_frames() -> impl Strategy<Value = Vec<RgbFrame>> {
    (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
        prop::collection::vec(
            prop::collection::vec(any::<u8>(), (w * h * 3) as usize)
                .prop_map(move |data| RgbFrame::new(dims(w, h), data).unwrap()),
            0..3,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn palette_has_k_entries_and_quantized_indices_stay_below_k(
        policy in arb_policy(),
        k in 2usize..=256,
        frames in arb_frames(),
        dither in any::<bool>(),
    ) {
        let pal = build_palette(&frames, &opts(policy, k)).unwrap();
        prop_assert_eq!(pal.len(), k);
        for frame in &frames {
            let q = quantize_frame(frame, &pal, QuantizeOpts { dither }).unwrap();
            prop_assert!(q.indices.iter().all(|&i| usize::from(i) < k));
        }
    }
}
