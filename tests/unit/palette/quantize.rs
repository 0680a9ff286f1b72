use proptest::prelude::*;

use super::*;
use crate::foundation::core::Dimensions;

fn palette(colors: &[Rgb]) -> Palette {
    Palette::new(colors.to_vec()).unwrap()
}

fn frame_from(w: u32, h: u32, data: Vec<u8>) -> RgbFrame {
    RgbFrame::new(Dimensions::new(w, h).unwrap(), data).unwrap()
}

#[test]
fn nearest_prefers_lower_index_on_exact_tie() {
    // Both entries are at distance 1 from the probe.
    let colors = [[10u8, 0, 0], [12, 0, 0]];
    assert_eq!(nearest_index(&colors, [11, 0, 0]), 0);

    let dup = [[5u8, 5, 5], [5, 5, 5]];
    assert_eq!(nearest_index(&dup, [5, 5, 5]), 0);
}

#[test]
fn solid_colors_map_to_their_entries() {
    let pal = palette(&[[0, 0, 0], [255, 0, 0], [0, 0, 255]]);
    let f = frame_from(2, 1, vec![250, 3, 1, 2, 1, 240]);
    let q = quantize_frame(&f, &pal, QuantizeOpts::default()).unwrap();
    assert_eq!(q.indices, vec![1, 2]);
    assert_eq!(q.dims(), f.dims());
}

#[test]
fn dithering_is_deterministic_and_in_range() {
    let pal = palette(&[[0, 0, 0], [255, 255, 255]]);
    let data: Vec<u8> = (0..16 * 8).flat_map(|_| [128u8, 128, 128]).collect();
    let f = frame_from(16, 8, data);
    let opts = QuantizeOpts { dither: true };
    let a = quantize_frame(&f, &pal, opts).unwrap();
    let b = quantize_frame(&f, &pal, opts).unwrap();
    assert_eq!(a, b);
    assert!(a.indices.iter().all(|&i| usize::from(i) < pal.len()));

    // Mid grey over black/white should diffuse into a mix, not a flat field.
    let whites = a.indices.iter().filter(|&&i| i == 1).count();
    assert!(whites > 32 && whites < 96, "whites={whites}");
}

#[test]
fn mismatched_buffer_is_rejected() {
    let pal = palette(&[[0, 0, 0]]);
    let f = RgbFrame {
        width: 2,
        height: 2,
        data: vec![0; 5],
    };
    assert!(quantize_frame(&f, &pal, QuantizeOpts::default()).is_err());
}

fn arb_palette() -> impl Strategy<Value = Vec<Rgb>> {
    prop::collection::vec(any::<[u8; 3]>(), 1..=32)
}

fn arb_frame() -> impl Strategy<Value = (u32, u32, Vec<u8>)> {
    (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), (w * h * 3) as usize)
            .prop_map(move |data| (w, h, data))
    })
}

proptest! {
    #[test]
    fn indices_stay_below_palette_len(colors in arb_palette(), (w, h, data) in arb_frame(), dither in any::<bool>()) {
        let pal = palette(&colors);
        let q = quantize_frame(&frame_from(w, h, data), &pal, QuantizeOpts { dither }).unwrap();
        prop_assert!(q.indices.iter().all(|&i| usize::from(i) < pal.len()));
    }

    #[test]
    fn requantizing_a_quantized_frame_is_a_fixed_point(colors in arb_palette(), (w, h, data) in arb_frame()) {
        let pal = palette(&colors);
        let opts = QuantizeOpts::default();
        let q = quantize_frame(&frame_from(w, h, data), &pal, opts).unwrap();
        let rebuilt: Vec<u8> = q
            .indices
            .iter()
            .flat_map(|&i| pal.colors()[usize::from(i)])
            .collect();
        let rebuilt = frame_from(w, h, rebuilt);
        let q2 = quantize_frame(&rebuilt, &pal, opts).unwrap();
        let rebuilt2: Vec<u8> = q2
            .indices
            .iter()
            .flat_map(|&i| pal.colors()[usize::from(i)])
            .collect();
        prop_assert_eq!(rebuilt.data, rebuilt2);
    }
}
