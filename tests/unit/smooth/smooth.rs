use super::*;
use crate::foundation::core::Dimensions;

fn dims() -> Dimensions {
    Dimensions::new(3, 2).unwrap()
}

fn grey(v: u8) -> RgbFrame {
    RgbFrame::solid(dims(), [v, v, v])
}

fn level(f: &RgbFrame) -> u8 {
    f.data[0]
}

fn no_blur() -> SmoothOpts {
    SmoothOpts {
        blur_radius: 0,
        ..SmoothOpts::default()
    }
}

fn run(frames: Vec<RgbFrame>, opts: &SmoothOpts, interpolate: bool) -> Vec<RgbFrame> {
    let mut out = Vec::new();
    let n = smooth_stream(frames.into_iter(), opts, interpolate, &mut |f| {
        out.push(f);
        Ok(())
    })
    .unwrap();
    assert_eq!(n as usize, out.len());
    out
}

#[test]
fn interior_frames_weight_the_center_most() {
    let out = blend_neighbors(Some(&grey(0)), &grey(100), Some(&grey(200)));
    assert_eq!(level(&out), 100);

    let out = blend_neighbors(Some(&grey(0)), &grey(200), Some(&grey(0)));
    assert_eq!(level(&out), 100);

    let out = blend_neighbors(None, &grey(200), Some(&grey(0)));
    assert_eq!(level(&out), 150);

    let out = blend_neighbors(None, &grey(42), None);
    assert_eq!(level(&out), 42);
}

#[test]
fn constant_sequence_is_unchanged_by_blend_and_blur() {
    let frames = vec![grey(77); 5];
    let out = run(frames.clone(), &SmoothOpts::default(), false);
    assert_eq!(out, frames);
}

#[test]
fn blur_radius_0_is_identity_and_constant_image_is_fixed() {
    let src: Vec<u8> = (0..18).collect();
    assert_eq!(blur_rgb8(&src, 3, 2, 0, 1.0).unwrap(), src);

    let flat = [10u8, 20, 30].repeat(12);
    assert_eq!(blur_rgb8(&flat, 4, 3, 2, 1.5).unwrap(), flat);
}

#[test]
fn blur_spreads_a_single_bright_pixel() {
    let (w, h) = (5u32, 5u32);
    let mut src = vec![0u8; (w * h * 3) as usize];
    let center = ((2 * w + 2) * 3) as usize;
    src[center..center + 3].copy_from_slice(&[255, 255, 255]);
    let out = blur_rgb8(&src, w, h, 1, 0.8).unwrap();
    assert!(out[center] < 255);
    assert!(out[center + 3] > 0, "right neighbor received energy");
    assert_eq!(out[0], 0, "corner is outside the radius");
}

#[test]
fn interpolation_doubles_count_with_midpoints() {
    let frames = vec![grey(0), grey(100), grey(200)];
    let mut opts = no_blur();
    opts.batch_size = 2;
    // Bypass blending effects by comparing structure: every odd frame is the mean of its
    // neighbors in the emitted stream.
    let out = run(frames, &opts, true);
    assert_eq!(out.len(), 6);
    for i in [1usize, 3] {
        assert_eq!(level(&out[i]), mid_u8(level(&out[i - 1]), level(&out[i + 1])));
    }
    assert_eq!(out[4], out[5], "last frame is repeated");
}

#[test]
fn batch_edges_see_one_neighbor_without_overlap() {
    let frames: Vec<RgbFrame> = [0u8, 0, 200, 200].into_iter().map(grey).collect();
    let mut opts = no_blur();
    opts.batch_size = 2;

    let cut = run(frames.clone(), &opts, false);
    // Frame 1 ends batch 0: blends only with frame 0.
    assert_eq!(level(&cut[1]), 0);
    // Frame 2 starts batch 1: blends only with frame 3.
    assert_eq!(level(&cut[2]), 200);

    opts.overlap = 1;
    let joined = run(frames.clone(), &opts, false);
    let single = run(
        frames,
        &SmoothOpts {
            batch_size: 16,
            ..no_blur()
        },
        false,
    );
    assert_eq!(joined, single);
    assert_eq!(level(&joined[1]), 50);
    assert_eq!(level(&joined[2]), 150);
}

#[test]
fn batches_fed_by_hand_carry_history_and_interpolate() {
    let opts = SmoothOpts {
        batch_size: 2,
        overlap: 1,
        ..no_blur()
    };
    let mut smoother = TemporalSmoother::new(opts, true).unwrap();
    let mut out = Vec::new();
    let mut emit = |f: RgbFrame| -> GenesisResult<()> {
        out.push(f);
        Ok(())
    };
    smoother
        .process_batch(&[grey(0), grey(0)], &[grey(200)], &mut emit)
        .unwrap();
    smoother
        .process_batch(&[grey(200), grey(200)], &[], &mut emit)
        .unwrap();
    smoother.finish(&mut emit).unwrap();
    assert_eq!(smoother.emitted(), 8);

    let levels: Vec<u8> = out.iter().map(level).collect();
    // Frame 2 sees frame 1 from the previous batch's history.
    assert_eq!(levels[0], 0);
    assert_eq!(levels[2], 50);
    assert_eq!(levels[4], 150);
    assert_eq!(levels[6], 200);
    assert_eq!(levels[3], mid_u8(50, 150));
    assert_eq!(levels[6], levels[7]);
}

#[test]
fn empty_stream_emits_nothing() {
    assert!(run(Vec::new(), &SmoothOpts::default(), true).is_empty());
}

#[test]
fn invalid_options_are_rejected() {
    let bad = SmoothOpts {
        batch_size: 0,
        ..SmoothOpts::default()
    };
    assert!(TemporalSmoother::new(bad, false).is_err());

    let bad = SmoothOpts {
        batch_size: 2,
        overlap: 3,
        ..SmoothOpts::default()
    };
    assert!(TemporalSmoother::new(bad, false).is_err());

    let off = SmoothOpts {
        enabled: false,
        ..SmoothOpts::default()
    };
    assert_eq!(off.interpolation_threshold(), None);
    assert_eq!(SmoothOpts::default().interpolation_threshold(), Some(15.0));
}
