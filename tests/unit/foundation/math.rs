use super::*;

#[test]
fn dist2_is_symmetric_and_zero_on_equal() {
    let a = [10u8, 200, 30];
    let b = [0u8, 255, 0];
    assert_eq!(dist2(a, a), 0);
    assert_eq!(dist2(a, b), dist2(b, a));
    assert_eq!(dist2([0, 0, 0], [255, 255, 255]), 3 * 255 * 255);
}

#[test]
fn weighted_and_mid_round_half_up() {
    assert_eq!(weighted_u8(&[(10, 1), (20, 2), (31, 1)], 4), 20);
    assert_eq!(weighted_u8(&[(255, 3), (255, 1)], 4), 255);
    assert_eq!(mid_u8(0, 255), 128);
    assert_eq!(mid_u8(4, 4), 4);
    assert_eq!(clamp_u8(-5), 0);
    assert_eq!(clamp_u8(300), 255);
}
