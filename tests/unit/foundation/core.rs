use super::*;

#[test]
fn fps_new_reduces_and_validates() {
    let fps = Fps::new(60, 2).unwrap();
    assert_eq!((fps.num, fps.den), (30, 1));
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn fps_from_f64_keeps_common_rates_exact() {
    let ntsc = Fps::from_f64(29.97).unwrap();
    assert_eq!((ntsc.num, ntsc.den), (2997, 100));

    let ten = Fps::from_f64(10.0).unwrap();
    assert_eq!((ten.num, ten.den), (10, 1));

    assert!(Fps::from_f64(0.0).is_err());
    assert!(Fps::from_f64(f64::NAN).is_err());
    assert!(Fps::from_f64(-3.0).is_err());
}

#[test]
fn frames_to_secs_uses_rational_rate() {
    let fps = Fps::new(10, 1).unwrap();
    assert!((fps.frames_to_secs(25) - 2.5).abs() < 1e-12);
}

#[test]
fn dimensions_reject_zero_and_report_sizes() {
    assert!(Dimensions::new(0, 4).is_err());
    let dims = Dimensions::new(4, 3).unwrap();
    assert_eq!(dims.area(), 12);
    assert_eq!(dims.rgb_len(), 36);
    assert_eq!(dims.to_string(), "4x3");
}
