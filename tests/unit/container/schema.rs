use serde_json::json;

use super::*;

fn block_hex() -> String {
    let block = crate::container::codec::deflate(&[0u8, 1, 1, 0]).unwrap();
    hex::encode(block)
}

fn parse(value: serde_json::Value) -> GenesisResult<Container> {
    ContainerRecord::parse(value)?.into_container()
}

fn field_of(err: GenesisError) -> String {
    match err {
        GenesisError::Format { field, .. } => field,
        other => panic!("expected format error, got {other}"),
    }
}

#[test]
fn v1_reads_both_interval_spellings_and_defaults_to_one() {
    let base = json!({
        "magic": "GENESISVID-1",
        "width": 2,
        "height": 2,
        "fps": 24.0,
        "frames": [block_hex()],
        "palette": [[0, 0, 0], [255, 255, 255]],
    });

    let c = parse(base.clone()).unwrap();
    assert_eq!(c.version(), FormatVersion::V1);
    assert_eq!(c.frame_interval(), 1);

    let mut with_interval = base.clone();
    with_interval["frame_interval"] = json!(3);
    assert_eq!(parse(with_interval).unwrap().frame_interval(), 3);

    let mut with_skip = base;
    with_skip["frame_skip"] = json!(4);
    assert_eq!(parse(with_skip).unwrap().frame_interval(), 4);
}

#[test]
fn v2_uses_renamed_keys() {
    let c = parse(json!({
        "magic": "GENESISVID",
        "version": 2,
        "width": 2,
        "height": 2,
        "original_fps": 30.0,
        "frame_skip": 3,
        "total_original_frames": 9,
        "frames": [block_hex(), block_hex(), block_hex()],
        "palette": [[0, 0, 0], [9, 9, 9]],
    }))
    .unwrap();
    assert_eq!(c.version(), FormatVersion::V2);
    assert_eq!(c.fps(), 30.0);
    assert_eq!(c.frame_interval(), 3);
    assert_eq!(c.frame_count(), 3);
    assert_eq!(c.extras().total_original_frames, Some(9));
}

#[test]
fn unknown_magic_and_version_are_rejected() {
    let err = parse(json!({ "magic": "NOPE", "width": 1 })).unwrap_err();
    assert_eq!(field_of(err), "magic");

    let err = parse(json!({ "magic": "GENESISVID", "version": 9 })).unwrap_err();
    assert_eq!(field_of(err), "version");

    let err = parse(json!({ "width": 1 })).unwrap_err();
    assert_eq!(field_of(err), "magic");

    let err = parse(json!([1, 2, 3])).unwrap_err();
    assert_eq!(field_of(err), "record");
}

#[test]
fn missing_fields_are_named_per_version() {
    let err = parse(json!({
        "magic": "GENESISVID",
        "version": 2,
        "width": 2,
        "height": 2,
        "fps": 30.0,
        "frames": [],
        "palette": [[0, 0, 0]],
    }))
    .unwrap_err();
    assert_eq!(field_of(err), "original_fps");
}

#[test]
fn bad_palette_channel_names_the_entry() {
    let err = parse(json!({
        "magic": "GENESISVID-1",
        "width": 1,
        "height": 1,
        "fps": 10.0,
        "frames": [],
        "palette": [[0, 0, 0], [0, 0, 0], [1, 2, 300]],
    }))
    .unwrap_err();
    assert_eq!(field_of(err), "palette[2]");
}

#[test]
fn zero_dimensions_are_format_errors() {
    let err = parse(json!({
        "magic": "GENESISVID-1",
        "width": 0,
        "height": 1,
        "fps": 10.0,
        "frames": [],
        "palette": [[0, 0, 0]],
    }))
    .unwrap_err();
    assert_eq!(field_of(err), "width");
}

#[test]
fn frame_area_above_the_limit_is_a_format_error() {
    let err = parse(json!({
        "magic": "GENESISVID-1",
        "width": 16385,
        "height": 16384,
        "fps": 10.0,
        "frames": [],
        "palette": [[0, 0, 0]],
    }))
    .unwrap_err();
    assert_eq!(field_of(err), "height");

    let ok = parse(json!({
        "magic": "GENESISVID-1",
        "width": 16384,
        "height": 16384,
        "fps": 10.0,
        "frames": [],
        "palette": [[0, 0, 0]],
    }));
    assert!(ok.is_ok());
}

#[test]
fn invalid_hex_block_is_kept_as_corrupt_not_fatal() {
    let c = parse(json!({
        "magic": "GENESISVID-1",
        "width": 2,
        "height": 2,
        "fps": 10.0,
        "frames": [block_hex(), "zz-not-hex", block_hex()],
        "palette": [[0, 0, 0], [255, 255, 255]],
    }))
    .unwrap();
    assert_eq!(c.frame_count(), 3);
    assert!(c.blocks()[1].is_empty());
}

#[test]
fn version_table_covers_every_format() {
    for format in [FormatVersion::V1, FormatVersion::V2, FormatVersion::V3] {
        assert!(VERSION_TABLE.iter().any(|e| e.format == format));
    }
}
