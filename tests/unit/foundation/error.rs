use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(GenesisError::open("x").to_string().contains("open error:"));
    assert!(
        GenesisError::encode("x")
            .to_string()
            .contains("encode error:")
    );
    assert!(
        GenesisError::sink_open("x")
            .to_string()
            .contains("sink open error:")
    );
    assert!(
        GenesisError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(GenesisError::sink("x").to_string().contains("sink error:"));
}

#[test]
fn format_and_decode_name_their_location() {
    let err = GenesisError::format("palette[3]", "channel out of range");
    assert_eq!(
        err.to_string(),
        "format error in `palette[3]`: channel out of range"
    );

    let err = GenesisError::decode(7, "block too short");
    assert_eq!(err.to_string(), "decode error at frame 7: block too short");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = GenesisError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
