use super::*;
use crate::foundation::core::Dimensions;

fn sample(version: FormatVersion) -> Container {
    let dims = Dimensions::new(4, 2).unwrap();
    let palette = Palette::new(vec![[0, 0, 0], [255, 0, 0], [0, 0, 255]]).unwrap();
    let frames: Vec<IndexFrame> = (0..5u8)
        .map(|i| IndexFrame::new(dims, vec![i % 3; 8]).unwrap())
        .collect();
    Container::build(
        ContainerMeta {
            version,
            dims,
            fps: 29.97,
            frame_interval: 2,
            extras: ContainerExtras {
                total_original_frames: Some(10),
                target_fps: (version == FormatVersion::V3).then_some(12.0),
                ..ContainerExtras::default()
            },
        },
        palette,
        &frames,
    )
    .unwrap()
}

#[test]
fn every_version_survives_bytes() {
    for version in [FormatVersion::V1, FormatVersion::V2, FormatVersion::V3] {
        let c = sample(version);
        let back = Container::from_bytes(&c.to_bytes().unwrap()).unwrap();
        assert_eq!(back.version(), version);
        assert_eq!(back.dims(), c.dims());
        assert_eq!(back.frame_interval(), 2);
        assert_eq!(back.palette(), c.palette());
        assert_eq!(back.blocks(), c.blocks());
    }
}

#[test]
fn later_versions_are_outer_compressed() {
    let v1 = sample(FormatVersion::V1).to_bytes().unwrap();
    assert_eq!(v1[0], b'{');

    let v2 = sample(FormatVersion::V2).to_bytes().unwrap();
    assert_eq!(v2[0], 0x78, "zlib header");
    assert!(v2.len() < v1.len());
}

#[test]
fn only_v3_keeps_target_fps() {
    let v3 = Container::from_bytes(&sample(FormatVersion::V3).to_bytes().unwrap()).unwrap();
    assert_eq!(v3.extras().target_fps, Some(12.0));

    let v2 = sample(FormatVersion::V3).with_version(FormatVersion::V2);
    let v2 = Container::from_bytes(&v2.to_bytes().unwrap()).unwrap();
    assert_eq!(v2.extras().target_fps, None);
    assert_eq!(v2.extras().total_original_frames, Some(10));

    let v1 = sample(FormatVersion::V3).with_version(FormatVersion::V1);
    assert_eq!(v1.extras(), &ContainerExtras::default());
}

#[test]
fn build_rejects_out_of_palette_indices_and_size_mismatch() {
    let dims = Dimensions::new(2, 1).unwrap();
    let palette = Palette::new(vec![[0, 0, 0], [1, 1, 1]]).unwrap();
    let meta = ContainerMeta {
        version: FormatVersion::V3,
        dims,
        fps: 10.0,
        frame_interval: 1,
        extras: ContainerExtras::default(),
    };
    let bad_index = IndexFrame::new(dims, vec![0, 2]).unwrap();
    assert!(Container::build(meta.clone(), palette.clone(), &[bad_index]).is_err());

    let other_dims = IndexFrame::new(Dimensions::new(1, 2).unwrap(), vec![0, 1]).unwrap();
    assert!(Container::build(meta, palette, &[other_dims]).is_err());
}

#[test]
fn garbage_bytes_are_format_errors() {
    let err = Container::from_bytes(b"\x00\x01garbage").unwrap_err();
    assert!(matches!(err, GenesisError::Format { .. }), "{err}");
}

#[test]
fn save_then_load_reports_size_and_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("clip.genesisvid");
    let c = sample(FormatVersion::V3);
    let size = c.save(&path).unwrap();
    assert_eq!(size, std::fs::metadata(&path).unwrap().len());
    assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    assert_eq!(Container::load(&path).unwrap(), c);
}

#[test]
fn loading_a_missing_file_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Container::load(&dir.path().join("missing.genesisvid")).unwrap_err();
    assert!(matches!(err, GenesisError::Open(_)), "{err}");
}
