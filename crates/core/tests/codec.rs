use ledscene_core::{
    codec::{
        decode_pattern, decode_scene, encode_pattern, encode_scene, encode_scenes,
        firmware_info_len, pattern_record_len, read_firmware_info, read_scene, read_strip_info,
        strip_info_len, write_firmware_info, write_pattern, write_strip_info, Reader, Writer,
    },
    types::{
        Animation, AnimationKind, ColorSegment, FirmwareInfo, Pattern, PatternId, Scene, StripId,
        StripInfo,
    },
    Error,
};

fn demo_pattern() -> Pattern {
    Pattern::new(PatternId(0x0102), "Sunset")
        .with_brightness(200)
        .with_segment(ColorSegment::gradient(0, 59, 0xFF_00_00, 0x00_00_FF))
        .with_segment(ColorSegment::flat(60, 69, 0x00_FF_00))
        .with_animation(Animation::trail(0, 59, 2))
        .with_animation(Animation::breath(60, 69, 1))
}

#[test]
fn test_pattern_layout() {
    let pattern = Pattern::new(PatternId(0x0201), "AB")
        .with_brightness(7)
        .with_animation(Animation::trail(1, 0x0302, 4))
        .with_segment(ColorSegment::gradient(5, 6, 0x00AA_BBCC, 0x0011_2233));

    let bytes = encode_pattern(&pattern).unwrap();
    assert_eq!(
        bytes,
        [
            2, b'A', b'B', // name
            0x01, 0x02, // id
            7,    // brightness
            1, 1, // counts
            0, 1, 0, 0x02, 0x03, 4, // trail animation
            5, 0, 6, 0, 0xCC, 0xBB, 0xAA, 0, 0x33, 0x22, 0x11, 0, // gradient
        ]
    );
    assert_eq!(bytes.len(), pattern_record_len(&pattern));
}

#[test]
fn test_pattern_round_trip() {
    let pattern = demo_pattern();
    let bytes = encode_pattern(&pattern).unwrap();
    assert_eq!(decode_pattern(&bytes).unwrap(), pattern);
}

#[test]
fn test_pattern_round_trip_full_lists() {
    let mut pattern = Pattern::new(PatternId(u16::MAX - 1), "x".repeat(255));
    for i in 0..255_u16 {
        pattern = pattern
            .with_animation(Animation {
                kind: AnimationKind::from_code(i as u8),
                start_index: i,
                end_index: 300 - i,
                speed: (i % 7 + 1) as u8,
            })
            .with_segment(ColorSegment::gradient(i, i + 1, u32::from(i), 0x00FF_FFFF));
    }

    let bytes = encode_pattern(&pattern).unwrap();
    assert_eq!(decode_pattern(&bytes).unwrap(), pattern);
}

#[test]
fn test_unknown_animation_kind_survives() {
    let pattern = Pattern::new(PatternId(1), "").with_animation(Animation {
        kind: AnimationKind::Unknown(42),
        start_index: 0,
        end_index: 1,
        speed: 1,
    });
    let decoded = decode_pattern(&encode_pattern(&pattern).unwrap()).unwrap();
    assert_eq!(decoded.animations[0].kind, AnimationKind::Unknown(42));
}

#[test]
fn test_long_name_is_truncated() {
    let pattern = Pattern::new(PatternId(3), "n".repeat(300));
    let decoded = decode_pattern(&encode_pattern(&pattern).unwrap()).unwrap();
    assert_eq!(decoded.name.len(), 255);
    assert_eq!(decoded.id, PatternId(3));
}

#[test]
fn test_truncated_pattern_is_rejected() {
    let bytes = encode_pattern(&demo_pattern()).unwrap();
    for len in 0..bytes.len() {
        assert_eq!(decode_pattern(&bytes[..len]), Err(Error::UnexpectedEof), "len {len}");
    }
}

#[test]
fn test_invalid_utf8_name_is_replaced() {
    let bytes = [1, 0xFF, 7, 0, 0, 0, 0];
    let pattern = decode_pattern(&bytes).unwrap();
    assert_eq!(pattern.name, "\u{FFFD}");
    assert_eq!(pattern.id, PatternId(7));

    // The reader stays aligned, so the next record is still readable.
    let bytes = [1, 0xFF, 0, 2, b'o', b'k', 0];
    let mut reader = Reader::new(&bytes);
    assert_eq!(read_scene(&mut reader).unwrap().name, "\u{FFFD}");
    assert_eq!(read_scene(&mut reader).unwrap().name, "ok");
    assert!(reader.is_empty());
}

#[test]
fn test_small_buffer_is_capacity_error() {
    let pattern = demo_pattern();
    let mut buf = vec![0_u8; pattern_record_len(&pattern) - 1];
    let mut writer = Writer::new(&mut buf);
    assert_eq!(write_pattern(&mut writer, &pattern), Err(Error::BufferTooSmall));
}

#[test]
fn test_scene_round_trip() {
    let scene = Scene::new("Evening")
        .with_link(StripId(18), PatternId(0))
        .with_link(StripId(19), PatternId(0xABCD));

    let bytes = encode_scene(&scene).unwrap();
    assert_eq!(&bytes[..8], &[7, b'E', b'v', b'e', b'n', b'i', b'n', b'g']);
    assert_eq!(&bytes[8..], &[2, 18, 0, 0, 19, 0xCD, 0xAB]);
    assert_eq!(decode_scene(&bytes).unwrap(), scene);

    let empty = Scene::new("");
    assert_eq!(decode_scene(&encode_scene(&empty).unwrap()).unwrap(), empty);
}

#[test]
fn test_scene_list() {
    let scenes = vec![
        Scene::new("A").with_link(StripId(1), PatternId(2)),
        Scene::new("B"),
    ];
    let bytes = encode_scenes(&scenes).unwrap();

    let mut reader = Reader::new(&bytes);
    let count = reader.read_u8().unwrap();
    let decoded = (0..count)
        .map(|_| read_scene(&mut reader).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(decoded, scenes);
    assert!(reader.is_empty());
}

#[test]
fn test_strip_info_layout() {
    let info = StripInfo {
        id: StripId(18),
        pixel_count: 0x0102,
        enabled: true,
        name: "Cross/".into(),
    };

    let mut buf = vec![0_u8; strip_info_len(&info)];
    write_strip_info(&mut Writer::new(&mut buf), &info).unwrap();
    assert_eq!(buf, [18, 0x02, 0x01, 1, 6, b'C', b'r', b'o', b's', b's', b'/']);
    assert_eq!(read_strip_info(&mut Reader::new(&buf)).unwrap(), info);

    let mut short = vec![0_u8; buf.len() - 1];
    assert_eq!(
        write_strip_info(&mut Writer::new(&mut short), &info),
        Err(Error::BufferTooSmall)
    );
}

#[test]
fn test_firmware_info_layout() {
    let info = FirmwareInfo {
        hw_version: "1.0".into(),
        sw_version: "0.1.0".into(),
    };

    let mut buf = vec![0_u8; firmware_info_len(&info)];
    write_firmware_info(&mut Writer::new(&mut buf), &info).unwrap();
    assert_eq!(buf, b"\x031.0\x050.1.0");
    assert_eq!(read_firmware_info(&mut Reader::new(&buf)), Ok(info));
    assert_eq!(read_firmware_info(&mut Reader::new(&buf[..4])), Err(Error::UnexpectedEof));
}
