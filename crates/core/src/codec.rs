//! Binary records shared by persistence and the control protocol.
//!
//! All integers are little-endian, strings are `u8` length-prefixed byte blobs.
//!
//! Pattern record:
//!
//! ```text
//! u8 nameLen, u8[nameLen] name, u16 id, u8 brightness, u8 animCount, u8 colorCount,
//! animCount  x { u8 kind, u16 startIdx, u16 endIdx, u8 speed },
//! colorCount x { u16 startIdx, u16 endIdx, u32 startColor, u32 endColor }
//! ```
//!
//! Scene record:
//!
//! ```text
//! u8 nameLen, u8[nameLen] name, u8 linkCount, linkCount x { u8 stripId, u16 patternId }
//! ```
//!
//! Strip info record:
//!
//! ```text
//! u8 stripId, u16 pixelCount, u8 enabled, u8 nameLen, u8[nameLen] name
//! ```

use alloc::{string::String, vec, vec::Vec};

pub use endian_codec::PackedSize;
use endian_codec::{DecodeLE, EncodeLE};

use crate::{
    types::{
        Animation, AnimationKind, ColorSegment, FirmwareInfo, Pattern, PatternId, Scene, StripId,
        StripInfo,
    },
    Error, Result,
};

/// Maximum length of a name and maximum number of entries in a counted list.
pub const MAX_COUNT: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedSize, EncodeLE, DecodeLE)]
struct AnimationEntry {
    kind: u8,
    start_index: u16,
    end_index: u16,
    speed: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedSize, EncodeLE, DecodeLE)]
struct SegmentEntry {
    start_index: u16,
    end_index: u16,
    start_color: u32,
    end_color: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedSize, EncodeLE, DecodeLE)]
struct LinkEntry {
    strip: u8,
    pattern: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedSize, EncodeLE, DecodeLE)]
struct StripEntry {
    id: u8,
    pixel_count: u16,
    enabled: u8,
}

impl From<&Animation> for AnimationEntry {
    fn from(anim: &Animation) -> Self {
        Self {
            kind: anim.kind.into_code(),
            start_index: anim.start_index,
            end_index: anim.end_index,
            speed: anim.speed,
        }
    }
}

impl From<AnimationEntry> for Animation {
    fn from(entry: AnimationEntry) -> Self {
        Self {
            kind: AnimationKind::from_code(entry.kind),
            start_index: entry.start_index,
            end_index: entry.end_index,
            speed: entry.speed,
        }
    }
}

impl From<&ColorSegment> for SegmentEntry {
    fn from(segment: &ColorSegment) -> Self {
        Self {
            start_index: segment.start_index,
            end_index: segment.end_index,
            start_color: segment.start_color,
            end_color: segment.end_color,
        }
    }
}

impl From<SegmentEntry> for ColorSegment {
    fn from(entry: SegmentEntry) -> Self {
        Self {
            start_index: entry.start_index,
            end_index: entry.end_index,
            start_color: entry.start_color,
            end_color: entry.end_color,
        }
    }
}

/// Bounds-checked reading cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes already consumed.
    pub const fn position(&self) -> usize {
        self.pos
    }

    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::UnexpectedEof);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_packed()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_packed()
    }

    /// Reads a fixed-size little-endian value.
    pub fn read_packed<T: PackedSize + DecodeLE>(&mut self) -> Result<T> {
        let bytes = self.read_bytes(T::PACKED_LEN)?;
        Ok(T::decode_from_le_bytes(bytes))
    }

    /// Reads a `u8` length-prefixed string.
    ///
    /// Names are opaque byte strings, invalid UTF-8 sequences are replaced with
    /// `U+FFFD` so the record itself stays readable.
    pub fn read_name(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Bounds-checked writing cursor over a mutable byte slice.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes already written.
    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn reserve(&mut self, len: usize) -> Result<&mut [u8]> {
        if self.remaining() < len {
            log::error!(
                "Could not write {len} bytes, buffer is full ({} of {} used)",
                self.pos,
                self.buf.len()
            );
            return Err(Error::BufferTooSmall);
        }
        let bytes = &mut self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_packed(&value)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_packed(&value)
    }

    /// Writes a fixed-size little-endian value.
    pub fn write_packed<T: PackedSize + EncodeLE>(&mut self, value: &T) -> Result<()> {
        value.encode_as_le_bytes(self.reserve(T::PACKED_LEN)?);
        Ok(())
    }

    /// Writes a `u8` length-prefixed string, truncating it to [`MAX_COUNT`] bytes.
    pub fn write_name(&mut self, name: &str) -> Result<()> {
        let name = clamp_name(name);
        self.write_u8(name.len() as u8)?;
        self.write_bytes(name.as_bytes())
    }
}

fn clamp_name(name: &str) -> &str {
    if name.len() <= MAX_COUNT {
        return name;
    }

    log::error!("Name is {} bytes long, truncating to {MAX_COUNT}", name.len());
    let mut len = MAX_COUNT;
    while !name.is_char_boundary(len) {
        len -= 1;
    }
    &name[..len]
}

fn clamp_count(what: &str, len: usize) -> usize {
    if len > MAX_COUNT {
        log::error!("Too many {what} ({len}), only {MAX_COUNT} will be encoded");
        MAX_COUNT
    } else {
        len
    }
}

/// Returns the exact length of the encoded pattern record.
pub fn pattern_record_len(pattern: &Pattern) -> usize {
    1 + clamp_name(&pattern.name).len()
        + u16::PACKED_LEN
        + 3
        + pattern.animations.len().min(MAX_COUNT) * AnimationEntry::PACKED_LEN
        + pattern.segments.len().min(MAX_COUNT) * SegmentEntry::PACKED_LEN
}

/// Returns the exact length of the encoded scene record.
pub fn scene_record_len(scene: &Scene) -> usize {
    1 + clamp_name(&scene.name).len() + 1 + scene.links.len().min(MAX_COUNT) * LinkEntry::PACKED_LEN
}

/// Writes a pattern record.
pub fn write_pattern(writer: &mut Writer<'_>, pattern: &Pattern) -> Result<()> {
    let anim_count = clamp_count("animations", pattern.animations.len());
    let color_count = clamp_count("colors", pattern.segments.len());

    writer.write_name(&pattern.name)?;
    writer.write_u16(pattern.id.0)?;
    writer.write_u8(pattern.brightness)?;
    writer.write_u8(anim_count as u8)?;
    writer.write_u8(color_count as u8)?;
    for anim in &pattern.animations[..anim_count] {
        writer.write_packed(&AnimationEntry::from(anim))?;
    }
    for segment in &pattern.segments[..color_count] {
        writer.write_packed(&SegmentEntry::from(segment))?;
    }
    Ok(())
}

/// Reads a pattern record.
pub fn read_pattern(reader: &mut Reader<'_>) -> Result<Pattern> {
    let name = reader.read_name()?;
    let id = PatternId(reader.read_u16()?);
    let brightness = reader.read_u8()?;
    let anim_count = reader.read_u8()? as usize;
    let color_count = reader.read_u8()? as usize;

    let animations = (0..anim_count)
        .map(|_| reader.read_packed::<AnimationEntry>().map(Animation::from))
        .collect::<Result<Vec<_>>>()?;
    let segments = (0..color_count)
        .map(|_| reader.read_packed::<SegmentEntry>().map(ColorSegment::from))
        .collect::<Result<Vec<_>>>()?;

    Ok(Pattern {
        id,
        name,
        brightness,
        segments,
        animations,
    })
}

/// Writes a scene record.
pub fn write_scene(writer: &mut Writer<'_>, scene: &Scene) -> Result<()> {
    let link_count = clamp_count("links", scene.links.len());

    writer.write_name(&scene.name)?;
    writer.write_u8(link_count as u8)?;
    for (strip, pattern) in scene.links.iter().take(link_count) {
        writer.write_packed(&LinkEntry {
            strip: strip.0,
            pattern: pattern.0,
        })?;
    }
    Ok(())
}

/// Reads a scene record.
pub fn read_scene(reader: &mut Reader<'_>) -> Result<Scene> {
    let mut scene = Scene::new(reader.read_name()?);
    let link_count = reader.read_u8()?;
    for _ in 0..link_count {
        let link = reader.read_packed::<LinkEntry>()?;
        scene.links.insert(StripId(link.strip), PatternId(link.pattern));
    }
    Ok(scene)
}

/// Returns the exact length of the encoded strip info record.
pub fn strip_info_len(info: &StripInfo) -> usize {
    StripEntry::PACKED_LEN + 1 + clamp_name(&info.name).len()
}

/// Writes a strip info record.
pub fn write_strip_info(writer: &mut Writer<'_>, info: &StripInfo) -> Result<()> {
    writer.write_packed(&StripEntry {
        id: info.id.0,
        pixel_count: info.pixel_count,
        enabled: u8::from(info.enabled),
    })?;
    writer.write_name(&info.name)
}

/// Reads a strip info record.
pub fn read_strip_info(reader: &mut Reader<'_>) -> Result<StripInfo> {
    let entry = reader.read_packed::<StripEntry>()?;
    Ok(StripInfo {
        id: StripId(entry.id),
        pixel_count: entry.pixel_count,
        enabled: entry.enabled != 0,
        name: reader.read_name()?,
    })
}

/// Returns the exact length of the encoded firmware info.
pub fn firmware_info_len(info: &FirmwareInfo) -> usize {
    2 + clamp_name(&info.hw_version).len() + clamp_name(&info.sw_version).len()
}

/// Writes the firmware info as two length-prefixed strings.
pub fn write_firmware_info(writer: &mut Writer<'_>, info: &FirmwareInfo) -> Result<()> {
    writer.write_name(&info.hw_version)?;
    writer.write_name(&info.sw_version)
}

pub fn read_firmware_info(reader: &mut Reader<'_>) -> Result<FirmwareInfo> {
    Ok(FirmwareInfo {
        hw_version: reader.read_name()?,
        sw_version: reader.read_name()?,
    })
}

/// Encodes a pattern record into a new buffer.
pub fn encode_pattern(pattern: &Pattern) -> Result<Vec<u8>> {
    let mut buf = vec![0_u8; pattern_record_len(pattern)];
    let mut writer = Writer::new(&mut buf);
    write_pattern(&mut writer, pattern)?;
    Ok(buf)
}

/// Decodes a pattern record, trailing bytes are ignored.
pub fn decode_pattern(bytes: &[u8]) -> Result<Pattern> {
    read_pattern(&mut Reader::new(bytes))
}

/// Encodes a scene record into a new buffer.
pub fn encode_scene(scene: &Scene) -> Result<Vec<u8>> {
    let mut buf = vec![0_u8; scene_record_len(scene)];
    let mut writer = Writer::new(&mut buf);
    write_scene(&mut writer, scene)?;
    Ok(buf)
}

/// Decodes a scene record, trailing bytes are ignored.
pub fn decode_scene(bytes: &[u8]) -> Result<Scene> {
    read_scene(&mut Reader::new(bytes))
}

/// Encodes a scene list as `u8 count` followed by the scene records.
pub fn encode_scenes(scenes: &[Scene]) -> Result<Vec<u8>> {
    let count = clamp_count("scenes", scenes.len());
    let scenes = &scenes[..count];

    let len = 1 + scenes.iter().map(scene_record_len).sum::<usize>();
    let mut buf = vec![0_u8; len];
    let mut writer = Writer::new(&mut buf);
    writer.write_u8(count as u8)?;
    for scene in scenes {
        write_scene(&mut writer, scene)?;
    }
    Ok(buf)
}
