//! Entities of the scene controller data model.

use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::fmt::Display;

use smart_leds::RGB8;

use crate::{Error, Result};

/// Unique pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PatternId(pub u16);

/// Identifier of a physical strip, fixed by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StripId(pub u8);

impl Display for PatternId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

impl Display for StripId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Converts a packed `0xRRGGBB` color code into a pixel value.
pub const fn unpack_rgb(code: u32) -> RGB8 {
    RGB8 {
        r: (code >> 16) as u8,
        g: (code >> 8) as u8,
        b: code as u8,
    }
}

/// Packs a pixel value into a `0xRRGGBB` color code.
pub const fn pack_rgb(color: RGB8) -> u32 {
    (color.r as u32) << 16 | (color.g as u32) << 8 | color.b as u32
}

/// A contiguous, inclusive range of pixels painted with a flat color or a gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSegment {
    pub start_index: u16,
    pub end_index: u16,
    pub start_color: u32,
    pub end_color: u32,
}

impl ColorSegment {
    /// Creates a segment filled with a single color.
    pub const fn flat(start_index: u16, end_index: u16, color: u32) -> Self {
        Self {
            start_index,
            end_index,
            start_color: color,
            end_color: color,
        }
    }

    /// Creates a segment with a linear gradient between two colors.
    pub const fn gradient(
        start_index: u16,
        end_index: u16,
        start_color: u32,
        end_color: u32,
    ) -> Self {
        Self {
            start_index,
            end_index,
            start_color,
            end_color,
        }
    }
}

/// Animation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    /// Rotates a window of pixels by one slot per tick.
    Trail,
    /// Pulses the brightness of a window in a triangle wave.
    Breath,
    /// A kind unknown to this firmware, kept as-is so records round-trip.
    Unknown(u8),
}

impl AnimationKind {
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Trail,
            1 => Self::Breath,
            other => Self::Unknown(other),
        }
    }

    pub const fn into_code(self) -> u8 {
        match self {
            Self::Trail => 0,
            Self::Breath => 1,
            Self::Unknown(other) => other,
        }
    }
}

/// An animation applied over an inclusive pixel range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub kind: AnimationKind,
    pub start_index: u16,
    pub end_index: u16,
    /// Frame-throttle divisor, the animation steps on every `speed`-th frame.
    pub speed: u8,
}

impl Animation {
    pub const fn trail(start_index: u16, end_index: u16, speed: u8) -> Self {
        Self {
            kind: AnimationKind::Trail,
            start_index,
            end_index,
            speed,
        }
    }

    pub const fn breath(start_index: u16, end_index: u16, speed: u8) -> Self {
        Self {
            kind: AnimationKind::Breath,
            start_index,
            end_index,
            speed,
        }
    }

    /// Returns true if the animation steps on the given frame.
    ///
    /// A zero speed never runs.
    pub const fn runs_on(&self, frame: u32) -> bool {
        self.speed != 0 && frame % self.speed as u32 == 0
    }
}

/// A named color layout with animations and a brightness level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    pub brightness: u8,
    pub segments: Vec<ColorSegment>,
    pub animations: Vec<Animation>,
}

impl Pattern {
    pub fn new(id: PatternId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness;
        self
    }

    #[must_use]
    pub fn with_segment(mut self, segment: ColorSegment) -> Self {
        self.segments.push(segment);
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.animations.push(animation);
        self
    }

    /// Checks the pattern invariants that can be verified without a strip.
    pub fn validate(&self) -> Result<()> {
        if self.animations.iter().any(|anim| anim.speed == 0) {
            return Err(Error::InvalidAnimationSpeed);
        }
        Ok(())
    }
}

/// A named assignment of patterns to strips.
///
/// Strips absent from `links` are disabled while the scene is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scene {
    pub name: String,
    pub links: BTreeMap<StripId, PatternId>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_link(mut self, strip: StripId, pattern: PatternId) -> Self {
        self.links.insert(strip, pattern);
        self
    }

    /// Returns true if any strip is linked to the given pattern.
    pub fn uses_pattern(&self, pattern: PatternId) -> bool {
        self.links.values().any(|id| *id == pattern)
    }
}

/// Ordered list of scenes and the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneTable {
    pub scenes: Vec<Scene>,
    pub selected: Option<u8>,
}

impl SceneTable {
    /// Returns the selected scene, if any.
    pub fn selected_scene(&self) -> Option<&Scene> {
        self.selected.and_then(|idx| self.scenes.get(idx as usize))
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Read-only description of a strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripInfo {
    pub id: StripId,
    pub pixel_count: u16,
    pub enabled: bool,
    pub name: String,
}

/// Hardware and firmware versions reported to the control clients.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FirmwareInfo {
    pub hw_version: String,
    pub sw_version: String,
}

/// Encodes an optional scene index with the "none" sentinel.
pub const fn selection_to_byte(selected: Option<u8>) -> u8 {
    match selected {
        Some(idx) => idx,
        None => crate::NO_SCENE,
    }
}

/// Decodes an optional scene index from the "none" sentinel.
pub const fn selection_from_byte(byte: u8) -> Option<u8> {
    if byte == crate::NO_SCENE {
        None
    } else {
        Some(byte)
    }
}
