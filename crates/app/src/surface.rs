//! Per-strip pixel buffer and animation algorithms.

use ledscene_core::types::{
    unpack_rgb, Animation, AnimationKind, ColorSegment, Pattern, PatternId, StripId, StripInfo,
};
use smart_leds::RGB8;

use crate::StripConfig;

/// Scales each color channel by `brightness / 255`.
pub fn scale(color: RGB8, brightness: u8) -> RGB8 {
    let scale = |c: u8| (u16::from(c) * u16::from(brightness) / 255) as u8;
    RGB8 {
        r: scale(color.r),
        g: scale(color.g),
        b: scale(color.b),
    }
}

/// Linearly interpolates between two colors, `step` of `steps`.
fn lerp(from: RGB8, to: RGB8, step: usize, steps: usize) -> RGB8 {
    if steps == 0 {
        return from;
    }

    let lerp = |a: u8, b: u8| {
        let delta = i32::from(b) - i32::from(a);
        (i32::from(a) + delta * step as i32 / steps as i32) as u8
    };
    RGB8 {
        r: lerp(from.r, to.r),
        g: lerp(from.g, to.g),
        b: lerp(from.b, to.b),
    }
}

/// Working pixel buffer of a single strip.
///
/// Caches the colors of the last applied pattern, so the segments are only
/// recomputed when the pattern or the selection changes.
#[derive(Debug, Clone)]
pub struct PixelSurface {
    info: StripInfo,
    pixels: Vec<RGB8>,
    initial: Vec<RGB8>,
    frame: u32,
    brightness: u8,
    max_brightness: u8,
    rising: bool,
    applied: Option<(PatternId, u64)>,
}

impl PixelSurface {
    pub fn new(config: &StripConfig) -> Self {
        let len = config.pixel_count as usize;
        Self {
            info: StripInfo {
                id: config.id,
                pixel_count: config.pixel_count,
                enabled: false,
                name: config.name.clone(),
            },
            pixels: vec![RGB8::default(); len],
            initial: vec![RGB8::default(); len],
            frame: 0,
            brightness: 0,
            max_brightness: 0,
            rising: false,
            applied: None,
        }
    }

    pub fn id(&self) -> StripId {
        self.info.id
    }

    pub fn info(&self) -> &StripInfo {
        &self.info
    }

    pub fn is_enabled(&self) -> bool {
        self.info.enabled
    }

    /// Enables or disables the strip, returns true if the state has changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.info.enabled != enabled;
        if changed {
            log::debug!(
                "Strip {} is {}",
                self.info.id,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.info.enabled = enabled;
        changed
    }

    /// Current pixel values.
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    /// Pixel values of the last color apply before the brightness scaling.
    pub fn initial_pixels(&self) -> &[RGB8] {
        &self.initial
    }

    /// Current breath brightness.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Number of frames rendered by this surface.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Forces the colors to be recomputed on the next frame.
    pub fn invalidate(&mut self) {
        self.applied = None;
    }

    /// Returns true if the given pattern revision is not the one on the surface.
    pub fn needs_recolor(&self, pattern: PatternId, revision: u64) -> bool {
        self.applied != Some((pattern, revision))
    }

    /// Renders a single frame of the pattern.
    ///
    /// Does nothing while the strip is disabled.
    pub fn render(&mut self, pattern: &Pattern, revision: u64) {
        if !self.info.enabled {
            return;
        }

        if self.needs_recolor(pattern.id, revision) {
            self.apply_colors(&pattern.segments, pattern.brightness);
            self.applied = Some((pattern.id, revision));
        }

        self.frame = self.frame.wrapping_add(1);
        for animation in &pattern.animations {
            self.apply_animation(animation);
        }
    }

    /// Paints the segments, caches the unscaled result as the initial pixels and
    /// scales the live buffer by the pattern brightness.
    ///
    /// Pixels outside of any segment are black, indices beyond the strip are ignored.
    pub fn apply_colors(&mut self, segments: &[ColorSegment], brightness: u8) {
        self.pixels.fill(RGB8::default());
        for segment in segments {
            self.fill_segment(segment);
        }

        self.initial.copy_from_slice(&self.pixels);
        for pixel in &mut self.pixels {
            *pixel = scale(*pixel, brightness);
        }

        self.brightness = brightness;
        self.max_brightness = brightness;
        self.rising = false;
    }

    fn fill_segment(&mut self, segment: &ColorSegment) {
        let Some((lo, hi)) = self.window(segment.start_index, segment.end_index) else {
            return;
        };

        let start = segment.start_index as usize;
        let steps = start.abs_diff(segment.end_index as usize);
        let (from, to) = (unpack_rgb(segment.start_color), unpack_rgb(segment.end_color));
        for (index, pixel) in self.pixels[lo..=hi].iter_mut().enumerate() {
            *pixel = lerp(from, to, start.abs_diff(lo + index), steps);
        }
    }

    /// Runs a single animation step if the throttle allows it on this frame.
    pub fn apply_animation(&mut self, animation: &Animation) {
        if !animation.runs_on(self.frame) {
            return;
        }

        match animation.kind {
            AnimationKind::Trail => self.apply_trail(animation.start_index, animation.end_index),
            AnimationKind::Breath => self.apply_breath(animation.start_index, animation.end_index),
            AnimationKind::Unknown(kind) => {
                log::error!("Unknown animation kind {kind} on strip {}", self.info.id);
            }
        }
    }

    /// Rotates the window by one pixel.
    ///
    /// Pixels move towards `end` and the one at `end` wraps around to `start`.
    pub fn apply_trail(&mut self, start: u16, end: u16) {
        let Some((lo, hi)) = self.window(start, end) else {
            return;
        };

        let window = &mut self.pixels[lo..=hi];
        if start <= end {
            window.rotate_right(1);
        } else {
            window.rotate_left(1);
        }
    }

    /// Steps the breath brightness by one and rescales the window from the initial pixels.
    pub fn apply_breath(&mut self, start: u16, end: u16) {
        if self.rising && self.brightness >= self.max_brightness {
            self.rising = false;
        } else if !self.rising && self.brightness == 0 {
            self.rising = true;
        }

        if self.rising {
            if self.brightness < self.max_brightness {
                self.brightness += 1;
            }
        } else {
            self.brightness = self.brightness.saturating_sub(1);
        }

        let Some((lo, hi)) = self.window(start, end) else {
            return;
        };
        for (pixel, initial) in self.pixels[lo..=hi].iter_mut().zip(&self.initial[lo..=hi]) {
            *pixel = scale(*initial, self.brightness);
        }
    }

    /// Orders and clamps an inclusive index range to the strip length.
    fn window(&self, a: u16, b: u16) -> Option<(usize, usize)> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (lo, hi) = (lo as usize, hi as usize);
        if lo >= self.pixels.len() {
            return None;
        }
        Some((lo, hi.min(self.pixels.len() - 1)))
    }
}
