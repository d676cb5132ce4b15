//! Single frame rendering of the selected scene.

use ledscene_core::types::StripId;

use crate::{driver::Frame, registry::Registry};

/// Everything the worker pushes to the driver for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBatch {
    /// Power state of every strip.
    pub power: Vec<(StripId, bool)>,
    /// Pixels of the enabled strips linked in the selected scene.
    pub frames: Vec<Frame>,
}

/// Advances every enabled linked strip by one frame and collects the pixels.
///
/// Must be called with the registry lock held, the returned batch is an owned
/// copy that can be shown after the lock is released.
pub fn render_frame(registry: &mut Registry) -> FrameBatch {
    let (scenes, patterns, strips) = registry.split_mut();

    let power = strips
        .values()
        .map(|surface| (surface.id(), surface.is_enabled()))
        .collect();

    let mut frames = Vec::new();
    if let Some(scene) = scenes.selected_scene() {
        for (strip, pattern_id) in &scene.links {
            let Some(surface) = strips.get_mut(strip) else {
                continue;
            };
            if !surface.is_enabled() {
                continue;
            }
            let Some(stored) = patterns.get(pattern_id) else {
                log::trace!("Strip {strip} is linked to the missing pattern {pattern_id}");
                continue;
            };

            surface.render(&stored.pattern, stored.revision);
            frames.push(Frame {
                strip: *strip,
                pixels: surface.pixels().to_vec(),
            });
        }
    }

    FrameBatch { power, frames }
}
