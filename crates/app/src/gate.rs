//! Decides whether the render worker has anything to do.

use crate::registry::Registry;

/// Outcome of [`check_for_activity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// At least one strip shows a visible pattern.
    Active,
    /// Nothing would be visible, the render worker should be parked.
    Idle,
}

impl Activity {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Syncs the strip enable flags with the selected scene and reports whether
/// anything would be visible.
///
/// A strip stays enabled only if it is linked in the selected scene to an
/// existing pattern with a non-zero brightness. Every strip is disabled when
/// the global brightness is zero or there is no selected scene.
pub fn check_for_activity(registry: &mut Registry, brightness: u8) -> Activity {
    let (scenes, patterns, strips) = registry.split_mut();

    let scene = match scenes.selected_scene() {
        Some(scene) if brightness > 0 => scene,
        _ => {
            for surface in strips.values_mut() {
                surface.set_enabled(false);
            }
            return Activity::Idle;
        }
    };

    let mut activity = Activity::Idle;
    for (id, surface) in strips.iter_mut() {
        let visible = scene
            .links
            .get(id)
            .and_then(|pattern| patterns.get(pattern))
            .map_or(false, |stored| stored.pattern.brightness > 0);

        surface.set_enabled(visible);
        if visible {
            activity = Activity::Active;
        }
    }
    activity
}
