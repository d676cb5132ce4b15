//! Pattern and scene registries together with the strip surfaces.

use std::collections::BTreeMap;

use ledscene_core::{
    types::{Pattern, PatternId, Scene, SceneTable, StripId, StripInfo},
    Error, Result, NO_SCENE,
};

use crate::{surface::PixelSurface, BoardConfig};

/// The reserved "no pattern" identifier, never assigned.
pub const NO_PATTERN: PatternId = PatternId(u16::MAX);

#[derive(Debug, Clone)]
pub(crate) struct StoredPattern {
    pub pattern: Pattern,
    /// Bumped on every store, surfaces recolor when it changes.
    pub revision: u64,
}

/// Mutable state shared between the control path and the render worker.
///
/// Every mutator validates its arguments before touching anything, so a failed
/// call leaves the registry unchanged.
#[derive(Debug)]
pub struct Registry {
    strips: BTreeMap<StripId, PixelSurface>,
    patterns: BTreeMap<PatternId, StoredPattern>,
    scenes: SceneTable,
    next_revision: u64,
}

impl Registry {
    pub fn new(board: &BoardConfig) -> Self {
        let strips = board
            .strips
            .iter()
            .map(|config| (config.id, PixelSurface::new(config)))
            .collect();

        Self {
            strips,
            patterns: BTreeMap::new(),
            scenes: SceneTable::default(),
            next_revision: 0,
        }
    }

    /// Replaces the registry contents with the persisted ones.
    ///
    /// Scene links to unknown strips or patterns are dropped, which happens
    /// when a corrupt pattern record has been skipped at load. An out of range
    /// selection is dropped as well.
    ///
    /// Returns true if any scene has been changed and has to be saved again.
    pub fn restore(&mut self, patterns: Vec<Pattern>, mut scenes: SceneTable) -> bool {
        self.patterns.clear();
        for pattern in patterns {
            self.store(pattern);
        }

        let mut scenes_changed = false;
        for (index, scene) in scenes.scenes.iter_mut().enumerate() {
            let before = scene.links.len();
            scene.links.retain(|strip, pattern| {
                let valid = self.strips.contains_key(strip) && self.patterns.contains_key(pattern);
                if !valid {
                    log::warn!("Scene {index} has a dangling link {strip} -> {pattern}, unlinking");
                }
                valid
            });
            scenes_changed |= scene.links.len() != before;
        }

        if let Some(selected) = scenes.selected {
            if selected as usize >= scenes.len() {
                log::warn!("Selected scene {selected} is out of range, dropping selection");
                scenes.selected = None;
            }
        }
        self.scenes = scenes;
        self.activate_selected();
        scenes_changed
    }

    fn store(&mut self, pattern: Pattern) {
        self.next_revision += 1;
        let revision = self.next_revision;
        self.patterns.insert(pattern.id, StoredPattern { pattern, revision });
    }

    // Lowest free identifier in `[0, NO_PATTERN)`.
    fn free_pattern_id(&self) -> Option<PatternId> {
        let mut candidate = 0_u16;
        for id in self.patterns.keys() {
            if id.0 != candidate {
                break;
            }
            candidate += 1;
            if candidate == NO_PATTERN.0 {
                return None;
            }
        }
        Some(PatternId(candidate))
    }

    /// Adds a new pattern and returns its assigned identifier.
    ///
    /// The supplied identifier must not be taken, the pattern is stored under the
    /// lowest free one.
    pub fn add_pattern(&mut self, mut pattern: Pattern) -> Result<PatternId> {
        pattern.validate()?;
        if self.patterns.contains_key(&pattern.id) {
            return Err(Error::PatternExists);
        }
        let id = self.free_pattern_id().ok_or(Error::PatternIdsExhausted)?;

        pattern.id = id;
        self.store(pattern);
        log::debug!("Added pattern {id}");
        Ok(id)
    }

    /// Replaces an existing pattern, linked strips recolor on the next frame.
    pub fn update_pattern(&mut self, id: PatternId, mut pattern: Pattern) -> Result<()> {
        pattern.validate()?;
        if !self.patterns.contains_key(&id) {
            return Err(Error::PatternNotFound);
        }

        pattern.id = id;
        self.store(pattern);
        log::debug!("Updated pattern {id}");
        Ok(())
    }

    /// Removes a pattern and unlinks it from every scene.
    ///
    /// Returns true if any scene has been changed.
    pub fn remove_pattern(&mut self, id: PatternId) -> Result<bool> {
        if self.patterns.remove(&id).is_none() {
            return Err(Error::PatternNotFound);
        }

        let mut scenes_changed = false;
        for (index, scene) in self.scenes.scenes.iter_mut().enumerate() {
            let before = scene.links.len();
            let unlinked = scene
                .links
                .iter()
                .filter(|(_, pattern)| **pattern == id)
                .map(|(strip, _)| *strip)
                .collect::<Vec<_>>();
            for strip in &unlinked {
                scene.links.remove(strip);
            }

            if scene.links.len() != before {
                scenes_changed = true;
                if self.scenes.selected == Some(index as u8) {
                    for strip in unlinked {
                        if let Some(surface) = self.strips.get_mut(&strip) {
                            surface.set_enabled(false);
                        }
                    }
                }
            }
        }

        log::debug!("Removed pattern {id}");
        Ok(scenes_changed)
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(&id).map(|stored| &stored.pattern)
    }

    pub fn pattern_ids(&self) -> Vec<PatternId> {
        self.patterns.keys().copied().collect()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.patterns.values().map(|stored| &stored.pattern)
    }

    fn check_links(&self, scene: &Scene) -> Result<()> {
        for (strip, pattern) in &scene.links {
            if !self.strips.contains_key(strip) {
                return Err(Error::StripNotFound);
            }
            if !self.patterns.contains_key(pattern) {
                return Err(Error::PatternNotFound);
            }
        }
        Ok(())
    }

    fn check_index(&self, index: u8) -> Result<usize> {
        let index = index as usize;
        if index >= self.scenes.len() {
            return Err(Error::SceneNotFound);
        }
        Ok(index)
    }

    /// Appends a scene and returns its index.
    pub fn add_scene(&mut self, scene: Scene) -> Result<u8> {
        self.check_links(&scene)?;
        if self.scenes.len() >= NO_SCENE as usize {
            return Err(Error::SceneTableFull);
        }

        self.scenes.scenes.push(scene);
        let index = (self.scenes.len() - 1) as u8;
        log::debug!("Added scene {index}");
        Ok(index)
    }

    /// Removes a scene.
    ///
    /// Removing the selected scene selects the new last one.
    pub fn remove_scene(&mut self, index: u8) -> Result<()> {
        let position = self.check_index(index)?;
        self.scenes.scenes.remove(position);

        self.scenes.selected = match self.scenes.selected {
            Some(selected) if selected == index => self.last_scene_index(),
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        self.activate_selected();
        log::debug!("Removed scene {index}, selected {:?}", self.scenes.selected);
        Ok(())
    }

    /// Replaces the scene at the given index.
    pub fn update_scene(&mut self, index: u8, scene: Scene) -> Result<()> {
        let position = self.check_index(index)?;
        self.check_links(&scene)?;

        self.scenes.scenes[position] = scene;
        if self.scenes.selected == Some(index) {
            self.activate_selected();
        }
        log::debug!("Updated scene {index}");
        Ok(())
    }

    /// Makes the given scene the active one.
    pub fn select_scene(&mut self, index: u8) -> Result<()> {
        self.check_index(index)?;
        self.scenes.selected = Some(index);
        self.activate_selected();
        log::debug!("Selected scene {index}");
        Ok(())
    }

    fn last_scene_index(&self) -> Option<u8> {
        self.scenes.len().checked_sub(1).map(|last| last as u8)
    }

    // Enables the strips linked in the selected scene, disables the rest and
    // forces the linked ones to recolor.
    fn activate_selected(&mut self) {
        let links = self.scenes.selected_scene().map(|scene| &scene.links);
        for (id, surface) in &mut self.strips {
            let linked = links.map_or(false, |links| links.contains_key(id));
            surface.set_enabled(linked);
            if linked {
                surface.invalidate();
            }
        }
    }

    pub fn scene(&self, index: u8) -> Option<&Scene> {
        self.scenes.scenes.get(index as usize)
    }

    pub fn scene_count(&self) -> u8 {
        self.scenes.len() as u8
    }

    pub fn scenes(&self) -> &SceneTable {
        &self.scenes
    }

    pub fn selected_scene_index(&self) -> Option<u8> {
        self.scenes.selected
    }

    pub fn selected_scene(&self) -> Option<&Scene> {
        self.scenes.selected_scene()
    }

    pub fn strip(&self, id: StripId) -> Option<&PixelSurface> {
        self.strips.get(&id)
    }

    pub fn strip_mut(&mut self, id: StripId) -> Option<&mut PixelSurface> {
        self.strips.get_mut(&id)
    }

    pub fn strips(&self) -> impl Iterator<Item = &PixelSurface> + '_ {
        self.strips.values()
    }

    pub fn strip_infos(&self) -> Vec<StripInfo> {
        self.strips.values().map(|surface| surface.info().clone()).collect()
    }

    /// Disables every strip.
    pub fn disable_all(&mut self) {
        for surface in self.strips.values_mut() {
            surface.set_enabled(false);
        }
    }

    /// Borrows the read-only tables together with the mutable surfaces.
    pub(crate) fn split_mut(
        &mut self,
    ) -> (
        &SceneTable,
        &BTreeMap<PatternId, StoredPattern>,
        &mut BTreeMap<StripId, PixelSurface>,
    ) {
        (&self.scenes, &self.patterns, &mut self.strips)
    }
}
