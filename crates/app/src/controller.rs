//! LED scene controller business-logic implementation

use std::sync::{Arc, Mutex, MutexGuard};

use ledscene_core::{
    types::{FirmwareInfo, Pattern, PatternId, Scene, StripInfo},
    Error, Result, Token, TOKEN_LEN,
};

use crate::{
    control::{Request, Response},
    driver::StripDriver,
    gate::{check_for_activity, Activity},
    registry::Registry,
    scheduler::{lock, Scheduler},
    state::DeviceState,
    BoardConfig, Storage,
};

fn persist(what: &str, result: Result<()>) {
    if let Err(err) = result {
        log::error!("Unable to save {what}: {err}");
    }
}

/// LED scene controller.
///
/// Owns the registry, the device state, the storage and the rendering worker.
/// Every mutator validates and applies the change under the registry lock,
/// then persists it, re-evaluates the rendering activity and requests a
/// display update.
pub struct Controller<S: Storage, D: StripDriver> {
    firmware_info: FirmwareInfo,
    registry: Arc<Mutex<Registry>>,
    state: Arc<DeviceState>,
    storage: S,
    scheduler: Scheduler<D>,
}

impl<S: Storage, D: StripDriver> Controller<S, D> {
    /// Restores the persisted state and starts the rendering worker.
    pub fn new(board: &BoardConfig, mut storage: S, driver: D) -> anyhow::Result<Self> {
        let persisted = storage.load();
        log::info!(
            "Loaded {} patterns and {} scenes, selected scene {:?}",
            persisted.patterns.len(),
            persisted.scenes.len(),
            persisted.scenes.selected
        );

        let state = Arc::new(DeviceState::new(
            persisted.brightness,
            persisted.token,
            persisted.pin,
        ));
        let mut registry = Registry::new(board);
        if registry.restore(persisted.patterns, persisted.scenes) {
            persist("scenes", storage.save_scenes(&registry.scenes().scenes));
        }

        let activity = check_for_activity(&mut registry, state.brightness());
        let registry = Arc::new(Mutex::new(registry));
        let scheduler = Scheduler::start(
            driver,
            registry.clone(),
            state.clone(),
            board.frame_period,
            activity.is_active(),
        )?;

        Ok(Self {
            firmware_info: FirmwareInfo {
                hw_version: board.hw_version.clone(),
                sw_version: env!("CARGO_PKG_VERSION").to_owned(),
            },
            registry,
            state,
            storage,
            scheduler,
        })
    }

    pub fn state(&self) -> &Arc<DeviceState> {
        &self.state
    }

    /// Locks the registry for reading.
    ///
    /// Rendering is blocked while the guard is alive.
    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        lock(&self.registry)
    }

    pub fn scheduler(&self) -> &Scheduler<D> {
        &self.scheduler
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn firmware_info(&self) -> &FirmwareInfo {
        &self.firmware_info
    }

    /// Commits the deferred storage changes once their commit period is over.
    ///
    /// Meant to be called from the board main loop.
    pub fn sync_storage(&mut self) {
        persist("changes", self.storage.update(false));
    }

    fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> Result<R>) -> Result<R> {
        f(&mut lock(&self.registry))
    }

    /// Syncs the strips with the selected scene and parks or wakes the
    /// rendering worker accordingly.
    pub fn check_for_activity(&mut self) -> Activity {
        let brightness = self.state.brightness();
        let (activity, power) = {
            let mut registry = lock(&self.registry);
            let activity = check_for_activity(&mut registry, brightness);
            let power = registry
                .strips()
                .map(|surface| (surface.id(), surface.is_enabled()))
                .collect::<Vec<_>>();
            (activity, power)
        };

        match activity {
            Activity::Active => self.scheduler.resume(),
            Activity::Idle => {
                self.scheduler.suspend();
                self.scheduler.apply_power(power);
            }
        }
        activity
    }

    fn after_update(&mut self) {
        self.check_for_activity();
        self.state.notify_update();
    }

    /// Stops rendering, switches all strips off and commits every deferred
    /// storage change, so the board may be powered down afterwards.
    pub fn kill(&mut self) {
        log::info!("Switching all strips off");
        self.scheduler.suspend();
        persist("changes", self.storage.flush());

        let strips = {
            let mut registry = lock(&self.registry);
            registry.disable_all();
            registry.strips().map(|surface| surface.id()).collect::<Vec<_>>()
        };
        self.scheduler.apply_power(strips.into_iter().map(|id| (id, false)));
    }

    pub fn brightness(&self) -> u8 {
        self.state.brightness()
    }

    pub fn set_brightness(&mut self, brightness: u8) -> u8 {
        self.state.set_brightness(brightness);
        persist("brightness", self.storage.save_brightness(brightness));
        self.after_update();
        brightness
    }

    pub fn set_token(&mut self, token: Token) {
        self.state.set_token(token);
        persist("token", self.storage.save_token(&token));
    }

    pub fn set_pin(&mut self, pin: &str) -> Result<()> {
        self.state.set_pin(pin)?;
        persist("pin", self.storage.save_pin(pin));
        Ok(())
    }

    pub fn pattern_ids(&self) -> Vec<PatternId> {
        lock(&self.registry).pattern_ids()
    }

    pub fn pattern(&self, id: PatternId) -> Result<Pattern> {
        lock(&self.registry)
            .pattern(id)
            .cloned()
            .ok_or(Error::PatternNotFound)
    }

    pub fn add_pattern(&mut self, pattern: Pattern) -> Result<PatternId> {
        let stored = self.with_registry(|registry| {
            let id = registry.add_pattern(pattern)?;
            registry.pattern(id).cloned().ok_or(Error::PatternNotFound)
        })?;

        persist("pattern", self.storage.save_pattern(&stored));
        self.after_update();
        Ok(stored.id)
    }

    pub fn update_pattern(&mut self, id: PatternId, pattern: Pattern) -> Result<Pattern> {
        let stored = self.with_registry(|registry| {
            registry.update_pattern(id, pattern)?;
            registry.pattern(id).cloned().ok_or(Error::PatternNotFound)
        })?;

        persist("pattern", self.storage.save_pattern(&stored));
        self.after_update();
        Ok(stored)
    }

    pub fn remove_pattern(&mut self, id: PatternId) -> Result<()> {
        let changed_scenes = self.with_registry(|registry| {
            let changed = registry.remove_pattern(id)?;
            Ok(changed.then(|| registry.scenes().scenes.clone()))
        })?;

        persist("pattern", self.storage.remove_pattern(id));
        if let Some(scenes) = changed_scenes {
            persist("scenes", self.storage.save_scenes(&scenes));
        }
        self.after_update();
        Ok(())
    }

    pub fn scene_count(&self) -> u8 {
        lock(&self.registry).scene_count()
    }

    pub fn scene(&self, index: u8) -> Result<Scene> {
        lock(&self.registry)
            .scene(index)
            .cloned()
            .ok_or(Error::SceneNotFound)
    }

    pub fn selected_scene(&self) -> Option<u8> {
        lock(&self.registry).selected_scene_index()
    }

    pub fn add_scene(&mut self, scene: Scene) -> Result<u8> {
        let (index, scenes) = self.with_registry(|registry| {
            let index = registry.add_scene(scene)?;
            Ok((index, registry.scenes().scenes.clone()))
        })?;

        persist("scenes", self.storage.save_scenes(&scenes));
        self.after_update();
        Ok(index)
    }

    /// Removes a scene and returns the number of remaining scenes.
    pub fn remove_scene(&mut self, index: u8) -> Result<u8> {
        let table = self.with_registry(|registry| {
            registry.remove_scene(index)?;
            Ok(registry.scenes().clone())
        })?;

        persist("scenes", self.storage.save_scenes(&table.scenes));
        persist(
            "selected scene",
            self.storage.save_selected_scene(table.selected),
        );
        self.after_update();
        Ok(table.len() as u8)
    }

    pub fn update_scene(&mut self, index: u8, scene: Scene) -> Result<()> {
        let scenes = self.with_registry(|registry| {
            registry.update_scene(index, scene)?;
            Ok(registry.scenes().scenes.clone())
        })?;

        persist("scenes", self.storage.save_scenes(&scenes));
        self.after_update();
        Ok(())
    }

    pub fn select_scene(&mut self, index: u8) -> Result<()> {
        self.with_registry(|registry| registry.select_scene(index))?;

        persist(
            "selected scene",
            self.storage.save_selected_scene(Some(index)),
        );
        self.after_update();
        Ok(())
    }

    pub fn strips(&self) -> Vec<StripInfo> {
        lock(&self.registry).strip_infos()
    }

    /// Handles a control request frame.
    ///
    /// Frames with a missing or wrong token are dropped without a response.
    pub fn handle_request(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame.len() < TOKEN_LEN || !self.state.check_token(&frame[..TOKEN_LEN]) {
            log::error!("Dropping request with an invalid token");
            return None;
        }

        let result = Request::decode(&frame[TOKEN_LEN..]).and_then(|request| self.execute(request));
        if let Err(err) = &result {
            log::error!("Request rejected: {err}");
        }
        Some(Response::from(result).encode())
    }

    /// Executes a decoded control request.
    pub fn execute(&mut self, request: Request) -> Result<Response> {
        log::debug!("Executing request {:#04x}", request.opcode());

        let response = match request {
            Request::GetBrightness => Response::Brightness(self.brightness()),
            Request::SetBrightness(value) => Response::Brightness(self.set_brightness(value)),
            Request::SetToken(token) => {
                self.set_token(token);
                Response::Empty
            }
            Request::SetPin(pin) => {
                self.set_pin(&pin)?;
                Response::Empty
            }
            Request::GetFirmwareInfo => Response::FirmwareInfo(self.firmware_info.clone()),

            Request::ListPatterns => Response::PatternIds(self.pattern_ids()),
            Request::GetPattern(id) => Response::Pattern(self.pattern(id)?),
            Request::AddPattern(pattern) => Response::PatternAdded(self.add_pattern(pattern)?),
            Request::RemovePattern(id) => {
                self.remove_pattern(id)?;
                Response::Empty
            }
            Request::UpdatePattern(id, pattern) => {
                Response::Pattern(self.update_pattern(id, pattern)?)
            }

            Request::SceneCount => Response::SceneCount(self.scene_count()),
            Request::GetScene(index) => Response::Scene(index, self.scene(index)?),
            Request::AddScene(scene) => Response::SceneIndex(self.add_scene(scene)?),
            Request::RemoveScene(index) => Response::SceneCount(self.remove_scene(index)?),
            Request::UpdateScene(index, scene) => {
                self.update_scene(index, scene)?;
                Response::SceneIndex(index)
            }
            Request::SelectScene(index) => {
                self.select_scene(index)?;
                Response::SelectedScene(self.selected_scene())
            }
            Request::GetSelectedScene => Response::SelectedScene(self.selected_scene()),

            Request::StripInventory => Response::Strips(self.strips()),
        };
        Ok(response)
    }
}
