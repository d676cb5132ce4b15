//! LED scene controller application.
//!
//! Keeps the pattern and scene registries, renders the selected scene onto the
//! LED strips from a dedicated worker thread and serves the control protocol.

use std::time::Duration;

pub use ledscene_core::{
    codec,
    types::{self, FirmwareInfo, PatternId, StripId},
    Error as SceneError, Result as SceneResult, Token, PIN_MAX_LEN, TOKEN_LEN,
};
use ledscene_core::types::{Pattern, Scene, SceneTable};

pub use crate::{
    control::{Request, Response},
    controller::Controller,
    driver::{Frame, SmartLedsDriver, StripDriver},
    gate::Activity,
    registry::{Registry, NO_PATTERN},
    scheduler::{run_periodic, Scheduler},
    state::DeviceState,
    surface::{scale, PixelSurface},
};

pub mod control;
mod controller;
mod driver;
pub mod gate;
mod registry;
pub mod render;
mod scheduler;
mod state;
mod surface;

/// Pairing PIN shown on the device display.
pub type Pin = heapless::String<PIN_MAX_LEN>;

/// Static description of a strip wired to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripConfig {
    pub id: StripId,
    /// The number of LEDs in the strip, fixed for the strip lifetime.
    pub pixel_count: u16,
    pub name: String,
}

impl StripConfig {
    pub fn new(id: u8, pixel_count: u16, name: impl Into<String>) -> Self {
        Self {
            id: StripId(id),
            pixel_count,
            name: name.into(),
        }
    }
}

/// Board-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub strips: Vec<StripConfig>,
    /// Fixed period of the rendering loop.
    pub frame_period: Duration,
    /// Reported to the control clients along with the firmware version.
    pub hw_version: String,
}

impl BoardConfig {
    /// Default rendering period, 100 frames per second.
    pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(10);
    pub const DEFAULT_HW_VERSION: &'static str = "1.0";

    pub fn new(strips: Vec<StripConfig>) -> Self {
        Self {
            strips,
            frame_period: Self::DEFAULT_FRAME_PERIOD,
            hw_version: Self::DEFAULT_HW_VERSION.to_owned(),
        }
    }

    #[must_use]
    pub fn with_hw_version(mut self, hw_version: impl Into<String>) -> Self {
        self.hw_version = hw_version.into();
        self
    }

    #[must_use]
    pub fn with_frame_period(mut self, frame_period: Duration) -> Self {
        self.frame_period = frame_period;
        self
    }
}

/// Everything the application restores at boot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersistedState {
    pub brightness: u8,
    pub token: Token,
    pub pin: Pin,
    pub patterns: Vec<Pattern>,
    pub scenes: SceneTable,
}

/// Board persistent storage.
///
/// Saves are invoked after the registry lock has been released, failures are
/// logged by the caller and never roll back the in-memory state.
pub trait Storage {
    /// Loads the persisted state.
    ///
    /// # Notice for the board developers
    ///
    /// - Malformed records must be skipped rather than failing the whole load.
    fn load(&mut self) -> PersistedState;
    /// Saves or replaces a pattern.
    fn save_pattern(&mut self, pattern: &Pattern) -> SceneResult<()>;
    /// Removes a stored pattern.
    fn remove_pattern(&mut self, id: PatternId) -> SceneResult<()>;
    /// Replaces the stored scene list.
    fn save_scenes(&mut self, scenes: &[Scene]) -> SceneResult<()>;
    /// Saves the selected scene index.
    fn save_selected_scene(&mut self, selected: Option<u8>) -> SceneResult<()>;
    /// Saves the global brightness.
    fn save_brightness(&mut self, brightness: u8) -> SceneResult<()>;
    /// Saves the control protocol token.
    fn save_token(&mut self, token: &Token) -> SceneResult<()>;
    /// Saves the pairing PIN.
    fn save_pin(&mut self, pin: &str) -> SceneResult<()>;

    /// Commits the deferred changes.
    ///
    /// Implementations may batch saves and write them out only once in a
    /// while, unless `force` is set.
    fn update(&mut self, _force: bool) -> SceneResult<()> {
        Ok(())
    }

    /// Commits all deferred changes right away.
    fn flush(&mut self) -> SceneResult<()> {
        self.update(true)
    }
}

impl<T: Storage + ?Sized> Storage for &mut T {
    fn load(&mut self) -> PersistedState {
        T::load(self)
    }

    fn save_pattern(&mut self, pattern: &Pattern) -> SceneResult<()> {
        T::save_pattern(self, pattern)
    }

    fn remove_pattern(&mut self, id: PatternId) -> SceneResult<()> {
        T::remove_pattern(self, id)
    }

    fn save_scenes(&mut self, scenes: &[Scene]) -> SceneResult<()> {
        T::save_scenes(self, scenes)
    }

    fn save_selected_scene(&mut self, selected: Option<u8>) -> SceneResult<()> {
        T::save_selected_scene(self, selected)
    }

    fn save_brightness(&mut self, brightness: u8) -> SceneResult<()> {
        T::save_brightness(self, brightness)
    }

    fn save_token(&mut self, token: &Token) -> SceneResult<()> {
        T::save_token(self, token)
    }

    fn save_pin(&mut self, pin: &str) -> SceneResult<()> {
        T::save_pin(self, pin)
    }

    fn update(&mut self, force: bool) -> SceneResult<()> {
        T::update(self, force)
    }

    fn flush(&mut self) -> SceneResult<()> {
        T::flush(self)
    }
}
