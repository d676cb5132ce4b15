//! File based persistent storage of the LED scene controller.
//!
//! Changes are staged in a write-back cache and committed to the file store at
//! most once per commit period, so a burst of brightness updates costs a single
//! write. Call [`Storage::update`] periodically and [`Storage::flush`] before
//! powering down.

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use embedded_io::Io;
use ledscene_app::{
    codec::{decode_pattern, encode_pattern, encode_scenes, read_scene, Reader},
    types::{selection_from_byte, selection_to_byte, Pattern, PatternId, Scene, SceneTable},
    PersistedState, Pin, SceneError, SceneResult, Storage, Token, TOKEN_LEN,
};

pub use crate::defaults::{demo_board, FactoryDefaults, DEFAULT_PIN};

mod defaults;
#[cfg(any(test, feature = "std"))]
pub mod test_utils;

/// Well-known file paths.
pub mod paths {
    use ledscene_app::PatternId;

    pub const PIN: &str = "/pin";
    pub const TOKEN: &str = "/token";
    pub const BRIGHTNESS: &str = "/brightness";
    pub const SCENES: &str = "/scenes";
    pub const SELECTED_SCENE: &str = "/selected_scene";
    /// Marker of an already populated store.
    pub const INIT: &str = "/init";
    pub const PATTERN_PREFIX: &str = "/pattern_";

    pub fn pattern(id: PatternId) -> String {
        format!("{PATTERN_PREFIX}{id}")
    }

    /// Parses the pattern identifier out of a pattern file path.
    pub fn parse_pattern(path: &str) -> Option<PatternId> {
        path.strip_prefix(PATTERN_PREFIX)?.parse().ok().map(PatternId)
    }
}

/// Flat file system holding whole-file blobs.
pub trait FileStore: Io {
    /// Reads the whole file, returns `None` if there is no such file.
    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>, Self::Error>;
    /// Creates or replaces the file.
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), Self::Error>;
    /// Removes the file, removing a missing file is not an error.
    fn remove(&mut self, path: &str) -> Result<(), Self::Error>;
    fn exists(&mut self, path: &str) -> Result<bool, Self::Error>;
    /// Returns the paths of all stored files.
    fn list(&mut self) -> Result<Vec<String>, Self::Error>;
}

/// Storage usage summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStats {
    pub files: usize,
    pub used_bytes: usize,
}

/// [`Storage`] implementation over a [`FileStore`].
#[derive(Debug)]
pub struct FileStorage<F> {
    store: F,
    defaults: FactoryDefaults,
    /// Staged file contents, `None` stands for a removed file.
    pending: BTreeMap<String, Option<Vec<u8>>>,
    commit_period: Duration,
    last_commit: Instant,
}

impl<F: FileStore> FileStorage<F> {
    /// Minimal time between two commits of the staged changes.
    pub const DEFAULT_COMMIT_PERIOD: Duration = Duration::from_secs(10);

    /// Creates a storage with the demo factory defaults.
    pub fn new(store: F) -> Self {
        Self::with_defaults(store, FactoryDefaults::default())
    }

    pub fn with_defaults(store: F, defaults: FactoryDefaults) -> Self {
        Self {
            store,
            defaults,
            pending: BTreeMap::new(),
            commit_period: Self::DEFAULT_COMMIT_PERIOD,
            last_commit: Instant::now(),
        }
    }

    /// Sets the commit period, a zero period writes every change through.
    #[must_use]
    pub fn with_commit_period(mut self, commit_period: Duration) -> Self {
        self.commit_period = commit_period;
        self
    }

    /// Returns true if there are changes not yet committed to the store.
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn store(&self) -> &F {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut F {
        &mut self.store
    }

    pub fn into_inner(self) -> F {
        self.store
    }

    fn read_file(&mut self, path: &str) -> SceneResult<Option<Vec<u8>>> {
        if let Some(staged) = self.pending.get(path) {
            return Ok(staged.clone());
        }
        self.store.read(path).map_err(SceneError::storage_read)
    }

    fn write_file(&mut self, path: &str, bytes: &[u8]) -> SceneResult<()> {
        log::debug!("Writing {} bytes to {path}", bytes.len());
        self.store.write(path, bytes).map_err(SceneError::storage_write)
    }

    fn commit_file(&mut self, path: &str, bytes: Option<&[u8]>) -> SceneResult<()> {
        match bytes {
            Some(bytes) => self.write_file(path, bytes),
            None => {
                log::debug!("Removing {path}");
                self.store.remove(path).map_err(SceneError::storage_write)
            }
        }
    }

    // A newer change of the same file replaces the staged one.
    fn stage(&mut self, path: &str, bytes: Option<Vec<u8>>) -> SceneResult<()> {
        self.pending.insert(path.to_owned(), bytes);
        self.update(false)
    }

    fn commit(&mut self) -> SceneResult<()> {
        self.last_commit = Instant::now();
        let pending = std::mem::take(&mut self.pending);
        let total = pending.len();

        let mut entries = pending.into_iter();
        while let Some((path, bytes)) = entries.next() {
            if let Err(err) = self.commit_file(&path, bytes.as_deref()) {
                // Keep the failed change and the rest for the next attempt.
                self.pending.insert(path, bytes);
                self.pending.extend(entries);
                log::error!("Committed {} of {total} changes", total - self.pending.len());
                return Err(err);
            }
        }

        log::debug!("Committed {total} changes");
        Ok(())
    }

    /// Writes the factory defaults unless the store has already been populated.
    ///
    /// Returns true if the defaults have been written.
    pub fn init(&mut self) -> SceneResult<bool> {
        if self.store.exists(paths::INIT).map_err(SceneError::storage_read)? {
            return Ok(false);
        }

        log::info!("Store is not initialized, writing factory defaults");
        let defaults = self.defaults.clone();
        for pattern in &defaults.patterns {
            self.save_pattern(pattern)?;
        }
        self.save_scenes(&defaults.scenes.scenes)?;
        self.save_selected_scene(defaults.scenes.selected)?;
        self.save_brightness(defaults.brightness)?;
        self.save_pin(&defaults.pin)?;
        self.save_token(&defaults.token)?;
        self.flush()?;
        // The marker goes last, so an interrupted init is retried on the next boot.
        self.write_file(paths::INIT, &[])?;
        Ok(true)
    }

    /// Returns the number of files and the total payload size.
    pub fn stats(&mut self) -> SceneResult<StorageStats> {
        self.flush()?;
        let files = self.store.list().map_err(SceneError::storage_read)?;
        let mut stats = StorageStats::default();
        for path in files {
            stats.files += 1;
            stats.used_bytes += self.read_file(&path)?.map_or(0, |bytes| bytes.len());
        }
        Ok(stats)
    }

    fn load_patterns(&mut self) -> Vec<Pattern> {
        let files = match self.store.list() {
            Ok(files) => files,
            Err(err) => {
                SceneError::storage_read(err);
                return Vec::new();
            }
        };

        let mut patterns = Vec::new();
        for path in files {
            let Some(id) = paths::parse_pattern(&path) else {
                continue;
            };

            let bytes = match self.read_file(&path) {
                Ok(Some(bytes)) => bytes,
                Ok(None) | Err(_) => continue,
            };
            let mut pattern = match decode_pattern(&bytes) {
                Ok(pattern) => pattern,
                Err(err) => {
                    log::error!("Skipping malformed pattern {path}: {err}");
                    continue;
                }
            };

            if pattern.id != id {
                log::warn!("Pattern {path} has a mismatched id {}", pattern.id);
                pattern.id = id;
            }
            patterns.push(pattern);
        }
        patterns
    }

    fn load_scenes(&mut self) -> Vec<Scene> {
        let Ok(Some(bytes)) = self.read_file(paths::SCENES) else {
            log::warn!("There are no stored scenes");
            return Vec::new();
        };

        let mut reader = Reader::new(&bytes);
        let count = match reader.read_u8() {
            Ok(count) => count,
            Err(err) => {
                log::error!("Unable to read scene count: {err}");
                return Vec::new();
            }
        };

        let mut scenes = Vec::with_capacity(count as usize);
        for index in 0..count {
            match read_scene(&mut reader) {
                Ok(scene) => scenes.push(scene),
                // Record boundaries are lost after a malformed record.
                Err(err) => {
                    log::error!("Unable to load scene {index} of {count}: {err}");
                    break;
                }
            }
        }
        scenes
    }

    fn load_selected_scene(&mut self, scene_count: usize) -> Option<u8> {
        let bytes = self.read_file(paths::SELECTED_SCENE).ok().flatten()?;
        let selected = match bytes.as_slice() {
            [byte] => selection_from_byte(*byte),
            _ => {
                log::error!("Could not load selected scene");
                None
            }
        }?;

        if selected as usize >= scene_count {
            log::warn!("Selected scene {selected} is out of range");
            return None;
        }
        Some(selected)
    }

    fn load_brightness(&mut self) -> u8 {
        match self.read_file(paths::BRIGHTNESS).ok().flatten().as_deref() {
            Some([brightness]) => *brightness,
            _ => {
                log::error!("Could not load brightness");
                0
            }
        }
    }

    fn load_token(&mut self) -> Token {
        match self.read_file(paths::TOKEN).ok().flatten() {
            Some(bytes) if bytes.len() == TOKEN_LEN => {
                let mut token = Token::default();
                token.copy_from_slice(&bytes);
                token
            }
            _ => {
                log::error!("Could not load token");
                self.defaults.token
            }
        }
    }

    fn load_pin(&mut self) -> Pin {
        let pin = self
            .read_file(paths::PIN)
            .ok()
            .flatten()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .filter(|pin| !pin.is_empty())
            .and_then(|pin| {
                let mut value = Pin::new();
                value.push_str(&pin).ok()?;
                Some(value)
            });

        pin.unwrap_or_else(|| {
            log::error!("Could not load pin");
            self.defaults.pin.clone()
        })
    }
}

impl<F: FileStore> Storage for FileStorage<F> {
    fn load(&mut self) -> PersistedState {
        if let Err(err) = self.flush() {
            log::error!("Unable to commit staged changes: {err}");
        }
        if let Err(err) = self.init() {
            log::error!("Unable to write factory defaults: {err}");
        }

        let patterns = self.load_patterns();
        let scenes = self.load_scenes();
        let selected = self.load_selected_scene(scenes.len());
        PersistedState {
            brightness: self.load_brightness(),
            token: self.load_token(),
            pin: self.load_pin(),
            patterns,
            scenes: SceneTable { scenes, selected },
        }
    }

    fn save_pattern(&mut self, pattern: &Pattern) -> SceneResult<()> {
        let bytes = encode_pattern(pattern)?;
        self.stage(&paths::pattern(pattern.id), Some(bytes))
    }

    fn remove_pattern(&mut self, id: PatternId) -> SceneResult<()> {
        self.stage(&paths::pattern(id), None)
    }

    fn save_scenes(&mut self, scenes: &[Scene]) -> SceneResult<()> {
        let bytes = encode_scenes(scenes)?;
        self.stage(paths::SCENES, Some(bytes))
    }

    fn save_selected_scene(&mut self, selected: Option<u8>) -> SceneResult<()> {
        self.stage(paths::SELECTED_SCENE, Some(vec![selection_to_byte(selected)]))
    }

    fn save_brightness(&mut self, brightness: u8) -> SceneResult<()> {
        self.stage(paths::BRIGHTNESS, Some(vec![brightness]))
    }

    fn save_token(&mut self, token: &Token) -> SceneResult<()> {
        self.stage(paths::TOKEN, Some(token.to_vec()))
    }

    fn save_pin(&mut self, pin: &str) -> SceneResult<()> {
        self.stage(paths::PIN, Some(pin.as_bytes().to_vec()))
    }

    fn update(&mut self, force: bool) -> SceneResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if force || self.last_commit.elapsed() >= self.commit_period {
            self.commit()
        } else {
            Ok(())
        }
    }
}
