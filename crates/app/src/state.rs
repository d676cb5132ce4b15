use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Mutex,
};

use ledscene_core::{Error, Result, Token, TOKEN_LEN};

use crate::{scheduler::lock, Pin};

/// Global device state, shared between the control path, the render worker
/// and the display.
#[derive(Debug)]
pub struct DeviceState {
    brightness: AtomicU8,
    token: Mutex<Token>,
    pin: Mutex<Pin>,
    display_dirty: AtomicBool,
}

impl DeviceState {
    pub fn new(brightness: u8, token: Token, pin: Pin) -> Self {
        Self {
            brightness: AtomicU8::new(brightness),
            token: Mutex::new(token),
            pin: Mutex::new(pin),
            display_dirty: AtomicBool::new(true),
        }
    }

    pub fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::Relaxed)
    }

    pub fn set_brightness(&self, brightness: u8) {
        self.brightness.store(brightness, Ordering::Relaxed);
        self.notify_update();
    }

    pub fn token(&self) -> Token {
        *lock(&self.token)
    }

    pub fn set_token(&self, token: Token) {
        *lock(&self.token) = token;
    }

    /// Compares the given bytes against the current token.
    pub fn check_token(&self, candidate: &[u8]) -> bool {
        candidate.len() == TOKEN_LEN && *lock(&self.token) == candidate
    }

    pub fn pin(&self) -> Pin {
        lock(&self.pin).clone()
    }

    /// Sets the pairing PIN.
    pub fn set_pin(&self, pin: &str) -> Result<()> {
        let mut value = Pin::new();
        value.push_str(pin).map_err(|()| Error::Malformed)?;

        *lock(&self.pin) = value;
        self.notify_update();
        Ok(())
    }

    /// Requests the display to redraw the state.
    pub fn notify_update(&self) {
        self.display_dirty.store(true, Ordering::Release);
    }

    /// Takes the pending display update request.
    pub fn take_display_update(&self) -> bool {
        self.display_dirty.swap(false, Ordering::AcqRel)
    }
}
