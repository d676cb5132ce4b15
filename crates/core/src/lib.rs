//! Data model and binary records shared by the scene runtime, the control protocol
//! and the persisted-file store.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

pub use errors::{Error, Result};
pub use smart_leds::RGB8;

pub mod codec;
pub mod errors;
pub mod types;

/// Length of the shared-secret token that prefixes every control request.
pub const TOKEN_LEN: usize = 16;

/// Maximum length of the pairing PIN.
pub const PIN_MAX_LEN: usize = 8;

/// Sentinel byte used on the wire and in storage for "no scene selected".
pub const NO_SCENE: u8 = 0xFF;

/// Shared-secret token of the control protocol.
pub type Token = [u8; TOKEN_LEN];
