use core::fmt::Debug;

use displaydoc::Display;

/// A specialized result type for the LED scene controller.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while validating, encoding or persisting entities.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Debug)]
#[repr(u8)]
pub enum Error {
    /// The referenced pattern does not exist.
    PatternNotFound = 1,
    /// The scene index is out of range.
    SceneNotFound = 2,
    /// The referenced strip does not exist.
    StripNotFound = 3,
    /// A pattern with the given identifier already exists.
    PatternExists = 4,
    /// There are no free pattern identifiers left.
    PatternIdsExhausted = 5,
    /// Animation speed must be greater than zero.
    InvalidAnimationSpeed = 6,
    /// The target buffer is too small for the record.
    BufferTooSmall = 7,
    /// The record ended before all of its fields were read.
    UnexpectedEof = 8,
    /// The record is malformed.
    Malformed = 9,
    /// The control token does not match.
    InvalidToken = 10,
    /// Unable to read bytes from storage.
    StorageRead = 11,
    /// Unable to write bytes to storage.
    StorageWrite = 12,
    /// The scene table has no room for another scene.
    SceneTableFull = 13,
    /// Unspecified or unknown error.
    Unspecified(u8),
}

impl Error {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::PatternNotFound,
            2 => Self::SceneNotFound,
            3 => Self::StripNotFound,
            4 => Self::PatternExists,
            5 => Self::PatternIdsExhausted,
            6 => Self::InvalidAnimationSpeed,
            7 => Self::BufferTooSmall,
            8 => Self::UnexpectedEof,
            9 => Self::Malformed,
            10 => Self::InvalidToken,
            11 => Self::StorageRead,
            12 => Self::StorageWrite,
            13 => Self::SceneTableFull,

            other => Self::Unspecified(other),
        }
    }

    pub fn into_code(self) -> u8 {
        match self {
            Error::PatternNotFound => 1,
            Error::SceneNotFound => 2,
            Error::StripNotFound => 3,
            Error::PatternExists => 4,
            Error::PatternIdsExhausted => 5,
            Error::InvalidAnimationSpeed => 6,
            Error::BufferTooSmall => 7,
            Error::UnexpectedEof => 8,
            Error::Malformed => 9,
            Error::InvalidToken => 10,
            Error::StorageRead => 11,
            Error::StorageWrite => 12,
            Error::SceneTableFull => 13,

            Error::Unspecified(other) => other,
        }
    }

    /// Creates a new storage read error.
    pub fn storage_read<E>(err: E) -> Self
    where
        E: Debug,
    {
        log::error!("Storage read failed: {err:?}");
        Self::StorageRead
    }

    /// Creates a new storage write error.
    pub fn storage_write<E>(err: E) -> Self
    where
        E: Debug,
    {
        log::error!("Storage write failed: {err:?}");
        Self::StorageWrite
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
