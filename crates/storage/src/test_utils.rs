//! Test helpers

use std::collections::BTreeMap;

use embedded_io::{ErrorKind, Io};

use crate::FileStore;

/// Error returned by a read-only [`MemoryFileStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOnlyError;

impl embedded_io::Error for ReadOnlyError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// In-memory file store.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: BTreeMap<String, Vec<u8>>,
    read_only: bool,
}

impl MemoryFileStore {
    /// Makes every subsequent write or remove fail.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Puts a file bypassing the read-only flag.
    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.to_owned(), bytes.into());
    }

    fn check_writable(&self) -> Result<(), ReadOnlyError> {
        if self.read_only {
            Err(ReadOnlyError)
        } else {
            Ok(())
        }
    }
}

impl Io for MemoryFileStore {
    type Error = ReadOnlyError;
}

impl FileStore for MemoryFileStore {
    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.files.get(path).cloned())
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check_writable()?;
        self.files.insert(path.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), Self::Error> {
        self.check_writable()?;
        self.files.remove(path);
        Ok(())
    }

    fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        Ok(self.files.contains_key(path))
    }

    fn list(&mut self) -> Result<Vec<String>, Self::Error> {
        Ok(self.files.keys().cloned().collect())
    }
}

#[test]
fn test_memory_file_store() {
    let mut store = MemoryFileStore::default();
    assert_eq!(store.read("/a").unwrap(), None);

    store.write("/a", b"some bytes").unwrap();
    assert!(store.exists("/a").unwrap());
    assert_eq!(store.read("/a").unwrap().as_deref(), Some(b"some bytes".as_slice()));

    store.set_read_only(true);
    assert_eq!(store.remove("/a"), Err(ReadOnlyError));
    store.set_read_only(false);
    store.remove("/a").unwrap();
    assert_eq!(store.list().unwrap(), Vec::<String>::new());
}
