//! Local file persistence
//!
//! `readTextFile` / `writeTextFile` / `deleteFile`, used by cookie storage.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::NetError;

pub trait FileStore {
    fn read_text(&self, path: &str) -> Result<String, NetError>;

    fn write_text(&self, path: &str, text: &str) -> Result<(), NetError>;

    fn delete(&self, path: &str) -> Result<(), NetError>;
}

/// The host file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn read_text(&self, path: &str) -> Result<String, NetError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write_text(&self, path: &str, text: &str) -> Result<(), NetError> {
        tracing::debug!("Writing {} bytes to {}", text.len(), path);
        Ok(std::fs::write(path, text)?)
    }

    fn delete(&self, path: &str) -> Result<(), NetError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store; clones share the same files
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }
}

impl FileStore for MemoryFileStore {
    fn read_text(&self, path: &str) -> Result<String, NetError> {
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            NetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path),
            ))
        })
    }

    fn write_text(&self, path: &str, text: &str) -> Result<(), NetError> {
        self.files
            .borrow_mut()
            .insert(path.to_string(), text.to_string());
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), NetError> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }
}
