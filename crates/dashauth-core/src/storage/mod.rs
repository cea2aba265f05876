//! Local key-value storage scope.
//!
//! A flat string-to-string map scoped to one profile, playing the role
//! browser local storage plays for a web dashboard:
//! - `FileStorage`: one file per key in a storage directory, survives restarts
//! - `MemoryStorage`: process-local map, nothing touches disk
//!
//! `clear()` wipes the whole scope, not just one key.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

pub trait Storage: Send + Sync {
    /// Read a value. Missing or unreadable keys are `None`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any prior one. Readers never see a partial write.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str);

    /// All keys currently present, in sorted order.
    fn keys(&self) -> Vec<String>;

    /// Remove every key in the scope.
    fn clear(&self);
}
