//! Values paired with a change counter
//!
//! Consumers compare versions, never values: setting a value equal to the
//! previous one is still a change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    value: T,
    version: u64,
}

impl<T> Versioned<T> {
    pub fn new(value: T) -> Self {
        Self { value, version: 0 }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the value and bump the version unconditionally
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.version = self.version.wrapping_add(1);
    }
}
