//! Navigation collaborator.
//!
//! The session store navigates after a successful login. It only sees the
//! [`Navigator`] trait; [`History`] is the in-process implementation used by
//! the binary and the tests.

use std::sync::{Mutex, PoisonError};

/// Something that can move the user to another route
pub trait Navigator: Send + Sync {
    /// Navigate to `path`
    fn navigate_to(&self, path: &str);
}

/// Navigation history kept in memory
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    /// Creates an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent route, if any
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    /// Every route navigated to, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for History {
    fn navigate_to(&self, path: &str) {
        tracing::info!(path, "Navigating");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
