//! Process-wide notification log
//!
//! An ordered, append-only list of user-visible messages. Insertion order is
//! display order; nothing is deduplicated or bounded. Unrelated to row state.

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct ErrorLog {
    inner: Mutex<Vec<String>>,
}

impl ErrorLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end
    pub fn append(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "insu_sync::error_log", "{message}");
        self.inner.lock().push(message);
    }

    /// Remove every message
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Snapshot of all messages in display order
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
