//! The text input layer a session writes typing attributes into.

use std::sync::{Arc, Mutex, PoisonError};

use scribe_core::TypingAttributes;

/// Receives the attributes the next typed character should carry.
pub trait TextInputSurface: Send {
    fn set_typing_attributes(&mut self, attributes: &TypingAttributes);
}

/// Surface that remembers every write; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    writes: Arc<Mutex<Vec<TypingAttributes>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<TypingAttributes> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl TextInputSurface for RecordingSurface {
    fn set_typing_attributes(&mut self, attributes: &TypingAttributes) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*attributes);
    }
}
