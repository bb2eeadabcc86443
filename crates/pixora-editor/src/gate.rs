//! Single-flight processing gate.
//!
//! At most one transformation runs at a time. While the gate is held, UI
//! surfaces show the gate's message and navigation away is refused.

use pixora_core::{PipelineError, PipelineResult};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a shared processing flag
#[derive(Debug, Clone, Default)]
pub struct ProcessingGate {
    inner: Arc<Mutex<Option<String>>>,
}

/// Holds the gate until dropped
#[derive(Debug)]
pub struct ProcessingGuard {
    inner: Arc<Mutex<Option<String>>>,
}

impl ProcessingGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Option<String>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the gate, or fail with `Busy` carrying the current holder's message
    pub fn try_acquire(&self, message: impl Into<String>) -> PipelineResult<ProcessingGuard> {
        let mut state = self.state();
        if let Some(current) = state.as_ref() {
            return Err(PipelineError::Busy(current.clone()));
        }
        let message = message.into();
        tracing::debug!(message = %message, "Processing started");
        *state = Some(message);

        Ok(ProcessingGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn is_processing(&self) -> bool {
        self.state().is_some()
    }

    /// Message of the operation in progress
    pub fn message(&self) -> Option<String> {
        self.state().clone()
    }

    pub fn can_navigate_away(&self) -> bool {
        !self.is_processing()
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(message) = state.take() {
            tracing::debug!(message = %message, "Processing finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let gate = ProcessingGate::new();
        let _guard = gate.try_acquire("Extending image...").unwrap();

        assert!(gate.is_processing());
        assert!(!gate.can_navigate_away());
        assert_eq!(gate.message().as_deref(), Some("Extending image..."));

        let err = gate.try_acquire("Removing background...").unwrap_err();
        assert_eq!(err, PipelineError::Busy("Extending image...".to_string()));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let gate = ProcessingGate::new();
        {
            let _guard = gate.clone().try_acquire("Cropping...").unwrap();
            assert!(gate.is_processing());
        }
        assert!(!gate.is_processing());
        assert!(gate.can_navigate_away());
        assert!(gate.try_acquire("Again").is_ok());
    }
}
