//! Single-slot guard for backend analyses
//!
//! The live loop and the voice handshake both take the slot before calling
//! the backend. The permit travels with the in-flight request and frees the
//! slot when dropped, including when the request task is aborted.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct AnalysisSlot {
    semaphore: Arc<Semaphore>,
}

/// Proof that the holder owns the slot
#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}

impl AnalysisSlot {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the slot if it is free
    pub fn try_acquire(&self) -> Option<SlotPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| SlotPermit { _permit: permit })
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for AnalysisSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_one_holder() {
        let slot = AnalysisSlot::new();
        let permit = slot.try_acquire();
        assert!(permit.is_some());
        assert!(slot.is_busy());
        assert!(slot.try_acquire().is_none());

        drop(permit);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_aborted_task_frees_slot() {
        let slot = AnalysisSlot::new();
        let permit = slot.try_acquire().unwrap();

        let task = tokio::spawn(async move {
            let _permit = permit;
            std::future::pending::<()>().await;
        });
        assert!(slot.is_busy());

        task.abort();
        let _ = task.await;
        assert!(!slot.is_busy());
    }
}
