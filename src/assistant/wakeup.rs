//! The one pending timer of the live loop
//!
//! Scheduling a new wake-up cancels the previous one. Every wake-up carries
//! a generation so a message that was already queued when its timer was
//! superseded can be recognized and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

pub struct WakeUp<M> {
    tx: mpsc::UnboundedSender<M>,
    wrap: fn(u64) -> M,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> WakeUp<M> {
    /// `wrap` turns a generation into the message delivered on `tx`
    pub fn new(tx: mpsc::UnboundedSender<M>, wrap: fn(u64) -> M) -> Self {
        Self {
            tx,
            wrap,
            generation: 0,
            pending: None,
        }
    }

    pub fn schedule(&mut self, delay: Duration) {
        self.cancel();
        self.generation += 1;

        let message = (self.wrap)(self.generation);
        let tx = self.tx.clone();
        trace!(generation = self.generation, delay_ms = delay.as_millis() as u64, "wake-up scheduled");

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(message);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Claim a delivered wake-up. Returns false if it was superseded or
    /// cancelled after it fired.
    pub fn claim(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.pending.is_none() {
            return false;
        }
        self.pending = None;
        true
    }
}

impl<M> Drop for WakeUp<M> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
