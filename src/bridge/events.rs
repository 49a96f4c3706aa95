//! Bridge event stream.
//!
//! Callers subscribe to a broadcast channel of typed events; dropping the
//! receiver unsubscribes, and destroying the bridge closes the channel for
//! every subscriber. Events never carry errors out-of-band — failures are
//! structured fields in the payloads.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::bridge::types::{ImportReport, Insight, SyncReport};

/// Events emitted by the bridge coordinator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum BridgeEvent {
    /// An insight was accepted and upserted into the store.
    #[serde(rename = "insight:recorded")]
    InsightRecorded { insight: Insight },
    /// A sync run finished; per-file errors ride inside the report.
    #[serde(rename = "sync:completed")]
    SyncCompleted { report: SyncReport },
    /// A sync run hit a fatal precondition (e.g. directory uncreatable).
    #[serde(rename = "sync:failed")]
    SyncFailed { error: String, duration_ms: u64 },
    /// An import run finished.
    #[serde(rename = "import:completed")]
    ImportCompleted { report: ImportReport },
    /// The index was regenerated.
    #[serde(rename = "index:curated")]
    IndexCurated { lines: usize },
}

/// Broadcast-backed emitter. Sends are fire-and-forget: a send with no
/// live receivers is not an error.
#[derive(Debug)]
pub struct EventEmitter {
    sender: std::sync::Mutex<Option<broadcast::Sender<BridgeEvent>>>,
}

impl EventEmitter {
    const CHANNEL_CAPACITY: usize = 64;

    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(Self::CHANNEL_CAPACITY);
        Self {
            sender: std::sync::Mutex::new(Some(tx)),
        }
    }

    /// Subscribe to future events. After [`close`](Self::close) the returned
    /// receiver reports `Closed` immediately.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        let guard = self.sender.lock().expect("event mutex poisoned");
        match guard.as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        }
    }

    pub fn emit(&self, event: BridgeEvent) {
        let guard = self.sender.lock().expect("event mutex poisoned");
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Drop the sender so every subscriber observes a closed channel.
    /// Idempotent.
    pub fn close(&self) {
        self.sender.lock().expect("event mutex poisoned").take();
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
