//! Sync status tracking and notification.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use nexushub_common::ProviderKind;

/// Buffered status events per subscriber.
const EVENT_CAPACITY: usize = 32;

/// Phase of the most recent sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    /// No sync has run yet, or the last result was acknowledged.
    Idle,
    /// A sync is running.
    Syncing,
    /// The last sync finished.
    Success,
    /// The last sync aborted.
    Error,
}

/// Sync status of one provider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_syncing: bool,
    /// Percentage, 0 to 100.
    pub progress: u8,
    pub status: SyncPhase,
}

impl SyncStatus {
    pub fn idle() -> Self {
        Self {
            is_syncing: false,
            progress: 0,
            status: SyncPhase::Idle,
        }
    }

    /// Whether the status may be reset to idle.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, SyncPhase::Success | SyncPhase::Error)
    }

    fn begin(&mut self) {
        self.is_syncing = true;
        self.progress = 0;
        self.status = SyncPhase::Syncing;
    }

    fn advance(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    fn succeed(&mut self) {
        self.is_syncing = false;
        self.progress = 100;
        self.status = SyncPhase::Success;
    }

    /// Progress is left where the sync stopped.
    fn fail(&mut self) {
        self.is_syncing = false;
        self.status = SyncPhase::Error;
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// A status change, as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusEvent {
    pub storage_type: ProviderKind,
    pub status: SyncStatus,
}

/// Observable sync status owned by one provider instance.
///
/// The current value is available through [`SyncMonitor::watch`]; every
/// individual transition is published through [`SyncMonitor::subscribe`].
/// Concurrent syncs on one monitor interleave their updates.
pub struct SyncMonitor {
    storage_type: ProviderKind,
    state: watch::Sender<SyncStatus>,
    events: broadcast::Sender<SyncStatusEvent>,
}

impl SyncMonitor {
    pub fn new(storage_type: ProviderKind) -> Self {
        let (state, _) = watch::channel(SyncStatus::idle());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage_type,
            state,
            events,
        }
    }

    pub fn storage_type(&self) -> ProviderKind {
        self.storage_type
    }

    /// Snapshot of the current status.
    pub fn current(&self) -> SyncStatus {
        *self.state.borrow()
    }

    /// Receiver that always holds the latest status.
    pub fn watch(&self) -> watch::Receiver<SyncStatus> {
        self.state.subscribe()
    }

    /// Receiver for every status transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncStatusEvent> {
        self.events.subscribe()
    }

    /// Return a finished status to idle. No-op while a sync is running.
    pub fn reset(&self) -> bool {
        if !self.current().is_finished() {
            return false;
        }
        self.update(|s| *s = SyncStatus::idle());
        true
    }

    pub(crate) fn begin(&self) {
        self.update(SyncStatus::begin);
    }

    pub(crate) fn advance(&self, progress: u8) {
        self.update(|s| s.advance(progress));
    }

    pub(crate) fn succeed(&self) {
        self.update(SyncStatus::succeed);
    }

    pub(crate) fn fail(&self) {
        self.update(SyncStatus::fail);
    }

    fn update(&self, change: impl FnOnce(&mut SyncStatus)) {
        self.state.send_modify(change);
        let status = self.current();
        debug!(
            "{} sync status: {:?} {}%",
            self.storage_type, status.status, status.progress
        );

        // Nobody listening is fine.
        let _ = self.events.send(SyncStatusEvent {
            storage_type: self.storage_type,
            status,
        });
    }
}
