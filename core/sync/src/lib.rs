//! NexusHub sync engine.
//!
//! This module provides one-directional, best-effort synchronization of the
//! backend's files to a remote storage provider:
//! - An observable sync status (watch + broadcast channels)
//! - Name-based diffing of two file listings
//! - A sequential upload engine that counts, logs and skips failed files

pub mod diff;
pub mod engine;
pub mod status;

// Re-export main types
pub use diff::{compare_files, FileDiff};
pub use engine::{plan_uploads, PlannedUpload, SyncEndpoints, SyncEngine, SyncOptions, SyncReport, UploadAction};
pub use status::{SyncMonitor, SyncPhase, SyncStatus, SyncStatusEvent};
