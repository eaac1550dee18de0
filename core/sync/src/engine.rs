//! Core sync engine that pushes backend files to a remote provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use nexushub_common::{FileDescriptor, Result};

use crate::diff::index_by_name;
use crate::status::SyncMonitor;

/// Progress reported once the local listing is known.
pub const PROGRESS_LOCAL_LISTED: u8 = 30;
/// Progress reported once the remote listing is known.
pub const PROGRESS_REMOTE_LISTED: u8 = 50;
/// Progress reported once every planned file was attempted.
pub const PROGRESS_TRANSFERRED: u8 = 80;

/// The two sides of a sync.
///
/// "Local" is the backend's own file store; "remote" is the provider being
/// synced to.
#[async_trait]
pub trait SyncEndpoints: Send + Sync {
    /// List the backend's files under `path`.
    async fn list_local(&self, path: &str) -> Result<Vec<FileDescriptor>>;

    /// List the provider's files under `path`.
    ///
    /// An empty listing is indistinguishable from "listing unsupported".
    async fn list_remote(&self, path: &str) -> Result<Vec<FileDescriptor>>;

    /// Fetch a backend file's content.
    async fn fetch_local(&self, file: &FileDescriptor) -> Result<Vec<u8>>;

    /// Upload content to the provider under `path`.
    async fn push_remote(&self, file: &FileDescriptor, data: Vec<u8>, path: &str) -> Result<()>;
}

/// Options for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Directory to sync; empty or absent means everything.
    pub path: Option<String>,
}

impl SyncOptions {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    /// Files uploaded because the provider did not have them.
    pub added: Vec<FileDescriptor>,
    /// Files re-uploaded because the local copy is newer.
    pub updated: Vec<FileDescriptor>,
    /// Always empty: sync never deletes from the provider.
    pub deleted: Vec<FileDescriptor>,
    /// Files whose transfer failed.
    pub skipped: usize,
}

/// Why a file is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadAction {
    Add,
    Update,
}

/// One file scheduled for upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedUpload<'a> {
    pub file: &'a FileDescriptor,
    pub action: UploadAction,
}

/// Decide which local files to upload, in local listing order.
///
/// With an empty remote listing every local file is added. Otherwise local
/// files missing remotely are added and local files newer than the same-name
/// remote file are updated.
pub fn plan_uploads<'a>(
    local: &'a [FileDescriptor],
    remote: &[FileDescriptor],
) -> Vec<PlannedUpload<'a>> {
    if remote.is_empty() {
        return local
            .iter()
            .map(|file| PlannedUpload {
                file,
                action: UploadAction::Add,
            })
            .collect();
    }

    let remote_index = index_by_name(remote);
    local
        .iter()
        .filter_map(|file| match remote_index.get(file.name()) {
            None => Some(PlannedUpload {
                file,
                action: UploadAction::Add,
            }),
            Some(existing) => match (file.updated_at, existing.updated_at) {
                (Some(local_at), Some(remote_at)) if local_at > remote_at => Some(PlannedUpload {
                    file,
                    action: UploadAction::Update,
                }),
                _ => None,
            },
        })
        .collect()
}

/// Runs one sync between two endpoints, reporting through a monitor.
///
/// Files are transferred one at a time. A failed transfer is logged and
/// counted in `skipped`; it is not retried. Listing failures abort the run.
pub struct SyncEngine<'a, E: SyncEndpoints + ?Sized> {
    endpoints: &'a E,
    monitor: &'a SyncMonitor,
}

impl<'a, E: SyncEndpoints + ?Sized> SyncEngine<'a, E> {
    pub fn new(endpoints: &'a E, monitor: &'a SyncMonitor) -> Self {
        Self { endpoints, monitor }
    }

    /// Run the sync to completion.
    ///
    /// # Postconditions
    /// - Status is `success` at 100% when `Ok` is returned
    /// - Status is `error` when `Err` is returned
    pub async fn run(&self, options: &SyncOptions) -> Result<SyncReport> {
        let start = Instant::now();
        let storage_type = self.monitor.storage_type();

        info!("Starting {} sync", storage_type);
        self.monitor.begin();

        match self.transfer(options).await {
            Ok(report) => {
                self.monitor.succeed();
                info!(
                    "{} sync completed in {:?}: uploaded {} files, updated {}, skipped {}",
                    storage_type,
                    start.elapsed(),
                    report.added.len(),
                    report.updated.len(),
                    report.skipped
                );
                Ok(report)
            }
            Err(e) => {
                self.monitor.fail();
                debug!("{} sync aborted: {}", storage_type, e);
                Err(e)
            }
        }
    }

    async fn transfer(&self, options: &SyncOptions) -> Result<SyncReport> {
        let path = options.path.as_deref().unwrap_or("");

        let local = self.endpoints.list_local(path).await?;
        self.monitor.advance(PROGRESS_LOCAL_LISTED);

        let remote = self.endpoints.list_remote(path).await?;
        if remote.is_empty() {
            // Cannot tell "no remote files" from "listing unsupported".
            warn!(
                "{} returned no remote files, uploading all {} local files",
                self.monitor.storage_type(),
                local.len()
            );
        }
        self.monitor.advance(PROGRESS_REMOTE_LISTED);

        let plan = plan_uploads(&local, &remote);
        debug!("Planned {} uploads out of {} local files", plan.len(), local.len());

        let mut report = SyncReport::default();
        for planned in plan {
            match self.transfer_one(planned.file, path).await {
                Ok(()) => match planned.action {
                    UploadAction::Add => report.added.push(planned.file.clone()),
                    UploadAction::Update => report.updated.push(planned.file.clone()),
                },
                Err(e) => {
                    warn!("Failed to sync file {}: {}", planned.file.file_name, e);
                    report.skipped += 1;
                }
            }
        }

        self.monitor.advance(PROGRESS_TRANSFERRED);
        Ok(report)
    }

    async fn transfer_one(&self, file: &FileDescriptor, path: &str) -> Result<()> {
        let data = self.endpoints.fetch_local(file).await?;
        self.endpoints.push_remote(file, data, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SyncPhase;
    use chrono::{TimeZone, Utc};
    use nexushub_common::{Error, FileId, ProviderKind};
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn file(id: u64, name: &str, updated_hour: u32) -> FileDescriptor {
        FileDescriptor {
            id: FileId::from(id),
            file_name: name.to_string(),
            path: format!("/docs/{}", name),
            updated_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, updated_hour, 0, 0).unwrap()),
            size: 4,
        }
    }

    #[derive(Default)]
    struct MockEndpoints {
        local: Vec<FileDescriptor>,
        remote: Vec<FileDescriptor>,
        fail_fetch: HashSet<String>,
        fail_push: HashSet<String>,
        fail_local_listing: bool,
        listed_paths: Mutex<Vec<String>>,
        pushed: Mutex<Vec<(String, Vec<u8>, String)>>,
    }

    #[async_trait]
    impl SyncEndpoints for MockEndpoints {
        async fn list_local(&self, path: &str) -> Result<Vec<FileDescriptor>> {
            self.listed_paths.lock().unwrap().push(path.to_string());
            if self.fail_local_listing {
                return Err(Error::from_status(500, None));
            }
            Ok(self.local.clone())
        }

        async fn list_remote(&self, _path: &str) -> Result<Vec<FileDescriptor>> {
            Ok(self.remote.clone())
        }

        async fn fetch_local(&self, file: &FileDescriptor) -> Result<Vec<u8>> {
            if self.fail_fetch.contains(&file.file_name) {
                return Err(Error::Network("connection reset".to_string()));
            }
            Ok(file.file_name.as_bytes().to_vec())
        }

        async fn push_remote(&self, file: &FileDescriptor, data: Vec<u8>, path: &str) -> Result<()> {
            if self.fail_push.contains(&file.file_name) {
                return Err(Error::from_status(500, None));
            }
            self.pushed
                .lock()
                .unwrap()
                .push((file.file_name.clone(), data, path.to_string()));
            Ok(())
        }
    }

    fn drain_progress(rx: &mut tokio::sync::broadcast::Receiver<crate::status::SyncStatusEvent>) -> Vec<u8> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.status.progress);
        }
        seen
    }

    #[tokio::test]
    async fn test_one_failed_upload_is_skipped() {
        let endpoints = MockEndpoints {
            local: vec![file(1, "file1.txt", 1), file(2, "file2.txt", 1), file(3, "file3.txt", 1)],
            fail_push: HashSet::from(["file3.txt".to_string()]),
            ..Default::default()
        };
        let monitor = SyncMonitor::new(ProviderKind::Qiniu);
        let mut events = monitor.subscribe();

        let report = SyncEngine::new(&endpoints, &monitor)
            .run(&SyncOptions::with_path("/docs"))
            .await
            .unwrap();

        assert_eq!(report.added, vec![endpoints.local[0].clone(), endpoints.local[1].clone()]);
        assert_eq!(report.skipped, 1);
        assert!(report.updated.is_empty());
        assert!(report.deleted.is_empty());

        let status = monitor.current();
        assert_eq!(status.status, SyncPhase::Success);
        assert!(!status.is_syncing);
        assert_eq!(drain_progress(&mut events), vec![0, 30, 50, 80, 100]);
    }

    #[tokio::test]
    async fn test_every_file_uploaded_when_remote_empty() {
        let endpoints = MockEndpoints {
            local: vec![file(1, "a.txt", 1), file(2, "b.txt", 1)],
            ..Default::default()
        };
        let monitor = SyncMonitor::new(ProviderKind::Qiniu);

        let report = SyncEngine::new(&endpoints, &monitor)
            .run(&SyncOptions::with_path("/docs"))
            .await
            .unwrap();

        assert_eq!(report.added.len(), 2);
        assert_eq!(report.skipped, 0);

        let pushed = endpoints.pushed.lock().unwrap();
        assert_eq!(pushed[0], ("a.txt".to_string(), b"a.txt".to_vec(), "/docs".to_string()));
        assert_eq!(pushed[1].0, "b.txt");
    }

    #[tokio::test]
    async fn test_skips_count_independently() {
        let endpoints = MockEndpoints {
            local: vec![file(1, "a.txt", 1), file(2, "b.txt", 1), file(3, "c.txt", 1)],
            fail_fetch: HashSet::from(["a.txt".to_string()]),
            fail_push: HashSet::from(["c.txt".to_string()]),
            ..Default::default()
        };
        let monitor = SyncMonitor::new(ProviderKind::Qiniu);

        let report = SyncEngine::new(&endpoints, &monitor)
            .run(&SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.added, vec![endpoints.local[1].clone()]);
        assert_eq!(endpoints.listed_paths.lock().unwrap().as_slice(), &["".to_string()]);
    }

    #[tokio::test]
    async fn test_listing_failure_sets_error() {
        let endpoints = MockEndpoints {
            fail_local_listing: true,
            ..Default::default()
        };
        let monitor = SyncMonitor::new(ProviderKind::Qiniu);
        let mut events = monitor.subscribe();

        let result = SyncEngine::new(&endpoints, &monitor)
            .run(&SyncOptions::default())
            .await;

        assert!(matches!(result, Err(Error::HttpStatus { status: 500, .. })));
        let status = monitor.current();
        assert_eq!(status.status, SyncPhase::Error);
        assert!(!status.is_syncing);

        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event.status.status);
        }
        assert_eq!(last, Some(SyncPhase::Error));
    }

    #[test]
    fn test_plan_against_non_empty_remote() {
        let local = vec![file(1, "new.txt", 5), file(2, "newer.txt", 9), file(3, "same.txt", 5)];
        let remote = vec![file(20, "newer.txt", 6), file(21, "same.txt", 5), file(22, "only-remote.txt", 1)];

        let plan = plan_uploads(&local, &remote);
        let summary: Vec<(&str, UploadAction)> =
            plan.iter().map(|p| (p.file.name(), p.action)).collect();

        assert_eq!(
            summary,
            vec![("new.txt", UploadAction::Add), ("newer.txt", UploadAction::Update)]
        );
    }

    #[tokio::test]
    async fn test_update_lands_in_updated() {
        let endpoints = MockEndpoints {
            local: vec![file(1, "doc.md", 9)],
            remote: vec![file(7, "doc.md", 3)],
            ..Default::default()
        };
        let monitor = SyncMonitor::new(ProviderKind::Qiniu);

        let report = SyncEngine::new(&endpoints, &monitor)
            .run(&SyncOptions::default())
            .await
            .unwrap();

        assert!(report.added.is_empty());
        assert_eq!(report.updated.len(), 1);
    }
}
