//! Drives one queued file through its chunk uploads.
//!
//! Chunk requests of a file are issued in offset order, at most
//! `max_in_flight` at a time, and their results are joined in the same
//! order. Progress only moves when the next chunk in order has resolved
//! successfully, so a fast late chunk never makes the file look further
//! along than it is.

use crate::api::{ChunkUpload, FilesResult, RemoteApi};
use crate::error::{DumpHubError, Result};
use crate::events::{EventBus, UploadEventPayload};
use crate::logging::{log_debug, log_error, log_info, log_warn, log_with_details};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use super::source::FileSource;
use super::task::SelectedFile;
use super::types::ChunkDescriptor;

pub(super) type SharedFiles = Arc<Mutex<IndexMap<String, SelectedFile>>>;
pub(super) type SharedListing = Arc<Mutex<Option<FilesResult>>>;

/// Result of applying one chunk outcome to the shared file record
enum Applied {
    Progress {
        chunks_sent: usize,
        total_chunks: usize,
        progress: u8,
        complete: bool,
    },
    Failed,
    Ignored,
}

#[derive(Clone)]
pub struct UploadProcessor {
    files: SharedFiles,
    listing: SharedListing,
    api: Arc<dyn RemoteApi>,
    events: EventBus,
    max_in_flight: usize,
}

impl UploadProcessor {
    pub fn new(
        files: SharedFiles,
        listing: SharedListing,
        api: Arc<dyn RemoteApi>,
        events: EventBus,
        max_in_flight: usize,
    ) -> Self {
        Self {
            files,
            listing,
            api,
            events,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Spawn the driver for a file already inserted into the queue
    pub fn start(&self, upload_id: String, descriptors: Vec<ChunkDescriptor>) -> JoinHandle<()> {
        let processor = self.clone();
        tokio::spawn(async move {
            processor.run(upload_id, descriptors).await;
        })
    }

    async fn run(&self, upload_id: String, descriptors: Vec<ChunkDescriptor>) {
        let Some((filename, source, total_size)) = self.begin(&upload_id, descriptors.len())
        else {
            log_error(
                "upload-queue",
                &format!("Upload {} vanished before it started", upload_id),
            )
            .unwrap_or_default();
            return;
        };

        // Permits are taken here, in descriptor order, so chunk requests go
        // out in offset order whatever order the runtime polls tasks in
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut pending: VecDeque<JoinHandle<Result<()>>> = VecDeque::new();
        let mut settled = Settled::default();

        for descriptor in &descriptors {
            let permit = Arc::clone(&semaphore).acquire_owned().await;
            pending.push_back(self.spawn_chunk(
                permit,
                ChunkRequest {
                    upload_id: upload_id.clone(),
                    filename: filename.clone(),
                    source: source.clone(),
                    total_size,
                    descriptor: *descriptor,
                },
            ));

            while pending.front().is_some_and(|handle| handle.is_finished()) {
                if let Some(handle) = pending.pop_front() {
                    self.settle(handle, &upload_id, &filename, &mut settled).await;
                }
            }
        }

        while let Some(handle) = pending.pop_front() {
            self.settle(handle, &upload_id, &filename, &mut settled).await;
        }
    }

    /// Apply the outcome of the next chunk in offset order
    async fn settle(
        &self,
        handle: JoinHandle<Result<()>>,
        upload_id: &str,
        filename: &str,
        settled: &mut Settled,
    ) {
        let index = settled.next_index;
        settled.next_index += 1;

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(DumpHubError::Other(format!("chunk task aborted: {}", e))),
        };

        if settled.terminal {
            // Already complete or failed, later outcomes are only recorded in the log
            if let Err(e) = outcome {
                log_debug(
                    "upload-queue",
                    &format!(
                        "Ignoring chunk {} outcome for finished upload {}: {}",
                        index, upload_id, e
                    ),
                )
                .unwrap_or_default();
            }
            return;
        }

        match outcome {
            Ok(()) => {
                if self.handle_chunk_success(upload_id, filename) {
                    settled.terminal = true;
                    self.refresh_listing(upload_id).await;
                }
            }
            Err(e) => {
                self.handle_chunk_failure(upload_id, filename, index, &e);
                settled.terminal = true;
                self.refresh_listing(upload_id).await;
            }
        }
    }

    /// Move the file to Uploading and hand back what the chunk tasks need
    fn begin(&self, upload_id: &str, total_chunks: usize) -> Option<(String, FileSource, u64)> {
        let started = {
            let mut files = self.files.lock().ok()?;
            let file = files.get_mut(upload_id)?;
            file.start();
            (file.filename.clone(), file.source.clone(), file.total_size)
        };

        let _ = self.events.publish(UploadEventPayload::Enqueued {
            upload_id: upload_id.to_string(),
            filename: started.0.clone(),
            total_size: started.2,
            total_chunks,
        });

        log_info(
            "upload-queue",
            &format!(
                "📤 Uploading {} ({} bytes in {} chunks)",
                started.0, started.2, total_chunks
            ),
        )
        .unwrap_or_default();

        Some(started)
    }

    fn spawn_chunk(
        &self,
        permit: std::result::Result<OwnedSemaphorePermit, AcquireError>,
        request: ChunkRequest,
    ) -> JoinHandle<Result<()>> {
        let api = Arc::clone(&self.api);

        tokio::spawn(async move {
            // Held until the request resolves
            let _permit =
                permit.map_err(|e| DumpHubError::Other(format!("chunk semaphore closed: {}", e)))?;

            let ChunkRequest {
                upload_id,
                filename,
                source,
                total_size,
                descriptor,
            } = request;

            let bytes = source
                .read_range(descriptor.offset, descriptor.length)
                .await
                .map_err(|e| {
                    DumpHubError::ChunkUpload(format!(
                        "failed to read chunk at offset {}: {}",
                        descriptor.offset, e
                    ))
                })?;

            api.upload_chunk(ChunkUpload {
                upload_id,
                filename,
                offset: descriptor.offset,
                total_size,
                bytes,
            })
            .await
        })
    }

    /// Returns true when this chunk completed the file
    fn handle_chunk_success(&self, upload_id: &str, filename: &str) -> bool {
        match self.apply(upload_id, |file| file.record_success()) {
            Applied::Progress {
                chunks_sent,
                total_chunks,
                progress,
                complete,
            } => {
                let _ = self.events.publish(UploadEventPayload::Progress {
                    upload_id: upload_id.to_string(),
                    chunks_sent,
                    total_chunks,
                    progress,
                });

                if complete {
                    let _ = self.events.publish(UploadEventPayload::Completed {
                        upload_id: upload_id.to_string(),
                    });
                    log_info("upload-queue", &format!("✓ Upload complete: {}", filename))
                        .unwrap_or_default();
                }
                complete
            }
            Applied::Failed | Applied::Ignored => false,
        }
    }

    fn handle_chunk_failure(
        &self,
        upload_id: &str,
        filename: &str,
        index: usize,
        error: &DumpHubError,
    ) {
        let message = error.failure_message();
        let recorded = self.apply(upload_id, |file| file.record_failure(message.clone()));

        if matches!(recorded, Applied::Failed) {
            let _ = self.events.publish(UploadEventPayload::Failed {
                upload_id: upload_id.to_string(),
                error: message.clone(),
            });
        }

        log_with_details(
            "upload-queue",
            "ERROR",
            &format!("✗ Upload failed: {} - Error: {}", filename, message),
            serde_json::json!({
                "uploadId": upload_id,
                "chunk": index,
                "error": message,
            }),
        )
        .unwrap_or_default();
    }

    fn apply(&self, upload_id: &str, transition: impl FnOnce(&mut SelectedFile) -> bool) -> Applied {
        let Ok(mut files) = self.files.lock() else {
            return Applied::Ignored;
        };
        let Some(file) = files.get_mut(upload_id) else {
            return Applied::Ignored;
        };

        if !transition(file) {
            return Applied::Ignored;
        }

        if file.error.is_some() {
            Applied::Failed
        } else {
            Applied::Progress {
                chunks_sent: file.chunks_sent,
                total_chunks: file.total_chunks,
                progress: file.progress,
                complete: file.complete,
            }
        }
    }

    /// Re-fetch the upload folder listing once a file is terminal
    async fn refresh_listing(&self, upload_id: &str) {
        match self.api.list_files().await {
            Ok(listing) => {
                let file_count = listing.files.len();
                if let Ok(mut latest) = self.listing.lock() {
                    *latest = Some(listing);
                }
                let _ = self.events.publish(UploadEventPayload::ListingRefreshed {
                    upload_id: upload_id.to_string(),
                    file_count,
                });
            }
            Err(e) => {
                log_warn(
                    "upload-queue",
                    &format!("⚠ Failed to refresh file listing: {}", e),
                )
                .unwrap_or_default();
                let _ = self.events.publish(UploadEventPayload::ListingRefreshFailed {
                    upload_id: upload_id.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Progress of the in-order join over a file's chunk tasks
#[derive(Default)]
struct Settled {
    next_index: usize,
    terminal: bool,
}

struct ChunkRequest {
    upload_id: String,
    filename: String,
    source: FileSource,
    total_size: u64,
    descriptor: ChunkDescriptor,
}
