use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequence number for ordering events
pub type EventSequence = u64;

/// Upload pipeline event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    pub sequence: EventSequence,
    pub timestamp: DateTime<Utc>,
    pub payload: UploadEventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEventPayload {
    /// File accepted into the queue; its chunk requests are starting
    Enqueued {
        upload_id: String,
        filename: String,
        total_size: u64,
        total_chunks: usize,
    },

    /// One more chunk resolved successfully, in offset order
    Progress {
        upload_id: String,
        chunks_sent: usize,
        total_chunks: usize,
        progress: u8,
    },

    /// Every chunk resolved successfully
    Completed { upload_id: String },

    /// First observed chunk failure; the file is terminal
    Failed { upload_id: String, error: String },

    /// File listing re-fetched after a file reached a terminal state
    ListingRefreshed {
        upload_id: String,
        file_count: usize,
    },

    /// File listing re-fetch failed
    ListingRefreshFailed { upload_id: String, error: String },
}

impl UploadEvent {
    pub fn upload_id(&self) -> &str {
        match &self.payload {
            UploadEventPayload::Enqueued { upload_id, .. }
            | UploadEventPayload::Progress { upload_id, .. }
            | UploadEventPayload::Completed { upload_id }
            | UploadEventPayload::Failed { upload_id, .. }
            | UploadEventPayload::ListingRefreshed { upload_id, .. }
            | UploadEventPayload::ListingRefreshFailed { upload_id, .. } => upload_id,
        }
    }

    pub fn payload_type(&self) -> &str {
        match &self.payload {
            UploadEventPayload::Enqueued { .. } => "enqueued",
            UploadEventPayload::Progress { .. } => "progress",
            UploadEventPayload::Completed { .. } => "completed",
            UploadEventPayload::Failed { .. } => "failed",
            UploadEventPayload::ListingRefreshed { .. } => "listing_refreshed",
            UploadEventPayload::ListingRefreshFailed { .. } => "listing_refresh_failed",
        }
    }

    /// True once no further events follow for this upload
    pub fn is_listing_refresh(&self) -> bool {
        matches!(
            self.payload,
            UploadEventPayload::ListingRefreshed { .. }
                | UploadEventPayload::ListingRefreshFailed { .. }
        )
    }
}
