use super::{EventBus, UploadEvent, UploadEventPayload};
use crate::logging::{log_error, log_info};
use crate::shutdown::ShutdownCoordinator;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Handler that prints upload progress for the CLI
pub struct ConsoleEventHandler {
    event_bus: EventBus,
    shutdown: ShutdownCoordinator,
}

impl ConsoleEventHandler {
    pub fn new(event_bus: EventBus, shutdown: ShutdownCoordinator) -> Self {
        Self {
            event_bus,
            shutdown,
        }
    }

    /// Subscribe and start printing. Subscription happens before this
    /// returns, so events published afterwards are never missed.
    pub fn start(self) -> JoinHandle<()> {
        let mut rx = self.event_bus.subscribe();
        let mut shutdown = self.shutdown.listener();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                if let Some(line) = describe(&event) {
                                    println!("{}", line);
                                }
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                log_info("events", "Console handler stopped (event bus closed)").unwrap_or_default();
                                break;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                log_error("events", &format!("Console handler lagged {} events", n))
                                    .unwrap_or_default();
                            }
                        }
                    }
                    _ = shutdown.wait() => {
                        // Print whatever is already buffered before stopping
                        while let Ok(event) = rx.try_recv() {
                            if let Some(line) = describe(&event) {
                                println!("{}", line);
                            }
                        }
                        break;
                    }
                }
            }
        })
    }
}

/// One console line per event
pub fn describe(event: &UploadEvent) -> Option<String> {
    let line = match &event.payload {
        UploadEventPayload::Enqueued {
            filename,
            total_size,
            total_chunks,
            ..
        } => format!(
            "queued {} ({} bytes, {} chunks)",
            filename, total_size, total_chunks
        ),
        UploadEventPayload::Progress {
            upload_id,
            chunks_sent,
            total_chunks,
            progress,
        } => format!(
            "{} {:>3}% ({}/{})",
            short_id(upload_id),
            progress,
            chunks_sent,
            total_chunks
        ),
        UploadEventPayload::Completed { upload_id } => {
            format!("{} complete", short_id(upload_id))
        }
        UploadEventPayload::Failed { upload_id, error } => {
            format!("{} failed: {}", short_id(upload_id), error)
        }
        UploadEventPayload::ListingRefreshed { file_count, .. } => {
            format!("upload folder now holds {} file(s)", file_count)
        }
        UploadEventPayload::ListingRefreshFailed { .. } => return None,
    };
    Some(line)
}

fn short_id(upload_id: &str) -> &str {
    upload_id.get(..8).unwrap_or(upload_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::time::{timeout, Duration};

    fn event(payload: UploadEventPayload) -> UploadEvent {
        UploadEvent {
            sequence: 1,
            timestamp: Utc::now(),
            payload,
        }
    }

    #[test]
    fn test_describe_progress() {
        let line = describe(&event(UploadEventPayload::Progress {
            upload_id: "0123456789abcdef".to_string(),
            chunks_sent: 1,
            total_chunks: 3,
            progress: 34,
        }))
        .unwrap();
        assert_eq!(line, "01234567  34% (1/3)");
    }

    #[test]
    fn test_describe_failure() {
        let line = describe(&event(UploadEventPayload::Failed {
            upload_id: "abc".to_string(),
            error: "disk full".to_string(),
        }))
        .unwrap();
        assert_eq!(line, "abc failed: disk full");
    }

    #[tokio::test]
    async fn test_handler_stops_on_shutdown() {
        let bus = EventBus::new(16);
        let shutdown = ShutdownCoordinator::new();
        let handle = ConsoleEventHandler::new(bus.clone(), shutdown.clone()).start();

        bus.publish(UploadEventPayload::Completed {
            upload_id: "upload-1".to_string(),
        })
        .unwrap();
        shutdown.shutdown();

        let result = timeout(Duration::from_millis(500), handle).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_handler_started_after_shutdown_exits() {
        let bus = EventBus::new(16);
        let shutdown = ShutdownCoordinator::new();
        shutdown.shutdown();

        let handle = ConsoleEventHandler::new(bus, shutdown).start();
        let result = timeout(Duration::from_millis(500), handle).await;
        assert!(result.is_ok());
    }
}
