//! Cancellable repeating status refresh.
//!
//! The poller fetches one page of analysis status on every tick and hands
//! the result to its owner over a channel. Cancelling (or dropping the
//! handle) stops the timer. A fetch already in flight still completes, and
//! its result is delivered unless the owner stops reading first.

use crate::api::{RemoteApi, StatusResult};
use crate::logging::{log_debug, log_warn};
use crate::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const RESULT_CHANNEL_CAPACITY: usize = 8;

pub struct StatusPoller {
    api: Arc<dyn RemoteApi>,
    page: u32,
    interval: Duration,
}

/// Owner side of a running poller. Dropping it cancels the poll.
pub struct PollHandle {
    shutdown: ShutdownCoordinator,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn RemoteApi>, page: u32, interval: Duration) -> Self {
        Self {
            api,
            page,
            interval,
        }
    }

    /// Start polling. The first fetch happens immediately.
    pub fn spawn(self) -> (PollHandle, mpsc::Receiver<StatusResult>) {
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let shutdown = ShutdownCoordinator::new();
        let mut stop = shutdown.listener();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop.wait() => break,
                    _ = ticker.tick() => {}
                }

                match self.api.get_status(self.page).await {
                    Ok(result) => {
                        // A full channel must not hold off cancellation
                        tokio::select! {
                            biased;
                            _ = stop.wait() => break,
                            sent = tx.send(result) => {
                                if sent.is_err() {
                                    // Receiver gone, nobody is watching anymore
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        log_warn("poller", &format!("Status refresh failed: {}", e))
                            .unwrap_or_default();
                    }
                }
            }

            log_debug("poller", "Status poller stopped").unwrap_or_default();
        });

        (
            PollHandle {
                shutdown,
                task: Some(task),
            },
            rx,
        )
    }
}

impl PollHandle {
    /// Stop the recurring timer
    pub fn cancel(&self) {
        self.shutdown.shutdown();
    }

    /// Cancel and wait for the poll task to finish
    pub async fn stop(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}
