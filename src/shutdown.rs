use std::sync::Arc;
use tokio::sync::watch;

/// Latched stop signal shared by background tasks (console printer, status poller)
///
/// Once `shutdown` is called the signal stays raised, so a listener created
/// afterwards still sees it.
///
/// ```no_run
/// use dumphub_client::shutdown::ShutdownCoordinator;
///
/// # async fn example() {
/// let coordinator = ShutdownCoordinator::new();
///
/// let mut stop = coordinator.listener();
/// let mut ticker = tokio::time::interval(std::time::Duration::from_secs(5));
/// loop {
///     tokio::select! {
///         _ = stop.wait() => break,
///         _ = ticker.tick() => { /* refresh */ }
///     }
/// }
///
/// // Elsewhere:
/// coordinator.shutdown();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    tx: Arc<watch::Sender<bool>>,
}

/// Waiting side of a [`ShutdownCoordinator`]
#[derive(Debug)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Raise the signal for every current and future listener
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Resolves once shutdown is raised, or when every coordinator is gone
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_shutdown_signal() {
        let coordinator = ShutdownCoordinator::new();
        let mut listener = coordinator.listener();

        let task = tokio::spawn(async move {
            listener.wait().await;
            "stopped"
        });

        coordinator.shutdown();

        let result = timeout(Duration::from_millis(100), task).await;
        assert_eq!(result.unwrap().unwrap(), "stopped");
    }

    #[tokio::test]
    async fn test_late_listener_sees_signal() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.shutdown();

        let mut listener = coordinator.listener();
        assert!(listener.is_shutdown());
        assert!(timeout(Duration::from_millis(100), listener.wait()).await.is_ok());
    }

    #[tokio::test]
    async fn test_clone_shares_signal() {
        let coordinator = ShutdownCoordinator::new();
        let other = coordinator.clone();
        let mut first = coordinator.listener();
        let mut second = other.listener();

        assert!(!coordinator.is_shutdown());
        other.shutdown();

        assert!(coordinator.is_shutdown());
        assert!(timeout(Duration::from_millis(100), first.wait()).await.is_ok());
        assert!(timeout(Duration::from_millis(100), second.wait()).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_coordinator_releases_listener() {
        let coordinator = ShutdownCoordinator::new();
        let mut listener = coordinator.listener();
        drop(coordinator);

        assert!(timeout(Duration::from_millis(100), listener.wait()).await.is_ok());
        assert!(!listener.is_shutdown());
    }
}
