use tokio::sync::watch;

/// Caller side of a ceremony's abort signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Ceremony side of the abort signal. Cheap to clone; every clone observes
/// the same cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_handle, token) = CancelHandle::new();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle was dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, token) = CancelHandle::new();
        assert!(!token.is_cancelled());
        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must wake")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_wait_resolves_immediately() {
        let (handle, token) = CancelHandle::new();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already cancelled token must resolve");
    }

    #[tokio::test]
    async fn test_never_token_stays_pending() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        assert!(tokio::time::timeout(Duration::from_millis(20), token.cancelled())
            .await
            .is_err());
    }
}
