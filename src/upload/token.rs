use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use tokio::sync::Notify;

use crate::{FiledockError, Result};

/// Control surface for an in-flight upload.
///
/// Cloneable and thread-safe; hand one to [`crate::Client::upload`] and keep
/// a clone to steer the transfer from elsewhere. Workers observe the token
/// between chunks: pause parks them, cancel makes the upload return
/// [`FiledockError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct UploadToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    paused: AtomicBool,
    cancelled: AtomicBool,
    notify: Notify,
}

impl UploadToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        info!("Pausing upload");
        self.inner.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        info!("Resuming upload");
        self.inner.paused.store(false, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn cancel(&self) {
        info!("Cancelling upload");
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Suspension point for upload workers. Returns once the token is
    /// neither paused nor cancelled; errors on cancellation.
    pub(crate) async fn checkpoint(&self) -> Result<()> {
        loop {
            if self.is_cancelled() {
                return Err(FiledockError::Cancelled);
            }
            if !self.is_paused() {
                return Ok(());
            }
            let notified = self.inner.notify.notified();
            // State may have flipped between the checks above and
            // registering the waiter.
            if self.is_cancelled() {
                return Err(FiledockError::Cancelled);
            }
            if !self.is_paused() {
                return Ok(());
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn checkpoint_passes_when_idle() {
        let token = UploadToken::new();
        token.checkpoint().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_fails_the_checkpoint() {
        let token = UploadToken::new();
        token.cancel();
        assert!(matches!(
            token.checkpoint().await,
            Err(FiledockError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn pause_parks_until_resume() {
        let token = UploadToken::new();
        token.pause();

        let parked = token.clone();
        let handle =
            tokio::spawn(async move { parked.checkpoint().await });

        // Still parked after a grace period.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        token.resume();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("checkpoint did not resume")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_unparks_paused_workers() {
        let token = UploadToken::new();
        token.pause();

        let parked = token.clone();
        let handle =
            tokio::spawn(async move { parked.checkpoint().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let result = timeout(Duration::from_secs(1), handle)
            .await
            .expect("checkpoint did not observe cancel")
            .unwrap();
        assert!(matches!(result, Err(FiledockError::Cancelled)));
    }
}
