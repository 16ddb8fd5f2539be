use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Single-slot failure channel for background modules.
///
/// The background task calls [`report`](Self::report) when it fails or
/// [`close`](Self::close) when it exits cleanly; the module's
/// [`BackgroundModule::failure`](super::BackgroundModule::failure)
/// implementation forwards [`wait`](Self::wait).
///
/// ```rust,ignore
/// #[async_trait]
/// impl BackgroundModule for Consumer {
///     async fn failure(&self) -> Option<anyhow::Error> {
///         self.signal.wait().await
///     }
/// }
/// ```
#[derive(Debug)]
pub struct FailureSignal {
    sender: Mutex<Option<mpsc::Sender<anyhow::Error>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<anyhow::Error>>,
}

impl Default for FailureSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureSignal {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(1);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    /// Record a failure without blocking.
    ///
    /// Returns `false` if the signal was closed or a failure is already
    /// pending; the pending one wins.
    pub fn report(&self, error: impl Into<anyhow::Error>) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.try_send(error.into()).is_ok(),
            None => false,
        }
    }

    /// Mark the background work as finished. A pending failure is still
    /// delivered; after that, [`wait`](Self::wait) yields `None`.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Wait for the next reported failure, or `None` once closed.
    pub async fn wait(&self) -> Option<anyhow::Error> {
        self.receiver.lock().await.recv().await
    }
}
