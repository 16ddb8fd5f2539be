//! Fan-in of background module failures.

use crate::error::ConductorError;
use crate::module::Module;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Merged failure stream of every background module of a run.
///
/// One reader task per background module waits for that module's failure
/// and forwards it here. Dropping the handle aborts readers that are still
/// waiting.
pub struct BackgroundErrors {
    receiver: mpsc::Receiver<ConductorError>,
    _readers: JoinSet<()>,
}

impl BackgroundErrors {
    /// Next background failure.
    ///
    /// Returns `None` once every background module has exited cleanly.
    pub async fn next(&mut self) -> Option<ConductorError> {
        self.receiver.recv().await
    }
}

/// Start watching the background modules among `modules`.
///
/// Returns `None` when no module has the capability; callers treat that as
/// a source that never fires.
pub fn collect(modules: Vec<Arc<dyn Module>>) -> Option<BackgroundErrors> {
    let background: Vec<_> = modules
        .into_iter()
        .filter(|m| m.as_background().is_some())
        .collect();
    if background.is_empty() {
        return None;
    }

    // One slot per reader: a reader never blocks on send, even if nobody
    // is listening any more.
    let (sender, receiver) = mpsc::channel(background.len());
    let mut readers = JoinSet::new();

    for module in background {
        let sender = sender.clone();
        readers.spawn(async move {
            let Some(watched) = module.as_background() else {
                return;
            };
            if let Some(source) = watched.failure().await {
                let failure = ConductorError::Background {
                    module: module.name().to_string(),
                    source,
                };
                let _ = sender.try_send(failure);
            }
        });
    }

    tracing::debug!("watching {} background modules", readers.len());
    Some(BackgroundErrors {
        receiver,
        _readers: readers,
    })
}

/// First failure reported by any background module.
///
/// Never completes if there are no background modules or all of them exit
/// cleanly.
pub(crate) async fn first_failure(background: &mut Option<BackgroundErrors>) -> ConductorError {
    if let Some(errors) = background.as_mut() {
        if let Some(failure) = errors.next().await {
            return failure;
        }
        tracing::info!("all background modules exited cleanly");
    }
    std::future::pending().await
}
