use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ItemId;
use crate::source::StoryViewApi;
use crate::views::{ViewKey, ViewLedger};

/// Message type for the background view worker
#[derive(Debug)]
pub enum ViewMessage {
    /// Report a story view to the backend
    Story(ItemId),
    /// Shutdown the worker
    Shutdown,
}

/// Records story views at most once per session.
///
/// The ledger check is synchronous; the network call is handed to a
/// background worker so playback never waits on it.
#[derive(Clone)]
pub struct ViewRecorder {
    ledger: Arc<ViewLedger>,
    tx: mpsc::Sender<ViewMessage>,
}

impl ViewRecorder {
    /// Create a recorder and the worker that serves it. The worker must be
    /// run (see [`ViewWorker::run`]) for views to reach the backend.
    pub fn new(
        ledger: Arc<ViewLedger>,
        api: Arc<dyn StoryViewApi + Send + Sync>,
        capacity: usize,
    ) -> (Self, ViewWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { ledger, tx }, ViewWorker { api, rx })
    }

    /// Returns true if this call recorded the view, false if the story was
    /// already viewed in this session.
    pub fn record_once(&self, id: &ItemId) -> bool {
        if !self.ledger.mark(ViewKey::story(id.clone())) {
            debug!("Story {} already viewed this session", id);
            return false;
        }

        if let Err(e) = self.tx.try_send(ViewMessage::Story(id.clone())) {
            warn!("Failed to queue view for story {}: {}", id, e);
        }
        true
    }

    pub fn has_viewed(&self, id: &ItemId) -> bool {
        self.ledger.contains(&ViewKey::story(id.clone()))
    }

    /// Shutdown the background worker
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ViewMessage::Shutdown).await;
    }
}

/// Background worker that reports queued story views.
pub struct ViewWorker {
    api: Arc<dyn StoryViewApi + Send + Sync>,
    rx: mpsc::Receiver<ViewMessage>,
}

impl ViewWorker {
    /// Runs until shut down or until every recorder has been dropped.
    pub async fn run(mut self) {
        debug!("Story view worker started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                ViewMessage::Story(id) => match self.api.view_story(&id).await {
                    Ok(()) => debug!("Recorded view for story {}", id),
                    Err(e) => warn!("Failed to record view for story {}: {}", id, e),
                },
                ViewMessage::Shutdown => {
                    info!("Story view worker shutting down");
                    break;
                }
            }
        }
    }
}

/// Spawn the view worker as a tokio task
pub fn spawn_view_worker(
    ledger: Arc<ViewLedger>,
    api: Arc<dyn StoryViewApi + Send + Sync>,
    capacity: usize,
) -> (ViewRecorder, JoinHandle<()>) {
    let (recorder, worker) = ViewRecorder::new(ledger, api, capacity);
    let handle = tokio::spawn(worker.run());
    (recorder, handle)
}
