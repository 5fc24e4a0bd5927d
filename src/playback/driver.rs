use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

use crate::playback::{PlaybackEvent, PlaybackState, StoryPlaybackEngine};

pub type SharedEngine = Arc<Mutex<StoryPlaybackEngine>>;

fn lock(engine: &SharedEngine) -> MutexGuard<'_, StoryPlaybackEngine> {
    engine.lock().unwrap_or_else(|e| e.into_inner())
}

/// Drives [`StoryPlaybackEngine::tick`] from a tokio interval.
///
/// The driver is bound to the session that was open when it was spawned.
/// It stops on its own as soon as that session stops playing (paused,
/// closed, finished or replaced by a new `open`), and is aborted when
/// stopped or dropped. Navigation never leaves a paused session playing,
/// so only [`StoryPlaybackEngine::resume`] calls for a new driver.
pub struct TickDriver {
    handle: Option<JoinHandle<()>>,
}

impl TickDriver {
    pub fn spawn(
        engine: SharedEngine,
        period: Duration,
        events: Option<mpsc::UnboundedSender<PlaybackEvent>>,
    ) -> Self {
        // Bind to the session open right now, not whenever the task first runs
        let session = lock(&engine).session();

        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = timer.tick().await;

            loop {
                let now = timer.tick().await;
                let delta_ms = now.duration_since(last).as_millis() as u64;
                last = now;

                let event = {
                    let mut engine = lock(&engine);
                    if engine.session() != session || engine.state() != PlaybackState::Playing {
                        debug!("Tick driver for session {} stopping", session);
                        break;
                    }
                    engine.tick(delta_ms)
                };

                if let Some(tx) = &events {
                    if tx.send(event).is_err() {
                        debug!("Playback event receiver dropped, stopping tick driver");
                        break;
                    }
                }

                if matches!(event, PlaybackEvent::Closed(_)) {
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the driver to stop on its own.
    pub async fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("Tick driver task failed: {}", e);
                }
            }
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
