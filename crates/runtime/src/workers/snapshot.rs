//! Periodic knowledge snapshots.
//!
//! The snapshot worker owns the only write path from the in-memory store to
//! the [`KnowledgeRepository`]. It flushes dirty species records
//!
//! - every `interval`,
//! - when asked through [`Command::Flush`],
//! - once more when the runtime shuts down.
//!
//! Flushing never blocks decisions: each record is serialized under its own
//! lock and written after the lock is released.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::knowledge::SpeciesKnowledgeStore;
use crate::repository::{KnowledgeRepository, RepositoryError};

/// Commands accepted by the snapshot worker.
pub enum Command {
    /// Flush dirty records now and report how many were written.
    Flush {
        reply: oneshot::Sender<Result<usize, RepositoryError>>,
    },

    /// Final flush, then stop.
    Shutdown,
}

/// Background task persisting the knowledge store.
pub struct SnapshotWorker {
    store: Arc<SpeciesKnowledgeStore>,
    repository: Arc<dyn KnowledgeRepository>,
    interval: Duration,
    command_rx: mpsc::Receiver<Command>,
}

impl SnapshotWorker {
    pub fn new(
        store: Arc<SpeciesKnowledgeStore>,
        repository: Arc<dyn KnowledgeRepository>,
        interval: Duration,
        command_rx: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            store,
            repository,
            interval,
            command_rx,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        info!(interval_ms = self.interval.as_millis() as u64, "snapshot worker started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.flush() {
                        error!(error = %e, "periodic snapshot failed");
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Flush { reply }) => {
                            let _ = reply.send(self.flush());
                        }
                        Some(Command::Shutdown) => {
                            debug!("shutdown command received");
                            break;
                        }
                        None => {
                            debug!("command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.flush() {
            error!(error = %e, "final snapshot failed");
        }
        info!("snapshot worker stopped");
    }

    fn flush(&self) -> Result<usize, RepositoryError> {
        let written = self.store.flush(self.repository.as_ref())?;
        if written > 0 {
            debug!(written, "knowledge snapshot written");
        }
        Ok(written)
    }
}

/// Sending half of the worker's command channel.
#[derive(Clone)]
pub struct SnapshotHandle {
    command_tx: mpsc::Sender<Command>,
}

impl SnapshotHandle {
    pub fn new(command_tx: mpsc::Sender<Command>) -> Self {
        Self { command_tx }
    }

    /// Requests an immediate flush.
    pub async fn flush(&self) -> crate::api::Result<usize> {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Flush { reply })
            .await
            .map_err(|_| crate::api::RuntimeError::CommandChannelClosed)?;
        let written = reply_rx
            .await
            .map_err(crate::api::RuntimeError::ReplyChannelClosed)??;
        Ok(written)
    }

    /// Asks the worker to stop after a final flush.
    pub async fn shutdown(&self) -> crate::api::Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| crate::api::RuntimeError::CommandChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use intelligence_core::{Action, LearningConfig, StateIndex};

    use super::*;
    use crate::knowledge::Transition;
    use crate::repository::InMemoryKnowledgeRepository;

    fn spawn(
        store: Arc<SpeciesKnowledgeStore>,
        repository: Arc<InMemoryKnowledgeRepository>,
        interval: Duration,
    ) -> (SnapshotHandle, tokio::task::JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(8);
        let worker = SnapshotWorker::new(store, repository, interval, command_rx);
        (SnapshotHandle::new(command_tx), tokio::spawn(worker.run()))
    }

    fn reward(store: &SpeciesKnowledgeStore, species: &str) {
        let state = StateIndex::new(1).unwrap();
        store.apply_reward(
            species,
            Transition {
                tick: 1,
                state,
                action: Action::Defend,
                reward: 1.0,
                next_state: Some(state),
            },
        );
    }

    #[tokio::test]
    async fn flush_on_demand_writes_dirty_records() {
        let store = Arc::new(SpeciesKnowledgeStore::new(LearningConfig::default()).unwrap());
        let repository = Arc::new(InMemoryKnowledgeRepository::new());
        let (handle, join) = spawn(store.clone(), repository.clone(), Duration::from_secs(3600));

        reward(&store, "orc");
        reward(&store, "goblin");
        assert_eq!(handle.flush().await.unwrap(), 2);
        assert_eq!(repository.len(), 2);
        assert_eq!(handle.flush().await.unwrap(), 0);

        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_flushes_pending_changes() {
        let store = Arc::new(SpeciesKnowledgeStore::new(LearningConfig::default()).unwrap());
        let repository = Arc::new(InMemoryKnowledgeRepository::new());
        let (handle, join) = spawn(store.clone(), repository.clone(), Duration::from_secs(3600));

        reward(&store, "wolf");
        handle.shutdown().await.unwrap();
        join.await.unwrap();

        assert_eq!(repository.len(), 1);
        assert_eq!(store.dirty_count(), 0);
        assert!(matches!(
            handle.flush().await,
            Err(crate::api::RuntimeError::CommandChannelClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_flushes_without_commands() {
        let store = Arc::new(SpeciesKnowledgeStore::new(LearningConfig::default()).unwrap());
        let repository = Arc::new(InMemoryKnowledgeRepository::new());
        let (handle, join) = spawn(store.clone(), repository.clone(), Duration::from_secs(30));

        reward(&store, "spider");
        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(repository.len(), 1);

        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }
}
