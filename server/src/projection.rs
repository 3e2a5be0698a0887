//! Single-writer owner of the live store.
//!
//! One task holds the current [`StoreState`] and applies commands in arrival
//! order. Every new state is published through a `watch` channel, so readers
//! take a cheap `Arc` snapshot and never lock.

use std::sync::Arc;

use cachegrid_engine::{ApplyReport, ChangeSet, StoreState};
use tokio::sync::{mpsc, oneshot, watch};

/// A published version of the store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub state: Arc<StoreState>,
    /// Bumped on every published change
    pub version: u64,
    /// Bumped whenever the store is cleared, including by a cache image
    pub clear_epoch: u64,
}

/// Commands processed by the writer task.
#[derive(Debug)]
pub enum Command {
    Apply {
        changes: ChangeSet,
        reply: Option<oneshot::Sender<ApplyReport>>,
    },
    /// Replace the whole store with the given contents.
    ApplyImage {
        changes: ChangeSet,
        reply: Option<oneshot::Sender<ApplyReport>>,
    },
    Clear {
        reply: Option<oneshot::Sender<()>>,
    },
}

/// The writer task has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("projection writer has stopped")]
pub struct ProjectionClosed;

/// Handle to the writer task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Projection {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl Projection {
    /// Spawn the writer task on the current runtime.
    pub fn spawn(buffer: usize) -> Self {
        let (commands, command_rx) = mpsc::channel(buffer);
        let (snapshot_tx, snapshots) = watch::channel(Snapshot::default());

        tokio::spawn(run_writer(command_rx, snapshot_tx));

        Self {
            commands,
            snapshots,
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Apply a change-set and wait for its report.
    pub async fn apply(&self, changes: ChangeSet) -> Result<ApplyReport, ProjectionClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Apply {
            changes,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| ProjectionClosed)
    }

    /// Replace the store with a cache image and wait for its report.
    pub async fn apply_image(&self, changes: ChangeSet) -> Result<ApplyReport, ProjectionClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ApplyImage {
            changes,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| ProjectionClosed)
    }

    /// Clear the store and wait until the empty state is published.
    pub async fn clear(&self) -> Result<(), ProjectionClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Clear { reply: Some(reply) }).await?;
        rx.await.map_err(|_| ProjectionClosed)
    }

    async fn send(&self, command: Command) -> Result<(), ProjectionClosed> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ProjectionClosed)
    }
}

async fn run_writer(mut commands: mpsc::Receiver<Command>, snapshots: watch::Sender<Snapshot>) {
    let mut current = Snapshot::default();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Apply { changes, reply } => {
                let (state, report) = current.state.apply_with_report(&changes);
                tracing::debug!(
                    puts = report.puts,
                    removes = report.removes_applied,
                    touched = report.touched.len(),
                    added = report.added.len(),
                    removed = report.removed.len(),
                    "Applied change-set"
                );

                if !report.is_noop() {
                    current = Snapshot {
                        state: Arc::new(state),
                        version: current.version + 1,
                        clear_epoch: current.clear_epoch,
                    };
                    snapshots.send_replace(current.clone());
                }
                if let Some(reply) = reply {
                    let _ = reply.send(report);
                }
            }
            Command::ApplyImage { changes, reply } => {
                let (state, report) = StoreState::new().apply_with_report(&changes);
                tracing::info!(
                    records = state.record_count(),
                    types = state.types().len(),
                    "Loaded cache image"
                );

                current = Snapshot {
                    state: Arc::new(state),
                    version: current.version + 1,
                    clear_epoch: current.clear_epoch + 1,
                };
                snapshots.send_replace(current.clone());
                if let Some(reply) = reply {
                    let _ = reply.send(report);
                }
            }
            Command::Clear { reply } => {
                tracing::info!(
                    records = current.state.record_count(),
                    "Clearing projection"
                );

                current = Snapshot {
                    state: Arc::new(current.state.clear()),
                    version: current.version + 1,
                    clear_epoch: current.clear_epoch + 1,
                };
                snapshots.send_replace(current.clone());
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    tracing::debug!("Projection writer stopped");
}
