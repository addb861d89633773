//! Serialized, coalescing delivery of control writes.
//!
//! Spawning the control tool is slow next to a slider drag. Per control,
//! at most one write is in flight and at most one edit waits behind it;
//! a newer edit replaces the waiting one. Writes for one control are never
//! reordered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lightbox_common::error::{LightboxError, LightboxResult};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::model::ControlChange;
use crate::tool::ControlTool;

#[derive(Debug, Default)]
struct Slot {
    in_flight: Option<i64>,
    queued: Option<i64>,
}

/// Per-control write bookkeeping, queue depth one.
#[derive(Debug, Default)]
pub struct CoalescingQueue {
    slots: HashMap<String, Slot>,
}

impl CoalescingQueue {
    /// Accept an edit. Returns the write to issue now when the control is
    /// idle; otherwise the edit replaces any queued one.
    pub fn submit(&mut self, change: ControlChange) -> Option<ControlChange> {
        let slot = self.slots.entry(change.identifier.clone()).or_default();
        if slot.in_flight.is_some() {
            if let Some(superseded) = slot.queued.replace(change.value) {
                tracing::trace!(
                    control = %change.identifier,
                    superseded,
                    value = change.value,
                    "Coalesced queued control edit"
                );
            }
            return None;
        }
        slot.in_flight = Some(change.value);
        Some(change)
    }

    /// Mark the in-flight write of `identifier` finished. Returns the queued
    /// follow-up, which is now in flight.
    pub fn complete(&mut self, identifier: &str) -> Option<ControlChange> {
        let slot = self.slots.get_mut(identifier)?;
        match slot.queued.take() {
            Some(value) => {
                slot.in_flight = Some(value);
                Some(ControlChange::new(identifier, value))
            }
            None => {
                self.slots.remove(identifier);
                None
            }
        }
    }

    pub fn in_flight(&self, identifier: &str) -> Option<i64> {
        self.slots.get(identifier).and_then(|s| s.in_flight)
    }

    pub fn queued(&self, identifier: &str) -> Option<i64> {
        self.slots.get(identifier).and_then(|s| s.queued)
    }

    pub fn is_idle(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Result of one issued write.
#[derive(Debug)]
pub struct WriteOutcome {
    pub change: ControlChange,
    pub result: LightboxResult<()>,
}

/// Actor that owns the write queue for one device.
///
/// Dropping the dispatcher stops intake; writes already accepted still
/// reach the device.
pub struct CommandDispatcher {
    device: PathBuf,
    edits: mpsc::UnboundedSender<ControlChange>,
    task: JoinHandle<()>,
}

impl CommandDispatcher {
    /// Start the dispatcher task. Every issued write reports on `outcomes`.
    pub fn spawn(
        device: PathBuf,
        tool: Arc<dyn ControlTool>,
        outcomes: mpsc::UnboundedSender<WriteOutcome>,
    ) -> Self {
        let (edits, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_dispatcher(device.clone(), tool, rx, outcomes));
        Self { device, edits, task }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn submit(&self, change: ControlChange) -> LightboxResult<()> {
        self.edits
            .send(change)
            .map_err(|rejected| LightboxError::ControlWriteFailed {
                identifier: rejected.0.identifier,
                exit_info: "control dispatcher has stopped".to_string(),
            })
    }

    /// Stop intake and wait until every accepted write has finished.
    pub async fn shutdown(self) {
        drop(self.edits);
        if let Err(e) = self.task.await {
            tracing::warn!(device = %self.device.display(), error = %e, "Control dispatcher join failed");
        }
    }
}

async fn run_dispatcher(
    device: PathBuf,
    tool: Arc<dyn ControlTool>,
    mut edits: mpsc::UnboundedReceiver<ControlChange>,
    outcomes: mpsc::UnboundedSender<WriteOutcome>,
) {
    let mut queue = CoalescingQueue::default();
    let mut writes: JoinSet<WriteOutcome> = JoinSet::new();
    let mut accepting = true;

    loop {
        tokio::select! {
            // Drain pending edits first so a burst collapses before the
            // follow-up write is chosen.
            biased;

            edit = edits.recv(), if accepting => match edit {
                Some(change) => {
                    if let Some(write) = queue.submit(change) {
                        spawn_write(&mut writes, &device, &tool, write);
                    }
                }
                None => accepting = false,
            },
            Some(joined) = writes.join_next() => match joined {
                Ok(outcome) => {
                    if let Some(next) = queue.complete(&outcome.change.identifier) {
                        spawn_write(&mut writes, &device, &tool, next);
                    }
                    if let Err(e) = &outcome.result {
                        tracing::warn!(device = %device.display(), error = %e, "Control write failed");
                    }
                    let _ = outcomes.send(outcome);
                }
                Err(e) => tracing::error!(device = %device.display(), error = %e, "Control write task aborted"),
            },
            else => break,
        }
    }

    tracing::debug!(device = %device.display(), idle = queue.is_idle(), "Control dispatcher stopped");
}

fn spawn_write(
    writes: &mut JoinSet<WriteOutcome>,
    device: &Path,
    tool: &Arc<dyn ControlTool>,
    change: ControlChange,
) {
    let device = device.to_path_buf();
    let tool = Arc::clone(tool);
    writes.spawn(async move {
        let result = tool.write_control(&device, &change).await;
        WriteOutcome { change, result }
    });
}
