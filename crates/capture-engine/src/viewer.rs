//! The viewer event loop.
//!
//! One task multiplexes user commands, pipeline bus messages, the debounced
//! control discovery, the listing it starts, and control write outcomes.
//! Everything the user should see comes out as a [`ViewerNotice`].
//!
//! A control listing runs alongside the loop. Selecting another device,
//! a pipeline reset, or shutdown drops it, which kills the tool process.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use lightbox_common::config::ControlsConfig;
use lightbox_common::error::LightboxResult;
use lightbox_controls::{
    discover_controls, CommandDispatcher, ControlChange, ControlDescriptor, ControlSet,
    ControlTool, WriteOutcome,
};
use lightbox_platform_linux::VideoDevice;
use tokio::sync::mpsc;

use crate::format::FormatDescriptor;
use crate::orientation::Orientation;
use crate::pipeline::{BusMessage, CaptureSource};
use crate::session::{CapturePipeline, PipelineUpdate};

#[derive(Debug, Clone)]
pub enum ViewerCommand {
    /// `None` selects the neutral "no device" entry.
    SelectDevice(Option<VideoDevice>),
    /// Index into the last [`ViewerNotice::FormatsAvailable`] list.
    SelectFormat(usize),
    SelectOrientation(Orientation),
    EditControl(ControlChange),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum ViewerNotice {
    DeviceSelected(Option<VideoDevice>),
    FormatsAvailable(Vec<FormatDescriptor>),
    Playing,
    ControlsAvailable(ControlSet),
    ControlDiscoveryFailed {
        device: PathBuf,
        reason: String,
    },
    /// The edit never reached the device.
    ControlRejected {
        identifier: String,
        reason: String,
    },
    ControlConfirmed(ControlChange),
    ControlWriteFailed {
        identifier: String,
        reason: String,
        /// Value the model fell back to, unless a newer edit is pending.
        reverted_to: Option<i64>,
    },
    PipelineReset {
        reason: String,
    },
    CaptureFailed {
        reason: String,
    },
}

/// Controls of the selected device.
struct DeviceControls {
    device: PathBuf,
    set: ControlSet,
    dispatcher: CommandDispatcher,
    outcomes: mpsc::UnboundedReceiver<WriteOutcome>,
}

type Discovery =
    Pin<Box<dyn Future<Output = (PathBuf, LightboxResult<Vec<ControlDescriptor>>)> + Send>>;

pub struct Viewer<S: CaptureSource> {
    pipeline: CapturePipeline<S>,
    tool: Arc<dyn ControlTool>,
    discovery_timeout: Duration,
    discovery: Option<Discovery>,
    controls: Option<DeviceControls>,
    notices: mpsc::UnboundedSender<ViewerNotice>,
}

impl<S: CaptureSource> Viewer<S> {
    pub fn new(
        pipeline: CapturePipeline<S>,
        tool: Arc<dyn ControlTool>,
    ) -> (Self, mpsc::UnboundedReceiver<ViewerNotice>) {
        let (notices, rx) = mpsc::unbounded_channel();
        (
            Self {
                pipeline,
                tool,
                discovery_timeout: ControlsConfig::default().discovery_timeout(),
                discovery: None,
                controls: None,
                notices,
            },
            rx,
        )
    }

    /// Bound on each control listing.
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Run until [`ViewerCommand::Shutdown`] or until `commands` closes.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ViewerCommand>,
        mut bus: mpsc::UnboundedReceiver<BusMessage>,
    ) {
        tracing::debug!("Viewer started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ViewerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(message) = bus.recv() => self.handle_bus_message(message),
                device = self.pipeline.discovery_due() => self.begin_discovery(device),
                (device, result) = next_discovery(&mut self.discovery) => {
                    self.discovery = None;
                    self.finish_discovery(device, result);
                }
                Some(outcome) = next_outcome(&mut self.controls) => self.handle_outcome(outcome),
            }
        }

        self.cancel_discovery();
        if let Err(e) = self.pipeline.stop() {
            tracing::warn!(error = %e, "Failed to stop preview on shutdown");
        }
        if let Some(controls) = self.controls.take() {
            controls.dispatcher.shutdown().await;
        }
        tracing::debug!("Viewer stopped");
    }

    fn handle_command(&mut self, command: ViewerCommand) {
        match command {
            ViewerCommand::SelectDevice(device) => {
                self.retire_controls();
                if let Err(e) = self.pipeline.select_device(device.clone()) {
                    self.capture_failed(e);
                }
                self.notify(ViewerNotice::DeviceSelected(device));
            }
            ViewerCommand::SelectFormat(index) => {
                if let Err(e) = self.pipeline.select_format(index) {
                    self.capture_failed(e);
                }
            }
            ViewerCommand::SelectOrientation(orientation) => {
                if let Err(e) = self.pipeline.select_orientation(orientation) {
                    self.capture_failed(e);
                }
            }
            ViewerCommand::EditControl(change) => self.edit_control(change),
            ViewerCommand::Shutdown => {}
        }
    }

    fn handle_bus_message(&mut self, message: BusMessage) {
        match self.pipeline.handle_bus_event(message) {
            Some(PipelineUpdate::Playing { formats }) => {
                if let Some(formats) = formats {
                    self.notify(ViewerNotice::FormatsAvailable(formats));
                }
                self.notify(ViewerNotice::Playing);
            }
            Some(PipelineUpdate::Reset { reason }) => {
                self.retire_controls();
                self.notify(ViewerNotice::PipelineReset { reason });
            }
            None => {}
        }
    }

    fn begin_discovery(&mut self, device: PathBuf) {
        tracing::debug!(device = %device.display(), "Listing device controls");
        let tool = Arc::clone(&self.tool);
        let timeout = self.discovery_timeout;
        self.discovery = Some(Box::pin(async move {
            let result = discover_controls(tool.as_ref(), &device, timeout).await;
            (device, result)
        }));
    }

    fn finish_discovery(
        &mut self,
        device: PathBuf,
        result: LightboxResult<Vec<ControlDescriptor>>,
    ) {
        if self.pipeline.device_path() != Some(device.as_path()) {
            tracing::debug!(device = %device.display(), "Discarding controls of deselected device");
            return;
        }

        match result {
            Ok(descriptors) => {
                let set = ControlSet::from_descriptors(descriptors);
                tracing::info!(device = %device.display(), surfaced = set.len(), "Controls ready");

                self.retire_controls();
                let (tx, outcomes) = mpsc::unbounded_channel();
                let dispatcher = CommandDispatcher::spawn(device.clone(), Arc::clone(&self.tool), tx);
                self.notify(ViewerNotice::ControlsAvailable(set.clone()));
                self.controls = Some(DeviceControls {
                    device,
                    set,
                    dispatcher,
                    outcomes,
                });
            }
            Err(e) => {
                tracing::warn!(device = %device.display(), error = %e, "Control discovery failed");
                self.notify(ViewerNotice::ControlDiscoveryFailed {
                    device,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn edit_control(&mut self, change: ControlChange) {
        let Some(controls) = self.controls.as_mut() else {
            self.notify(ViewerNotice::ControlRejected {
                identifier: change.identifier,
                reason: "no controls for the selected device".to_string(),
            });
            return;
        };

        let submitted = controls
            .set
            .edit(&change.identifier, change.value)
            .and_then(|accepted| controls.dispatcher.submit(accepted));
        if let Err(e) = submitted {
            tracing::debug!(control = %change.identifier, error = %e, "Control edit rejected");
            self.notify(ViewerNotice::ControlRejected {
                identifier: change.identifier,
                reason: e.to_string(),
            });
        }
    }

    fn handle_outcome(&mut self, outcome: WriteOutcome) {
        let Some(controls) = self.controls.as_mut() else {
            return;
        };
        let Some(model) = controls.set.get_mut(&outcome.change.identifier) else {
            return;
        };

        let notice = match outcome.result {
            Ok(()) => {
                model.confirm(outcome.change.value);
                ViewerNotice::ControlConfirmed(outcome.change)
            }
            Err(e) => {
                let reverted = model.revert_after_failure(outcome.change.value);
                tracing::warn!(
                    device = %controls.device.display(),
                    control = %outcome.change.identifier,
                    reverted,
                    "Control write failed"
                );
                ViewerNotice::ControlWriteFailed {
                    identifier: outcome.change.identifier,
                    reason: e.to_string(),
                    reverted_to: reverted.then(|| model.value()),
                }
            }
        };
        self.notify(notice);
    }

    /// Drop the current device's controls and any listing in flight.
    /// Accepted writes still finish.
    fn retire_controls(&mut self) {
        self.cancel_discovery();
        if let Some(controls) = self.controls.take() {
            tracing::debug!(device = %controls.device.display(), "Retiring device controls");
        }
    }

    fn cancel_discovery(&mut self) {
        if self.discovery.take().is_some() {
            tracing::debug!("Cancelled control listing in flight");
        }
    }

    fn capture_failed(&self, error: impl std::fmt::Display) {
        tracing::error!(error = %error, "Preview reconfiguration failed");
        self.notify(ViewerNotice::CaptureFailed {
            reason: error.to_string(),
        });
    }

    fn notify(&self, notice: ViewerNotice) {
        if self.notices.send(notice).is_err() {
            tracing::trace!("No notice listener");
        }
    }
}

async fn next_discovery(
    discovery: &mut Option<Discovery>,
) -> (PathBuf, LightboxResult<Vec<ControlDescriptor>>) {
    match discovery {
        Some(discovery) => discovery.await,
        None => std::future::pending().await,
    }
}

async fn next_outcome(controls: &mut Option<DeviceControls>) -> Option<WriteOutcome> {
    match controls {
        Some(controls) => controls.outcomes.recv().await,
        None => std::future::pending().await,
    }
}
