//! Preview session state machine.
//!
//! `CapturePipeline` is the only owner of the capture source. It sequences
//! every reconfiguration as stop, configure, start, discovers formats once
//! per device session, and schedules the debounced control discovery.
//!
//! Every start and stop opens a new run. Bus messages stamped with an
//! older run are dropped, so a late error from a device that was already
//! replaced cannot reset its successor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lightbox_common::error::{LightboxError, LightboxResult};
use lightbox_platform_linux::VideoDevice;
use serde::Serialize;

use crate::debounce::Debouncer;
use crate::format::{discover_formats, FormatDescriptor};
use crate::orientation::Orientation;
use crate::pipeline::{BusEvent, BusMessage, CaptureSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Stopped,
    Starting,
    Playing,
    ErrorRecovering,
}

/// Current user selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub device: Option<VideoDevice>,
    pub format: Option<FormatDescriptor>,
    pub orientation: Orientation,
}

/// What a bus event changed, for the caller to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineUpdate {
    /// Streaming. `formats` is set the first time per device session.
    Playing {
        formats: Option<Vec<FormatDescriptor>>,
    },
    /// The stream ended or failed; the selection is back to "no device".
    Reset { reason: String },
}

pub struct CapturePipeline<S: CaptureSource> {
    source: S,
    state: PipelineState,
    config: PipelineConfig,
    formats: Vec<FormatDescriptor>,
    formats_discovered: bool,
    discovery: Debouncer<PathBuf>,
    run: u64,
}

impl<S: CaptureSource> CapturePipeline<S> {
    pub fn new(source: S, discovery_delay: Duration) -> Self {
        Self {
            source,
            state: PipelineState::Stopped,
            config: PipelineConfig::default(),
            formats: Vec::new(),
            formats_discovered: false,
            discovery: Debouncer::new(discovery_delay),
            run: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn device(&self) -> Option<&VideoDevice> {
        self.config.device.as_ref()
    }

    pub fn device_path(&self) -> Option<&Path> {
        self.config.device.as_ref().map(|d| d.path.as_path())
    }

    /// Formats offered by the current device, richest first.
    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// Run the next bus message must carry to be acted on.
    pub fn run(&self) -> u64 {
        self.run
    }

    /// Device whose control discovery is waiting on the debounce.
    pub fn pending_discovery(&self) -> Option<&Path> {
        self.discovery.pending().map(PathBuf::as_path)
    }

    /// Switch to `device`, or to no device with `None`.
    pub fn select_device(&mut self, device: Option<VideoDevice>) -> LightboxResult<()> {
        self.stop()?;
        self.clear_device_session()?;

        match device {
            Some(device) => {
                tracing::info!(device = %device.display_name(), "Selecting capture device");
                self.source.set_device(&device.path)?;
                self.discovery.schedule(device.path.clone());
                self.config.device = Some(device);
                self.start()
            }
            None => {
                tracing::info!("Capture device cleared");
                self.discovery.cancel();
                self.config.device = None;
                Ok(())
            }
        }
    }

    /// Start streaming the selected device. Does nothing without one.
    pub fn start(&mut self) -> LightboxResult<()> {
        if self.config.device.is_none() {
            tracing::debug!("Start suppressed: no device selected");
            return Ok(());
        }
        if self.state != PipelineState::Stopped {
            return Ok(());
        }

        self.run += 1;
        self.state = PipelineState::Starting;
        if let Err(e) = self.source.start(self.run) {
            self.halt();
            return Err(e);
        }
        Ok(())
    }

    pub fn stop(&mut self) -> LightboxResult<()> {
        self.run += 1;
        self.source.stop()?;
        self.state = PipelineState::Stopped;
        Ok(())
    }

    /// Restart with the format at `index` of [`formats`](Self::formats).
    pub fn select_format(&mut self, index: usize) -> LightboxResult<()> {
        let format = self.formats.get(index).cloned().ok_or_else(|| {
            LightboxError::capture(format!(
                "Invalid format index {index}. {} formats available",
                self.formats.len()
            ))
        })?;

        tracing::info!(format = %format.label, "Selecting capture format");
        self.stop()?;
        self.source.set_format(Some(&format))?;
        self.config.format = Some(format);
        self.start()
    }

    pub fn select_orientation(&mut self, orientation: Orientation) -> LightboxResult<()> {
        tracing::info!(orientation = %orientation, "Selecting orientation");
        self.stop()?;
        self.source.set_orientation(orientation)?;
        self.config.orientation = orientation;
        self.start()
    }

    pub fn handle_bus_event(&mut self, message: BusMessage) -> Option<PipelineUpdate> {
        if message.run != self.run {
            tracing::debug!(
                run = message.run,
                current = self.run,
                event = ?message.event,
                "Dropping bus event from a finished run"
            );
            return None;
        }

        match message.event {
            BusEvent::Negotiated | BusEvent::Playing if self.state == PipelineState::Starting => {
                let formats = self.discover_formats_once();
                self.state = PipelineState::Playing;
                tracing::debug!(device = ?self.device_path(), "Preview playing");
                Some(PipelineUpdate::Playing { formats })
            }
            BusEvent::Negotiated | BusEvent::Playing => None,
            BusEvent::EndOfStream => Some(self.recover("end of stream".to_string())),
            BusEvent::Error { message, debug: details } => {
                tracing::error!(error = %message, debug = ?details, "Preview pipeline error");
                Some(self.recover(message))
            }
        }
    }

    /// Resolves with the device whose control discovery is due.
    pub async fn discovery_due(&mut self) -> PathBuf {
        self.discovery.fired().await
    }

    fn discover_formats_once(&mut self) -> Option<Vec<FormatDescriptor>> {
        if self.formats_discovered {
            return None;
        }
        self.formats_discovered = true;

        match self.source.capabilities() {
            Ok(entries) => {
                self.formats = discover_formats(&entries);
                Some(self.formats.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Capability query failed; no formats offered");
                None
            }
        }
    }

    fn recover(&mut self, reason: String) -> PipelineUpdate {
        self.state = PipelineState::ErrorRecovering;
        tracing::warn!(reason = %reason, "Resetting preview pipeline");

        self.halt();
        if let Err(e) = self.clear_device_session() {
            tracing::warn!(error = %e, "Failed to reset format during recovery");
        }
        self.discovery.cancel();
        self.config.device = None;

        self.state = PipelineState::Stopped;
        PipelineUpdate::Reset { reason }
    }

    /// Best-effort stop used on failure paths.
    fn halt(&mut self) {
        self.run += 1;
        if let Err(e) = self.source.stop() {
            tracing::warn!(error = %e, "Failed to stop preview pipeline");
        }
        self.state = PipelineState::Stopped;
    }

    fn clear_device_session(&mut self) -> LightboxResult<()> {
        self.formats.clear();
        self.formats_discovered = false;
        self.config.format = None;
        self.source.set_format(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CapabilityEntry, FrameRate};
    use crate::mock::{RecordingSource, SourceCall};

    const DELAY: Duration = Duration::from_millis(2000);

    fn c920() -> RecordingSource {
        RecordingSource::with_capabilities(vec![
            CapabilityEntry {
                media_type: "video/x-raw".to_string(),
                width: 640,
                height: 480,
                frame_rates: vec![FrameRate::new(30, 1)],
            },
            CapabilityEntry {
                media_type: "video/x-raw".to_string(),
                width: 1920,
                height: 1080,
                frame_rates: vec![FrameRate::new(30, 1), FrameRate::new(5, 1)],
            },
        ])
    }

    fn cam(node: &str) -> VideoDevice {
        VideoDevice::new("HD Pro Webcam C920", format!("/dev/{node}"))
    }

    fn deliver(
        pipeline: &mut CapturePipeline<RecordingSource>,
        event: BusEvent,
    ) -> Option<PipelineUpdate> {
        let run = pipeline.run();
        pipeline.handle_bus_event(BusMessage::new(run, event))
    }

    fn playing(source: &RecordingSource) -> CapturePipeline<RecordingSource> {
        let mut pipeline = CapturePipeline::new(source.clone(), DELAY);
        pipeline.select_device(Some(cam("video0"))).unwrap();
        deliver(&mut pipeline, BusEvent::Negotiated);
        source.clear();
        pipeline
    }

    #[test]
    fn selecting_device_stops_resets_format_and_starts() {
        let source = c920();
        let mut pipeline = CapturePipeline::new(source.clone(), DELAY);
        pipeline.select_device(Some(cam("video0"))).unwrap();

        assert_eq!(
            source.calls(),
            vec![
                SourceCall::Stop,
                SourceCall::SetFormat(None),
                SourceCall::SetDevice(PathBuf::from("/dev/video0")),
                SourceCall::Start,
            ]
        );
        assert_eq!(pipeline.state(), PipelineState::Starting);
        assert_eq!(pipeline.pending_discovery(), Some(Path::new("/dev/video0")));
    }

    #[test]
    fn neutral_device_never_starts() {
        let source = c920();
        let mut pipeline = CapturePipeline::new(source.clone(), DELAY);
        pipeline.select_device(None).unwrap();
        pipeline.start().unwrap();
        pipeline.select_orientation(Orientation::Rotate180).unwrap();

        assert_eq!(source.starts(), 0);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(pipeline.pending_discovery().is_none());
    }

    #[test]
    fn formats_are_discovered_once_per_device_session() {
        let source = c920();
        let mut pipeline = CapturePipeline::new(source.clone(), DELAY);
        pipeline.select_device(Some(cam("video0"))).unwrap();

        let first = deliver(&mut pipeline, BusEvent::Negotiated);
        let Some(PipelineUpdate::Playing { formats: Some(formats) }) = first else {
            panic!("expected formats, got {first:?}");
        };
        let labels: Vec<&str> = formats.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["1920 x 1080 @ 30 fps", "1920 x 1080 @ 5 fps", "640 x 480 @ 30 fps"]
        );
        assert_eq!(pipeline.state(), PipelineState::Playing);

        pipeline.select_format(2).unwrap();
        assert_eq!(
            deliver(&mut pipeline, BusEvent::Negotiated),
            Some(PipelineUpdate::Playing { formats: None })
        );
        assert_eq!(pipeline.formats().len(), 3);

        pipeline.select_device(Some(cam("video2"))).unwrap();
        assert!(pipeline.formats().is_empty());
        assert!(matches!(
            deliver(&mut pipeline, BusEvent::Negotiated),
            Some(PipelineUpdate::Playing { formats: Some(_) })
        ));
    }

    #[test]
    fn format_change_stops_before_reconfiguring() {
        let source = c920();
        let mut pipeline = playing(&source);
        pipeline.select_format(0).unwrap();

        assert_eq!(
            source.calls(),
            vec![
                SourceCall::Stop,
                SourceCall::SetFormat(Some(
                    "video/x-raw, width=(int)1920, height=(int)1080, framerate=(fraction)30/1"
                        .to_string()
                )),
                SourceCall::Start,
            ]
        );
        assert_eq!(pipeline.config().format.as_ref().map(|f| f.width), Some(1920));
    }

    #[test]
    fn out_of_range_format_is_rejected_without_restart() {
        let source = c920();
        let mut pipeline = playing(&source);

        assert!(pipeline.select_format(9).is_err());
        assert!(source.calls().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Playing);
    }

    #[test]
    fn orientation_change_restarts() {
        let source = c920();
        let mut pipeline = playing(&source);
        pipeline.select_orientation(Orientation::HorizontalFlip).unwrap();

        assert_eq!(
            source.calls(),
            vec![
                SourceCall::Stop,
                SourceCall::SetOrientation(Orientation::HorizontalFlip),
                SourceCall::Start,
            ]
        );
        assert_eq!(pipeline.config().orientation, Orientation::HorizontalFlip);
    }

    #[test]
    fn error_resets_to_no_device_and_stops() {
        let source = c920();
        let mut pipeline = playing(&source);

        let update = deliver(&mut pipeline, BusEvent::Error {
            message: "Device '/dev/video0' was disconnected".to_string(),
            debug: None,
        });

        assert_eq!(
            update,
            Some(PipelineUpdate::Reset {
                reason: "Device '/dev/video0' was disconnected".to_string()
            })
        );
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(pipeline.device().is_none());
        assert!(pipeline.formats().is_empty());
        assert!(pipeline.pending_discovery().is_none());
        assert_eq!(source.calls()[0], SourceCall::Stop);
        assert_eq!(source.starts(), 0);
    }

    #[test]
    fn end_of_stream_resets() {
        let source = c920();
        let mut pipeline = playing(&source);

        assert!(matches!(
            deliver(&mut pipeline, BusEvent::EndOfStream),
            Some(PipelineUpdate::Reset { .. })
        ));
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn negotiation_while_stopped_is_ignored() {
        let source = c920();
        let mut pipeline = CapturePipeline::new(source.clone(), DELAY);
        assert_eq!(deliver(&mut pipeline, BusEvent::Negotiated), None);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn late_error_from_replaced_device_is_dropped() {
        let source = c920();
        let mut pipeline = playing(&source);
        let video0_run = pipeline.run();

        pipeline.select_device(Some(cam("video2"))).unwrap();
        let late = BusMessage::new(
            video0_run,
            BusEvent::Error {
                message: "Device '/dev/video0' was disconnected".to_string(),
                debug: None,
            },
        );

        assert_eq!(pipeline.handle_bus_event(late), None);
        assert_eq!(pipeline.device_path(), Some(Path::new("/dev/video2")));
        assert_eq!(pipeline.state(), PipelineState::Starting);
        assert_eq!(source.run(), pipeline.run());
        assert!(matches!(
            deliver(&mut pipeline, BusEvent::Negotiated),
            Some(PipelineUpdate::Playing { formats: Some(_) })
        ));
    }

    #[test]
    fn every_start_and_stop_opens_a_new_run() {
        let source = c920();
        let mut pipeline = CapturePipeline::new(source.clone(), DELAY);
        pipeline.select_device(Some(cam("video0"))).unwrap();
        let first = pipeline.run();

        pipeline.stop().unwrap();
        assert!(pipeline.run() > first);
        let stale = BusMessage::new(first, BusEvent::EndOfStream);
        assert_eq!(pipeline.handle_bus_event(stale), None);
        assert_eq!(pipeline.device_path(), Some(Path::new("/dev/video0")));

        pipeline.start().unwrap();
        assert_eq!(source.run(), pipeline.run());
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_follows_last_selection() {
        let source = c920();
        let mut pipeline = CapturePipeline::new(source, DELAY);
        let started = tokio::time::Instant::now();

        pipeline.select_device(Some(cam("video0"))).unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        pipeline.select_device(Some(cam("video2"))).unwrap();

        assert_eq!(pipeline.discovery_due().await, PathBuf::from("/dev/video2"));
        assert!(started.elapsed() >= Duration::from_millis(2500));
        assert!(pipeline.pending_discovery().is_none());
    }
}
