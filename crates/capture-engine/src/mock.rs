//! Recording capture source for state machine tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lightbox_common::error::LightboxResult;

use crate::format::{CapabilityEntry, FormatDescriptor};
use crate::orientation::Orientation;
use crate::pipeline::{BusEvent, BusMessage, CaptureSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    SetDevice(PathBuf),
    /// Caps string, `None` for ANY.
    SetFormat(Option<String>),
    SetOrientation(Orientation),
    Start,
    Stop,
}

/// Clones share one call log, so a test can keep a handle after moving the
/// source into a pipeline.
#[derive(Debug, Clone, Default)]
pub struct RecordingSource {
    calls: Arc<Mutex<Vec<SourceCall>>>,
    run: Arc<AtomicU64>,
    capabilities: Vec<CapabilityEntry>,
}

impl RecordingSource {
    pub fn with_capabilities(capabilities: Vec<CapabilityEntry>) -> Self {
        Self {
            calls: Arc::default(),
            run: Arc::default(),
            capabilities,
        }
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn starts(&self) -> usize {
        self.calls().iter().filter(|c| **c == SourceCall::Start).count()
    }

    /// Run passed to the most recent start.
    pub fn run(&self) -> u64 {
        self.run.load(Ordering::SeqCst)
    }

    /// `event` as the bus of the current run would deliver it.
    pub fn post(&self, event: BusEvent) -> BusMessage {
        BusMessage::new(self.run(), event)
    }

    fn record(&self, call: SourceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CaptureSource for RecordingSource {
    fn set_device(&mut self, device: &Path) -> LightboxResult<()> {
        self.record(SourceCall::SetDevice(device.to_path_buf()));
        Ok(())
    }

    fn set_format(&mut self, format: Option<&FormatDescriptor>) -> LightboxResult<()> {
        self.record(SourceCall::SetFormat(format.map(FormatDescriptor::caps_string)));
        Ok(())
    }

    fn set_orientation(&mut self, orientation: Orientation) -> LightboxResult<()> {
        self.record(SourceCall::SetOrientation(orientation));
        Ok(())
    }

    fn start(&mut self, run: u64) -> LightboxResult<()> {
        self.run.store(run, Ordering::SeqCst);
        self.record(SourceCall::Start);
        Ok(())
    }

    fn stop(&mut self) -> LightboxResult<()> {
        self.record(SourceCall::Stop);
        Ok(())
    }

    fn capabilities(&self) -> LightboxResult<Vec<CapabilityEntry>> {
        Ok(self.capabilities.clone())
    }
}
