//! GStreamer preview pipeline.
//!
//! The graph is `v4l2src ! capsfilter ! videoconvert ! videoflip ! <sink>`.
//! The session drives it through the [`CaptureSource`] trait; bus messages
//! are forwarded to the event loop as [`BusMessage`]s.

use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use gst::prelude::*;
use gstreamer as gst;
use lightbox_common::error::{LightboxError, LightboxResult};
use tokio::sync::mpsc;

use crate::format::{CapabilityEntry, FormatDescriptor, FrameRate};
use crate::orientation::Orientation;

const PIPELINE_NAME: &str = "lightbox-preview";

/// Elements the preview graph needs besides the sink.
pub const REQUIRED_ELEMENTS: [&str; 4] = ["v4l2src", "capsfilter", "videoconvert", "videoflip"];

/// Bus notifications the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Pipeline reached PAUSED from READY; caps are negotiated.
    Negotiated,
    /// Pipeline reached PLAYING.
    Playing,
    EndOfStream,
    Error {
        message: String,
        debug: Option<String>,
    },
}

impl BusEvent {
    fn from_message(msg: &gst::Message) -> Option<Self> {
        match msg.view() {
            gst::MessageView::Eos(_) => Some(BusEvent::EndOfStream),
            gst::MessageView::Error(err) => Some(BusEvent::Error {
                message: err.error().to_string(),
                debug: err.debug().map(|d| d.to_string()),
            }),
            gst::MessageView::StateChanged(change) if from_pipeline(msg) => {
                match (change.old(), change.current()) {
                    (gst::State::Ready, gst::State::Paused) => Some(BusEvent::Negotiated),
                    (_, gst::State::Playing) => Some(BusEvent::Playing),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// A bus event stamped with the run that posted it.
///
/// The session numbers every start and stop, so events still queued from
/// an earlier device or configuration can be told apart and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub run: u64,
    pub event: BusEvent,
}

impl BusMessage {
    pub fn new(run: u64, event: BusEvent) -> Self {
        Self { run, event }
    }
}

fn from_pipeline(msg: &gst::Message) -> bool {
    msg.src()
        .is_some_and(|src| src.name().as_str() == PIPELINE_NAME)
}

/// The capture device as the session sees it.
///
/// Only the session may reconfigure or restart the source.
pub trait CaptureSource: Send {
    /// Point the source at a device node. Only valid while stopped.
    fn set_device(&mut self, device: &Path) -> LightboxResult<()>;

    /// Constrain the negotiated format; `None` accepts anything.
    fn set_format(&mut self, format: Option<&FormatDescriptor>) -> LightboxResult<()>;

    fn set_orientation(&mut self, orientation: Orientation) -> LightboxResult<()>;

    /// Begin streaming. Bus events posted from now on carry `run`.
    fn start(&mut self, run: u64) -> LightboxResult<()>;

    /// Stop streaming and release the device.
    fn stop(&mut self) -> LightboxResult<()>;

    /// Capability entries of the opened device.
    fn capabilities(&self) -> LightboxResult<Vec<CapabilityEntry>>;
}

pub struct GstPreviewPipeline {
    pipeline: gst::Pipeline,
    source: gst::Element,
    filter: gst::Element,
    flipper: gst::Element,
    run: Arc<AtomicU64>,
}

impl GstPreviewPipeline {
    /// Build the preview graph with the given sink factory. Bus events are
    /// delivered on the returned receiver.
    pub fn new(video_sink: &str) -> LightboxResult<(Self, mpsc::UnboundedReceiver<BusMessage>)> {
        init_gstreamer()?;

        let pipeline = gst::Pipeline::builder().name(PIPELINE_NAME).build();
        let source = make_element("v4l2src", "source")?;
        let filter = make_element("capsfilter", "filter")?;
        let convert = make_element("videoconvert", "convert")?;
        let flipper = make_element("videoflip", "flipper")?;
        let sink = make_element(video_sink, "sink")?;

        let elements = [&source, &filter, &convert, &flipper, &sink];
        pipeline
            .add_many(elements)
            .map_err(|e| LightboxError::capture(format!("Failed to assemble preview pipeline: {e}")))?;
        gst::Element::link_many(elements)
            .map_err(|e| LightboxError::capture(format!("Failed to link preview pipeline: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let run = Arc::new(AtomicU64::new(0));
        let stamp = Arc::clone(&run);
        let bus = pipeline
            .bus()
            .ok_or_else(|| LightboxError::capture("Preview pipeline has no bus"))?;
        // Runs on streaming threads; only forward.
        bus.set_sync_handler(move |_, msg| {
            if let Some(event) = BusEvent::from_message(msg) {
                let _ = tx.send(BusMessage::new(stamp.load(Ordering::Acquire), event));
            }
            gst::BusSyncReply::Drop
        });

        tracing::debug!(sink = video_sink, "Preview pipeline built");
        Ok((
            Self {
                pipeline,
                source,
                filter,
                flipper,
                run,
            },
            rx,
        ))
    }
}

impl CaptureSource for GstPreviewPipeline {
    fn set_device(&mut self, device: &Path) -> LightboxResult<()> {
        let device = device.to_string_lossy();
        self.source.set_property("device", device.as_ref());
        tracing::debug!(device = %device, "Source device set");
        Ok(())
    }

    fn set_format(&mut self, format: Option<&FormatDescriptor>) -> LightboxResult<()> {
        let caps = match format {
            Some(format) => gst::Caps::from_str(&format.caps_string()).map_err(|e| {
                LightboxError::capture(format!("Invalid caps for {}: {e}", format.label))
            })?,
            None => gst::Caps::new_any(),
        };
        self.filter.set_property("caps", &caps);
        Ok(())
    }

    fn set_orientation(&mut self, orientation: Orientation) -> LightboxResult<()> {
        self.flipper
            .set_property_from_str("video-direction", orientation.nick());
        Ok(())
    }

    fn start(&mut self, run: u64) -> LightboxResult<()> {
        self.run.store(run, Ordering::Release);
        self.pipeline.set_state(gst::State::Playing).map_err(|e| {
            LightboxError::capture(format!("Failed to start preview pipeline: {e:?}"))
        })?;
        Ok(())
    }

    fn stop(&mut self) -> LightboxResult<()> {
        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            LightboxError::capture(format!("Failed to stop preview pipeline: {e:?}"))
        })?;
        Ok(())
    }

    fn capabilities(&self) -> LightboxResult<Vec<CapabilityEntry>> {
        let pad = self
            .source
            .static_pad("src")
            .ok_or_else(|| LightboxError::capture("v4l2src has no src pad"))?;
        Ok(capability_entries(&pad.query_caps(None)))
    }
}

impl Drop for GstPreviewPipeline {
    fn drop(&mut self) {
        if let Some(bus) = self.pipeline.bus() {
            bus.unset_sync_handler();
        }
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

fn capability_entries(caps: &gst::CapsRef) -> Vec<CapabilityEntry> {
    caps.iter()
        .filter_map(|s| {
            // Unfixed sizes (ranges) cannot be offered as a mode.
            let width = s.get::<i32>("width").ok().and_then(|w| u32::try_from(w).ok())?;
            let height = s.get::<i32>("height").ok().and_then(|h| u32::try_from(h).ok())?;
            let frame_rates = s.value("framerate").map(frame_rates).unwrap_or_default();
            Some(CapabilityEntry {
                media_type: s.name().to_string(),
                width,
                height,
                frame_rates,
            })
        })
        .collect()
}

fn frame_rates(value: &gst::glib::SendValue) -> Vec<FrameRate> {
    let rates: Vec<gst::Fraction> = if let Ok(rate) = value.get::<gst::Fraction>() {
        vec![rate]
    } else if let Ok(list) = value.get::<gst::List>() {
        list.iter()
            .filter_map(|v| v.get::<gst::Fraction>().ok())
            .collect()
    } else if let Ok(range) = value.get::<gst::FractionRange>() {
        vec![range.max()]
    } else {
        Vec::new()
    };

    rates
        .into_iter()
        .filter(|r| r.denom() != 0 && r.numer() > 0)
        .map(|r| FrameRate::new(r.numer(), r.denom()))
        .collect()
}

fn make_element(factory: &str, name: &str) -> LightboxResult<gst::Element> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|e| LightboxError::capture(format!("Failed to create {factory} element: {e}")))
}

/// Element factories the preview graph needs that are not installed.
pub fn missing_elements(video_sink: &str) -> LightboxResult<Vec<String>> {
    init_gstreamer()?;
    Ok(REQUIRED_ELEMENTS
        .iter()
        .copied()
        .chain(std::iter::once(video_sink))
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .map(str::to_string)
        .collect())
}

fn init_gstreamer() -> LightboxResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(LightboxError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}
