//! Lightbox Capture Engine
//!
//! Drives the live preview of a Video4Linux device and keeps the device
//! controls in step with the selected device.
//!
//! # Architecture
//!
//! ```text
//!  commands   bus events   debounce   write outcomes
//!      │          │           │             │
//!      ▼          ▼           ▼             ▼
//! ┌──────────────────────────────────────────────────┐
//! │                      Viewer                      │
//! ├────────────────────────┬─────────────────────────┤
//! │    CapturePipeline     │  ControlSet             │
//! │  Stopped → Starting    │  CommandDispatcher      │
//! │      → Playing         │                         │
//! └───────────┬────────────┴────────────┬────────────┘
//!             ▼                         ▼
//!  v4l2src ! capsfilter !           v4l2-ctl
//!  videoconvert ! videoflip ! sink
//! ```

pub mod debounce;
pub mod format;
pub mod orientation;
pub mod pipeline;
pub mod session;
pub mod viewer;

#[cfg(test)]
mod mock;

pub use format::{discover_formats, CapabilityEntry, FormatDescriptor, FrameRate};
pub use orientation::Orientation;
pub use pipeline::{BusEvent, BusMessage, CaptureSource, GstPreviewPipeline};
pub use session::*;
pub use viewer::{Viewer, ViewerCommand, ViewerNotice};
