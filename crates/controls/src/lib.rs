//! Lightbox Device Controls
//!
//! Discovers the controls a V4L2 device exposes, models the ones the
//! viewer surfaces, and delivers user edits back to the device.
//!
//! # Flow
//!
//! ```text
//!  v4l2-ctl --list-ctrls-menus
//!            │ stdout text
//!            ▼
//!  ┌───────────────────┐   ┌──────────────┐  ControlChange  ┌───────────────────┐
//!  │ parser            │──▶│ ControlSet   │────────────────▶│ CommandDispatcher │
//!  │ ControlDescriptor │   │ ControlModel │◀─ WriteOutcome ─│ (coalescing)      │
//!  └───────────────────┘   └──────────────┘                 └─────────┬─────────┘
//!                                                                     │
//!                                                 v4l2-ctl --set-ctrl name=value
//! ```

pub mod dispatcher;
pub mod model;
pub mod parser;
pub mod tool;

pub use dispatcher::{CoalescingQueue, CommandDispatcher, WriteOutcome};
pub use model::{ControlChange, ControlModel, ControlSet, SURFACED_CONTROLS};
pub use parser::{parse_controls, ControlDescriptor, ControlKind, MenuOption};
pub use tool::{discover_controls, ControlTool, V4l2Ctl};
