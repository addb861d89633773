pub mod check;
pub mod controls;
pub mod devices;
pub mod formats;
pub mod preview;
pub mod set;
