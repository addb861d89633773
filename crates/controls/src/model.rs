//! Widget-agnostic models of the controls the viewer surfaces.

use lightbox_common::error::{LightboxError, LightboxResult};
use serde::Serialize;

use crate::parser::{ControlDescriptor, ControlKind};

/// Controls surfaced to the user, in display order.
pub const SURFACED_CONTROLS: [&str; 4] = [
    "focus_auto",
    "focus_absolute",
    "exposure_auto",
    "exposure_absolute",
];

const LABELS: [(&str, &str); 4] = [
    ("focus_auto", "Autofocus"),
    ("focus_absolute", "Focus"),
    ("exposure_auto", "Auto Exposure"),
    ("exposure_absolute", "Exposure"),
];

/// A user edit of one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlChange {
    pub identifier: String,
    pub value: i64,
}

impl ControlChange {
    pub fn new(identifier: impl Into<String>, value: i64) -> Self {
        Self {
            identifier: identifier.into(),
            value,
        }
    }

    /// `name=value` assignment as passed to the control tool.
    pub fn assignment(&self) -> String {
        format!("{}={}", self.identifier, self.value)
    }
}

/// One control with its live and device-confirmed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlModel {
    descriptor: ControlDescriptor,
    value: i64,
    confirmed: i64,
}

impl ControlModel {
    pub fn new(descriptor: ControlDescriptor) -> Self {
        let value = descriptor.kind.value();
        Self {
            descriptor,
            value,
            confirmed: value,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.descriptor.name
    }

    /// Human label, falling back to the raw identifier.
    pub fn label(&self) -> &str {
        LABELS
            .iter()
            .find(|(id, _)| *id == self.identifier())
            .map(|(_, label)| *label)
            .unwrap_or(self.identifier())
    }

    pub fn kind(&self) -> &ControlKind {
        &self.descriptor.kind
    }

    pub fn descriptor(&self) -> &ControlDescriptor {
        &self.descriptor
    }

    /// Value last requested by the user.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Value last accepted by the device.
    pub fn confirmed(&self) -> i64 {
        self.confirmed
    }

    /// Boolean view of the value, for boolean controls.
    pub fn enabled(&self) -> Option<bool> {
        match self.descriptor.kind {
            ControlKind::Boolean { .. } => Some(self.value != 0),
            _ => None,
        }
    }

    /// Set a raw value, validating it against the control's contract.
    ///
    /// Integer values inside the range snap to the nearest step.
    pub fn set_value(&mut self, value: i64) -> LightboxResult<ControlChange> {
        let value = self.validate(value)?;
        self.value = value;
        Ok(ControlChange::new(self.identifier(), value))
    }

    pub fn set_enabled(&mut self, enabled: bool) -> LightboxResult<ControlChange> {
        match self.descriptor.kind {
            ControlKind::Boolean { .. } => self.set_value(i64::from(enabled)),
            _ => Err(self.reject(i64::from(enabled), "not a boolean control")),
        }
    }

    /// Select a menu entry by its label.
    pub fn select_label(&mut self, label: &str) -> LightboxResult<ControlChange> {
        let id = self
            .descriptor
            .menu_options()
            .iter()
            .find(|option| option.label == label)
            .map(|option| option.value)
            .ok_or_else(|| self.reject(self.value, format!("no menu entry {label:?}")))?;
        self.set_value(id)
    }

    pub fn option_labels(&self) -> Vec<&str> {
        self.descriptor
            .menu_options()
            .iter()
            .map(|option| option.label.as_str())
            .collect()
    }

    /// Label of the current menu entry.
    pub fn selected_label(&self) -> Option<&str> {
        self.descriptor
            .menu_options()
            .iter()
            .find(|option| option.value == self.value)
            .map(|option| option.label.as_str())
    }

    /// Move one step up, clamping at `max`.
    pub fn increment(&mut self) -> LightboxResult<ControlChange> {
        self.step_by(1)
    }

    /// Move one step down, clamping at `min`.
    pub fn decrement(&mut self) -> LightboxResult<ControlChange> {
        self.step_by(-1)
    }

    /// Record that the device accepted `value`.
    pub fn confirm(&mut self, value: i64) {
        self.confirmed = value;
    }

    /// Roll back after a failed write of `value`. Newer edits are kept.
    pub fn revert_after_failure(&mut self, value: i64) -> bool {
        if self.value == value && self.value != self.confirmed {
            self.value = self.confirmed;
            return true;
        }
        false
    }

    fn step_by(&mut self, direction: i64) -> LightboxResult<ControlChange> {
        match self.descriptor.kind {
            ControlKind::Integer { min, max, step, .. } => {
                let target = self.value.saturating_add(direction.saturating_mul(step));
                self.set_value(target.clamp(min, max))
            }
            _ => Err(self.reject(self.value, "only integer controls can be stepped")),
        }
    }

    fn validate(&self, value: i64) -> LightboxResult<i64> {
        match &self.descriptor.kind {
            ControlKind::Integer { min, max, step, .. } => {
                if value < *min || value > *max {
                    return Err(self.reject(value, format!("outside [{min}, {max}]")));
                }
                let offset = value - min;
                let snapped = min + (offset + step / 2) / step * step;
                Ok(if snapped > *max { snapped - step } else { snapped })
            }
            ControlKind::Boolean { .. } => match value {
                0 | 1 => Ok(value),
                _ => Err(self.reject(value, "boolean controls take 0 or 1")),
            },
            ControlKind::Menu { options, .. } => {
                if options.iter().any(|option| option.value == value) {
                    Ok(value)
                } else {
                    Err(self.reject(value, "not a declared menu entry"))
                }
            }
        }
    }

    fn reject(&self, value: i64, reason: impl Into<String>) -> LightboxError {
        LightboxError::invalid_value(self.identifier(), value, reason)
    }
}

/// The surfaced controls of one device session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ControlSet {
    models: Vec<ControlModel>,
}

impl ControlSet {
    /// Keep only the surfaced controls, in display order. Missing controls
    /// are simply absent.
    pub fn from_descriptors(descriptors: Vec<ControlDescriptor>) -> Self {
        let mut models: Vec<ControlModel> = descriptors
            .into_iter()
            .filter(|d| SURFACED_CONTROLS.contains(&d.name.as_str()))
            .map(ControlModel::new)
            .collect();
        models.sort_by_key(|m| display_rank(m.identifier()));
        models.dedup_by(|a, b| a.identifier() == b.identifier());
        Self { models }
    }

    pub fn models(&self) -> &[ControlModel] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn get(&self, identifier: &str) -> Option<&ControlModel> {
        self.models.iter().find(|m| m.identifier() == identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut ControlModel> {
        self.models.iter_mut().find(|m| m.identifier() == identifier)
    }

    /// Apply a user edit, returning the change event to dispatch.
    pub fn edit(&mut self, identifier: &str, value: i64) -> LightboxResult<ControlChange> {
        self.get_mut(identifier)
            .ok_or_else(|| LightboxError::UnknownControl {
                identifier: identifier.to_string(),
            })?
            .set_value(value)
    }
}

fn display_rank(identifier: &str) -> usize {
    SURFACED_CONTROLS
        .iter()
        .position(|id| *id == identifier)
        .unwrap_or(SURFACED_CONTROLS.len())
}
