//! External control tool invocation.
//!
//! Controls are listed and written through a `v4l2-ctl` compatible binary.
//! The process runs on the tokio reactor so the event loop keeps servicing
//! bus messages and timers while it runs. Dropping an invocation kills the
//! child process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lightbox_common::config::ControlsConfig;
use lightbox_common::error::{LightboxError, LightboxResult};

use crate::model::ControlChange;
use crate::parser::{parse_controls, ControlDescriptor};

/// Lists and writes device controls.
#[async_trait::async_trait]
pub trait ControlTool: Send + Sync {
    /// Raw control listing for `device`.
    async fn list_controls(&self, device: &Path) -> LightboxResult<String>;

    /// Write one control. Any failure is [`LightboxError::ControlWriteFailed`].
    async fn write_control(&self, device: &Path, change: &ControlChange) -> LightboxResult<()>;
}

/// `v4l2-ctl` backed control tool.
#[derive(Debug, Clone)]
pub struct V4l2Ctl {
    binary: PathBuf,
}

impl V4l2Ctl {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &ControlsConfig) -> Self {
        Self::new(&config.tool)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for V4l2Ctl {
    fn default() -> Self {
        Self::from_config(&ControlsConfig::default())
    }
}

#[async_trait::async_trait]
impl ControlTool for V4l2Ctl {
    async fn list_controls(&self, device: &Path) -> LightboxResult<String> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("-d")
            .arg(device)
            .arg("--list-ctrls-menus")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LightboxError::ControlDiscovery {
                device: device.to_path_buf(),
                message: format!("failed to run {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            return Err(LightboxError::ControlDiscovery {
                device: device.to_path_buf(),
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn write_control(&self, device: &Path, change: &ControlChange) -> LightboxResult<()> {
        tracing::debug!(
            device = %device.display(),
            control = %change.identifier,
            value = change.value,
            "Writing control"
        );

        let output = tokio::process::Command::new(&self.binary)
            .arg("-d")
            .arg(device)
            .arg("--set-ctrl")
            .arg(change.assignment())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LightboxError::ControlWriteFailed {
                identifier: change.identifier.clone(),
                exit_info: format!("failed to run {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            return Err(LightboxError::ControlWriteFailed {
                identifier: change.identifier.clone(),
                exit_info: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

/// List and parse the controls of `device`, giving up after `timeout`.
pub async fn discover_controls(
    tool: &dyn ControlTool,
    device: &Path,
    timeout: Duration,
) -> LightboxResult<Vec<ControlDescriptor>> {
    let listing = tokio::time::timeout(timeout, tool.list_controls(device))
        .await
        .map_err(|_| LightboxError::ControlDiscovery {
            device: device.to_path_buf(),
            message: format!("control listing timed out after {timeout:?}"),
        })??;
    let descriptors = parse_controls(&listing)?;
    tracing::info!(
        device = %device.display(),
        controls = descriptors.len(),
        "Discovered device controls"
    );
    Ok(descriptors)
}
