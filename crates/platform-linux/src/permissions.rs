//! Permission detection and guidance for Linux.
//!
//! Lightbox needs readable video nodes for preview and the `v4l2-ctl`
//! tool for device controls.

use std::path::Path;

use crate::devices::enumerate_devices;

/// A system capability that Lightbox may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities(control_tool: &Path) -> Vec<Capability> {
    vec![
        check_video_devices(),
        check_device_access(),
        check_control_tool(control_tool),
    ]
}

/// Check that at least one video4linux node exists.
fn check_video_devices() -> Capability {
    let available = enumerate_devices()
        .map(|devices| !devices.is_empty())
        .unwrap_or(false);

    Capability {
        name: "Video Devices".to_string(),
        description: "Video4Linux capture nodes (/dev/video*)".to_string(),
        available,
        required: true,
        fix_instructions: if available {
            None
        } else {
            Some(
                "Connect a camera and verify /dev/video* exists (v4l2-ctl --list-devices)"
                    .to_string(),
            )
        },
    }
}

/// Check the current user can open the video nodes.
fn check_device_access() -> Capability {
    let devices = enumerate_devices().unwrap_or_default();
    let available = !devices.is_empty()
        && devices.iter().all(|device| {
            std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&device.path)
                .is_ok()
        });

    Capability {
        name: "Device Access".to_string(),
        description: "Read/write access to video nodes".to_string(),
        available,
        required: true,
        fix_instructions: if !available {
            Some(
                "Add user to video group: sudo usermod -aG video $USER (logout required)"
                    .to_string(),
            )
        } else {
            None
        },
    }
}

/// Check the control tool can be executed.
fn check_control_tool(tool: &Path) -> Capability {
    let available = std::process::Command::new(tool)
        .arg("--help")
        .output()
        .is_ok();

    Capability {
        name: "Control Tool".to_string(),
        description: format!("{} for focus/exposure controls", tool.display()),
        available,
        required: false, // preview works without controls
        fix_instructions: if !available {
            Some("Install v4l-utils: sudo apt install v4l-utils".to_string())
        } else {
            None
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("Lightbox System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_control_tool_is_optional_with_fix() {
        let cap = check_control_tool(Path::new("/nonexistent/lightbox-v4l2-ctl"));
        assert!(!cap.available);
        assert!(!cap.required);
        assert!(cap.fix_instructions.unwrap().contains("v4l-utils"));
    }
}
