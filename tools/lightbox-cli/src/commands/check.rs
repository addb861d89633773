//! Check system capabilities.

use lightbox_capture_engine::pipeline::missing_elements;
use lightbox_common::config::AppConfig;
use lightbox_platform_linux::permissions::{check_capabilities, print_capability_report};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Lightbox System Check");
    println!("{}", "=".repeat(50));
    println!("Config: {}", lightbox_common::config::config_file_path().display());

    // Video devices
    let devices = lightbox_platform_linux::enumerate_devices()?;
    println!("[OK] Video devices detected: {}", devices.len());
    for device in &devices {
        println!("     {}", device.display_name());
    }

    // GStreamer elements
    let gstreamer_ok = match missing_elements(&config.preview.video_sink) {
        Ok(missing) if missing.is_empty() => {
            println!("[OK] GStreamer elements available");
            true
        }
        Ok(missing) => {
            println!("[MISSING] GStreamer elements: {}", missing.join(", "));
            println!("    Fix: install gstreamer1.0-plugins-base and gstreamer1.0-plugins-good");
            false
        }
        Err(e) => {
            println!("[MISSING] GStreamer: {e}");
            false
        }
    };

    // Check permissions
    let capabilities = check_capabilities(&config.controls.tool);
    println!();
    print_capability_report(&capabilities);

    let all_required_ok = gstreamer_ok
        && capabilities
            .iter()
            .filter(|c| c.required)
            .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. Lightbox is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
