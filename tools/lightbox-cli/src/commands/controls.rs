//! Discover and print device controls.

use std::path::PathBuf;

use lightbox_common::config::AppConfig;
use lightbox_controls::{discover_controls, ControlKind, V4l2Ctl, SURFACED_CONTROLS};

pub async fn run(config: &AppConfig, device: PathBuf, json: bool) -> anyhow::Result<()> {
    let tool = V4l2Ctl::from_config(&config.controls);
    let descriptors = discover_controls(&tool, &device, config.controls.discovery_timeout())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list controls: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    println!("Controls of {} (* = shown in preview):", device.display());
    for descriptor in &descriptors {
        let marker = if SURFACED_CONTROLS.contains(&descriptor.name.as_str()) {
            "*"
        } else {
            " "
        };
        let detail = match &descriptor.kind {
            ControlKind::Integer {
                min,
                max,
                step,
                value,
            } => format!("value={value} range=[{min}, {max}] step={step}"),
            ControlKind::Boolean { value } => format!("value={value}"),
            ControlKind::Menu { value, .. } => format!("value={value}"),
        };
        let flags = descriptor
            .param("flags")
            .map(|f| format!(" flags={f}"))
            .unwrap_or_default();
        println!(
            " {marker} {:<32} ({}) {detail}{flags}",
            descriptor.name,
            descriptor.kind.token()
        );
        for option in descriptor.menu_options() {
            println!("      {}: {}", option.value, option.label);
        }
    }

    Ok(())
}
