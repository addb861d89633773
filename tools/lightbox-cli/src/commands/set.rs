//! Write one control through the dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use lightbox_common::config::AppConfig;
use lightbox_common::error::LightboxError;
use lightbox_controls::{discover_controls, CommandDispatcher, ControlModel, V4l2Ctl};
use tokio::sync::mpsc;

pub async fn run(config: &AppConfig, device: PathBuf, name: String, value: i64) -> anyhow::Result<()> {
    let tool = Arc::new(V4l2Ctl::from_config(&config.controls));

    // Validate against the device's own ranges before writing.
    let descriptor = discover_controls(tool.as_ref(), &device, config.controls.discovery_timeout())
        .await?
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| LightboxError::UnknownControl {
            identifier: name.clone(),
        })?;
    let mut model = ControlModel::new(descriptor);
    let change = model.set_value(value)?;
    if change.value != value {
        println!("Snapped {name} to step: {value} -> {}", change.value);
    }

    let (outcomes_tx, mut outcomes) = mpsc::unbounded_channel();
    let dispatcher = CommandDispatcher::spawn(device.clone(), tool, outcomes_tx);
    dispatcher.submit(change)?;
    dispatcher.shutdown().await;

    let outcome = outcomes
        .recv()
        .await
        .ok_or_else(|| anyhow::anyhow!("Control write did not report an outcome"))?;
    outcome.result?;

    println!(
        "Set {} on {}",
        outcome.change.assignment(),
        device.display()
    );
    Ok(())
}
