//! Negotiate with a device and print its capture formats.

use std::path::PathBuf;
use std::time::Duration;

use lightbox_capture_engine::{CapturePipeline, GstPreviewPipeline, PipelineUpdate};
use lightbox_platform_linux::{DeviceList, VideoDevice};

pub async fn run(device: PathBuf, timeout: u64) -> anyhow::Result<()> {
    let device = DeviceList::detect()?
        .by_path(&device)
        .cloned()
        .unwrap_or_else(|| VideoDevice::new(device.display().to_string(), device));

    // Negotiation only; nothing is displayed.
    let (source, mut bus) = GstPreviewPipeline::new("fakesink")?;
    let mut pipeline = CapturePipeline::new(source, Duration::ZERO);
    pipeline.select_device(Some(device.clone()))?;

    let formats = tokio::time::timeout(Duration::from_secs(timeout), async {
        while let Some(message) = bus.recv().await {
            match pipeline.handle_bus_event(message) {
                Some(PipelineUpdate::Playing { formats }) => return Ok(formats.unwrap_or_default()),
                Some(PipelineUpdate::Reset { reason }) => {
                    return Err(anyhow::anyhow!("Capture failed: {reason}"))
                }
                None => {}
            }
        }
        Err(anyhow::anyhow!("Pipeline bus closed"))
    })
    .await
    .map_err(|_| anyhow::anyhow!("Timed out waiting for {} to negotiate", device.path.display()))??;

    pipeline.stop()?;

    println!("Formats of {}:", device.display_name());
    for (index, format) in formats.iter().enumerate() {
        println!("{index:>3}  {}  ({})", format.label, format.media_type);
    }
    if formats.is_empty() {
        println!("  (none reported)");
    }

    Ok(())
}
