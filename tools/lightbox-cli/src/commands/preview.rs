//! Interactive preview.
//!
//! Reads one command per stdin line and prints viewer notices as they
//! arrive. Ctrl+C or `quit` ends the session.

use std::sync::Arc;

use anyhow::{bail, Context};
use lightbox_capture_engine::{
    CapturePipeline, GstPreviewPipeline, Orientation, Viewer, ViewerCommand, ViewerNotice,
};
use lightbox_common::config::AppConfig;
use lightbox_controls::{ControlChange, ControlKind, V4l2Ctl};
use lightbox_platform_linux::DeviceList;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Commands:
  device N             select device N (0 = no device)
  format N             select capture format N
  orientation NAME     none, clockwise, rotate-180, counterclockwise,
                       horizontal-flip, vertical-flip,
                       upper-left-diagonal, upper-right-diagonal
  set NAME VALUE       write a control, e.g. set focus_absolute 40
  devices              list devices again
  help                 show this help
  quit                 stop the preview";

pub async fn run(
    config: &AppConfig,
    device: Option<usize>,
    orientation: Option<String>,
) -> anyhow::Result<()> {
    let devices = DeviceList::detect()?;
    let orientation: Orientation = orientation
        .as_deref()
        .unwrap_or(config.preview.orientation.as_str())
        .parse()?;

    let (source, bus) = GstPreviewPipeline::new(&config.preview.video_sink)?;
    let mut pipeline = CapturePipeline::new(source, config.controls.discovery_delay());
    pipeline.select_orientation(orientation)?;

    let tool = Arc::new(V4l2Ctl::from_config(&config.controls));
    let (viewer, notices) = Viewer::new(pipeline, tool);
    let viewer = viewer.with_discovery_timeout(config.controls.discovery_timeout());
    let (commands, command_rx) = mpsc::channel(32);

    print_devices(&devices);
    println!("{HELP}");

    if let Some(index) = device {
        let selected = devices.choice(index)?.cloned();
        commands.send(ViewerCommand::SelectDevice(selected)).await?;
    }

    let printer = tokio::spawn(print_notices(notices));
    let reader = tokio::spawn(read_commands(devices, commands));

    viewer.run(command_rx, bus).await;

    reader.abort();
    let _ = printer.await;
    Ok(())
}

async fn read_commands(devices: DeviceList, commands: mpsc::Sender<ViewerCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        let line = line.trim();
        match line {
            "" => continue,
            "help" => println!("{HELP}"),
            "devices" => print_devices(&devices),
            _ => match parse_command(line, &devices) {
                Ok(command) => {
                    let quit = matches!(command, ViewerCommand::Shutdown);
                    if commands.send(command).await.is_err() || quit {
                        return;
                    }
                }
                Err(e) => println!("error: {e:#}"),
            },
        }
    }

    let _ = commands.send(ViewerCommand::Shutdown).await;
}

/// Parse one stdin command line.
fn parse_command(line: &str, devices: &DeviceList) -> anyhow::Result<ViewerCommand> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("device", [index]) => {
            let index: usize = index.parse().context("device index must be a number")?;
            ViewerCommand::SelectDevice(devices.choice(index)?.cloned())
        }
        ("format", [index]) => {
            ViewerCommand::SelectFormat(index.parse().context("format index must be a number")?)
        }
        ("orientation", [name]) => ViewerCommand::SelectOrientation(name.parse()?),
        ("set", [name, value]) => {
            let value: i64 = value.parse().context("control value must be an integer")?;
            ViewerCommand::EditControl(ControlChange::new(*name, value))
        }
        ("quit" | "exit", []) => ViewerCommand::Shutdown,
        _ => bail!("unrecognized command {line:?}; type `help`"),
    };
    Ok(command)
}

fn print_devices(devices: &DeviceList) {
    println!("Devices:");
    for (index, label) in devices.labels().iter().enumerate() {
        println!("{index:>3}  {label}");
    }
}

async fn print_notices(mut notices: mpsc::UnboundedReceiver<ViewerNotice>) {
    while let Some(notice) = notices.recv().await {
        for line in describe(&notice) {
            println!("{line}");
        }
    }
}

fn describe(notice: &ViewerNotice) -> Vec<String> {
    match notice {
        ViewerNotice::DeviceSelected(Some(device)) => {
            vec![format!("Selected {}", device.display_name())]
        }
        ViewerNotice::DeviceSelected(None) => vec!["No device selected".to_string()],
        ViewerNotice::FormatsAvailable(formats) => std::iter::once("Formats:".to_string())
            .chain(
                formats
                    .iter()
                    .enumerate()
                    .map(|(index, format)| format!("{index:>3}  {}", format.label)),
            )
            .collect(),
        ViewerNotice::Playing => vec!["Playing".to_string()],
        ViewerNotice::ControlsAvailable(set) if set.is_empty() => {
            vec!["Device exposes no focus or exposure controls".to_string()]
        }
        ViewerNotice::ControlsAvailable(set) => std::iter::once("Controls:".to_string())
            .chain(set.models().iter().map(|model| {
                let range = match model.kind() {
                    ControlKind::Integer { min, max, step, .. } => {
                        format!(" [{min}..{max} step {step}]")
                    }
                    ControlKind::Boolean { .. } => " [0|1]".to_string(),
                    ControlKind::Menu { .. } => format!(" [{}]", model.option_labels().join(" | ")),
                };
                let current = model
                    .selected_label()
                    .map(|label| format!("{} ({label})", model.value()))
                    .unwrap_or_else(|| model.value().to_string());
                format!("  {:<14} {:<18} = {current}{range}", model.label(), model.identifier())
            }))
            .collect(),
        ViewerNotice::ControlDiscoveryFailed { device, reason } => vec![format!(
            "Controls unavailable for {}: {reason}",
            device.display()
        )],
        ViewerNotice::ControlRejected { identifier, reason } => {
            vec![format!("Rejected {identifier}: {reason}")]
        }
        ViewerNotice::ControlConfirmed(change) => vec![format!("Set {}", change.assignment())],
        ViewerNotice::ControlWriteFailed {
            identifier,
            reason,
            reverted_to,
        } => {
            let mut line = format!("Failed to set {identifier}: {reason}");
            if let Some(value) = reverted_to {
                line.push_str(&format!(" (reverted to {value})"));
            }
            vec![line]
        }
        ViewerNotice::PipelineReset { reason } => {
            vec![format!("Preview stopped: {reason}. Select a device to continue.")]
        }
        ViewerNotice::CaptureFailed { reason } => vec![format!("Preview error: {reason}")],
    }
}
