//! List video devices.

use lightbox_platform_linux::DeviceList;

pub fn run() -> anyhow::Result<()> {
    let list = DeviceList::detect()?;

    for (index, label) in list.labels().iter().enumerate() {
        println!("{index:>3}  {label}");
    }
    if !list.has_devices() {
        println!();
        println!("No video devices found. Run `lightbox check` for details.");
    }

    Ok(())
}
