//! Audio device management command.

use clap::{Args, Subcommand};
use lazo_io::{CpalBackend, DeviceBackend};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all available audio devices
    List,

    /// Show default device information
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let backend = CpalBackend::new();

    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = backend.list_devices()?;

            if devices.is_empty() {
                println!("No audio devices found.");
                return Ok(());
            }

            println!("Available Audio Devices");
            println!("=======================\n");

            let captures: Vec<_> = devices.iter().filter(|d| d.is_capture).collect();
            if !captures.is_empty() {
                println!("Capture Devices:");
                for (idx, device) in captures.iter().enumerate() {
                    let also_render = if device.is_render { " (also render)" } else { "" };
                    println!(
                        "  [{}] {} ({} Hz){}",
                        idx, device.name, device.default_sample_rate, also_render
                    );
                }
                println!();
            }

            let renders: Vec<_> = devices.iter().filter(|d| d.is_render).collect();
            if !renders.is_empty() {
                println!("Render Devices:");
                for (idx, device) in renders.iter().enumerate() {
                    let also_capture = if device.is_capture { " (also capture)" } else { "" };
                    println!(
                        "  [{}] {} ({} Hz){}",
                        idx, device.name, device.default_sample_rate, also_capture
                    );
                }
                println!();
            }

            println!(
                "Total: {} capture device(s), {} render device(s)",
                captures.len(),
                renders.len()
            );
            println!();
            println!("Tip: Use a partial name with --input/--output:");
            println!("  lazo run --input \"USB\" --output \"USB\"");
        }

        DevicesCommand::Info => {
            let capture = backend.default_capture_device()?;
            let render = backend.default_render_device()?;

            println!("Default Audio Devices");
            println!("=====================\n");

            if let Some(device) = capture {
                println!("Default Capture:");
                println!("  Name: {}", device.name);
                println!("  Sample Rate: {} Hz", device.default_sample_rate);
                println!();
            } else {
                println!("Default Capture: None");
                println!();
            }

            if let Some(device) = render {
                println!("Default Render:");
                println!("  Name: {}", device.name);
                println!("  Sample Rate: {} Hz", device.default_sample_rate);
            } else {
                println!("Default Render: None");
            }
        }
    }

    Ok(())
}
