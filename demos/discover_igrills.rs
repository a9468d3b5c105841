//! Basic example: Discover all nearby iGrill devices
//!
//! Run with: cargo run --example discover_igrills

use igrill_rust_ble::{IgrillScanner, Result};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("igrill_rust_ble=debug".parse().unwrap()),
        )
        .init();

    println!("Scanning for Weber iGrill devices...");
    println!("Make sure your iGrill is powered on!\n");

    let scanner = IgrillScanner::new().await?;
    let devices = scanner.discover(Duration::from_secs(10)).await?;

    if devices.is_empty() {
        println!("No iGrill devices found.");
        return Ok(());
    }

    for device in devices {
        println!("Found {} at {}", device.model, device.address);
    }

    Ok(())
}
