//! Poll an iGrill's battery level on a fixed schedule.
//!
//! Run with: cargo run --example poll_battery -- <ADDRESS>
//!
//! Stands in for a host poller: each iteration is an independent
//! session, and a failed poll keeps the previous reading.

use igrill_rust_ble::{BtleplugTransport, DeviceSession, Result};
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

    let address = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: poll_battery <ADDRESS>");
        std::process::exit(1);
    });

    let mut transport = BtleplugTransport::new().await?;
    // Polls recur anyway, so fail fast and let the next cycle retry.
    transport.set_connect_params(2, Duration::from_millis(500));
    let session = DeviceSession::new(transport);

    println!("Polling {} every 60 seconds, Ctrl-C to stop\n", address);

    let mut last_battery: Option<f64> = None;

    loop {
        match session.update(&address).await {
            Ok(snapshot) => {
                last_battery = snapshot.battery_percent().or(last_battery);
                match snapshot.battery_percent() {
                    Some(battery) => println!("Battery: {:.0}%", battery),
                    None => println!("Connected, but no battery reading this poll"),
                }
            }
            Err(e) => {
                // Stale data is retained; the next poll retries.
                eprintln!("Poll failed: {e}");
                if let Some(battery) = last_battery {
                    println!("Last known battery: {:.0}%", battery);
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}
