//! Connect and print what the terminal says about itself
//!
//! ```text
//! ZKBIO_HOST=192.168.1.201 RUST_LOG=zkbio=debug cargo run --example connect
//! ```

use tracing_subscriber::EnvFilter;
use zkbio::{DEFAULT_SYSTEM_QUERY, Device, DeviceConfig, DeviceProperty, HexTrace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = DeviceConfig::from_env()?.with_trace(std::sync::Arc::new(HexTrace));

    println!("Connecting to {}:{}...", config.host, config.port);

    let mut device = Device::from_config(config);
    device.connect().await?;
    println!("✓ Connected!");

    let info = device.get_device_info().await?;
    println!("✓ Device: {}", info);

    let time = device.get_time().await?;
    println!("  Clock: {}", time);

    for property in [DeviceProperty::DeviceId, DeviceProperty::Language, DeviceProperty::FaceFunOn] {
        let value = device.get_property(property).await?;
        println!("  {}: {}", property, value.as_deref().unwrap_or("-"));
    }

    let state = device.get_machine_state().await?;
    println!(
        "  Users: {}/{}, records: {}/{}",
        state.user_count, state.user_capacity, state.record_count, state.record_capacity
    );

    println!("  Options: {}", device.query_system_options(DEFAULT_SYSTEM_QUERY).await?);

    device.disconnect().await?;
    println!("✓ Disconnected");

    Ok(())
}
