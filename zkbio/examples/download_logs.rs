//! Download users and attendance logs

use std::collections::HashMap;

use tracing_subscriber::EnvFilter;
use zkbio::{Device, DeviceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut device = Device::from_config(DeviceConfig::from_env()?);
    device.connect().await?;

    let users = device.get_users().await?;
    println!("{} users", users.len());

    let names: HashMap<_, _> = users
        .iter()
        .map(|u| (u.person_id.clone(), u.name.clone()))
        .collect();

    let logs = device.get_att_logs().await?;
    println!("{} attendance records", logs.len());

    for log in &logs {
        let name = names.get(&log.person_id).map(String::as_str).unwrap_or("?");
        println!("{}  {:>8}  {}  mode={}", log.timestamp, log.person_id, name, log.verify_mode);
    }

    device.disconnect().await?;
    Ok(())
}
