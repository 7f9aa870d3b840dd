//! Data notification throughput measurement.
//!
//! Subscribes to the Data characteristic for a fixed time and reports the
//! notification and byte rate, checking the payload counter stays continuous.

mod ble_client;
mod protocol;

use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;

use ble_client::WrcdClient;
use protocol::{encode_config, PatternChecker, CONFIG_UUID, DATA_UUID};

#[derive(Parser)]
#[command(name = "throughput")]
#[command(about = "Measure WRCD Data notification throughput")]
struct Args {
    /// Advertised device name
    #[arg(long, default_value = "WRCD")]
    name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,

    /// Notification period in milliseconds
    #[arg(long, default_value = "100")]
    period: u16,

    /// Payload length in bytes
    #[arg(long, default_value = "20")]
    length: u8,

    /// Measurement time in seconds
    #[arg(long, default_value = "10")]
    seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("{}", "WRCD Throughput".bold());
    println!("Period: {} ms, payload: {} bytes, duration: {} s", args.period, args.length, args.seconds);

    let device = WrcdClient::connect_by_name(&args.name, Duration::from_secs(args.scan_timeout)).await?;
    println!("{}", "Connected!".green());

    device.write(CONFIG_UUID, &encode_config(args.period, args.length)).await?;
    device.take_notifications(DATA_UUID).await;

    device.subscribe(DATA_UUID).await?;
    let start = Instant::now();
    tokio::time::sleep(Duration::from_secs(args.seconds)).await;
    device.unsubscribe(DATA_UUID).await?;
    let elapsed = start.elapsed().as_secs_f64();

    let received = device.take_notifications(DATA_UUID).await;
    let mut checker = PatternChecker::default();
    let mut wrong_length = 0;
    for notification in &received {
        if notification.value.len() != usize::from(args.length) {
            wrong_length += 1;
        }
        checker.check(&notification.value);
    }

    let expected = args.seconds as f64 * 1000.0 / f64::from(args.period.max(1));
    println!("{}", "-".repeat(60));
    println!("  Notifications: {} (expected ~{:.0})", received.len(), expected);
    println!("  Rate:          {:.1} notifications/s", received.len() as f64 / elapsed);
    println!("  Throughput:    {:.1} bytes/s", checker.bytes as f64 / elapsed);
    println!("  Wrong length:  {}", wrong_length);
    println!("  Pattern gaps:  {}", checker.breaks);

    device.disconnect().await?;

    if wrong_length > 0 || checker.breaks > 0 {
        println!("{}", "FAIL".red().bold());
        std::process::exit(1);
    }
    println!("{}", "PASS".green().bold());
    Ok(())
}
