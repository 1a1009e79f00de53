//! cloudsense CLI: log in and push a sensor reading on a cadence.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use cloudsense::{ClientConfig, CloudClient, Publisher, Reading, Session, WsConnector};

#[derive(Parser, Debug)]
#[command(
    name = "cloudsense",
    version,
    about = "Push sensor readings to the sensor-cloud platform"
)]
struct Cli {
    /// Reading as a JSON object: {"sensorId": "...", "data": ...}
    payload: String,

    /// Platform account name
    #[arg(long, default_value = "TestUser")]
    username: String,

    /// Platform account password
    #[arg(long, default_value = "42069", hide_default_value = true)]
    password: String,

    /// Seconds between publish attempts
    #[arg(long, default_value_t = cloudsense::config::DEFAULT_INTERVAL_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Register a fresh sensor after login and publish under its id
    #[arg(long)]
    register_sensor: bool,

    /// Publish a single reading and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cloudsense=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    config.interval = Duration::from_secs(cli.interval);

    let mut reading: Reading = serde_json::from_str(&cli.payload)
        .context("payload must be a JSON object with sensorId and data fields")?;

    let client = CloudClient::new(config.api_base.clone())?;
    let mut session = Session::new();
    if let Err(err) = client
        .login(&mut session, &cli.username, &cli.password)
        .await
    {
        tracing::error!(error = %err, "could not log in the specified user");
        std::process::exit(1);
    }

    if cli.register_sensor {
        let sensor_id = client
            .register_sensor(&mut session)
            .await
            .context("sensor registration failed")?;
        reading.sensor_id = sensor_id;
    }
    anyhow::ensure!(!reading.sensor_id.is_empty(), "sensorId must not be empty");

    let connector = Arc::new(WsConnector::new(config.channel_url.clone()));
    let publisher = Publisher::new(connector, &config);

    if cli.once {
        let reply = publisher.publish_once(&reading).await?;
        tracing::info!(reply = %reply, "reading delivered");
        return Ok(());
    }

    tracing::info!(
        sensor_id = %reading.sensor_id,
        interval_secs = cli.interval,
        "starting periodic publisher (Ctrl-C to stop)"
    );
    let handle = publisher.start(reading, config.interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.stop();
    handle.stopped().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_payload_with_defaults() {
        let cli = Cli::parse_from(["cloudsense", r#"{"sensorId": "S1", "data": 11}"#]);
        assert_eq!(cli.username, "TestUser");
        assert_eq!(cli.interval, 4);
        assert!(!cli.register_sensor);
        assert!(!cli.once);

        let reading: Reading = serde_json::from_str(&cli.payload).unwrap();
        assert_eq!(reading.sensor_id, "S1");
        assert_eq!(reading.data, serde_json::json!(11));
    }

    #[test]
    fn parse_flags() {
        let cli = Cli::parse_from([
            "cloudsense",
            "--interval",
            "30",
            "--register-sensor",
            "--once",
            r#"{"sensorId": "S1", "data": {"temp": 21.5}}"#,
        ]);
        assert_eq!(cli.interval, 30);
        assert!(cli.register_sensor);
        assert!(cli.once);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = Cli::try_parse_from(["cloudsense", "--interval", "0", "{}"]);
        assert!(result.is_err());
    }
}
