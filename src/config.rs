//! Client configuration: endpoint addresses, topics, and timing.
//!
//! Everything has a compiled-in default matching the deployed platform;
//! `from_env` lets an operator repoint the client at a different stack
//! (e.g. a local broker) without a rebuild. There is no config file;
//! the surface is small enough that environment overrides cover it.

use std::env;
use std::time::Duration;

/// REST API base for user and sensor management.
const DEFAULT_API_BASE: &str = "https://fwsllpk77c.execute-api.us-east-1.amazonaws.com/dev";

/// WebSocket endpoint of the collect channel broker.
const DEFAULT_CHANNEL_URL: &str =
    "ws://websocketapi-env.eba-gxghbmt3.us-east-1.elasticbeanstalk.com/sensor-data";

/// Broker topic every client subscribes to before sending.
pub const SUBSCRIBE_TOPIC: &str = "/topic/collect";

/// Application destination readings are sent to.
pub const PUBLISH_DESTINATION: &str = "/app/API/data";

/// Seconds between publish attempts unless overridden.
pub const DEFAULT_INTERVAL_SECS: u64 = 4;

/// Upper bound on the per-attempt wait for the broker's reply.
const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 10;

/// Connection settings shared by the cloud client and the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST API base URL (no trailing slash).
    pub api_base: String,
    /// WebSocket URL of the collect channel.
    pub channel_url: String,
    /// Topic subscribed to on every publish attempt.
    pub subscribe_topic: String,
    /// Destination readings are published to.
    pub publish_destination: String,
    /// Cadence of the periodic publisher. Must be positive.
    pub interval: Duration,
    /// Bound on the per-attempt wait for an inbound message. Must be positive.
    pub receive_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            channel_url: DEFAULT_CHANNEL_URL.to_string(),
            subscribe_topic: SUBSCRIBE_TOPIC.to_string(),
            publish_destination: PUBLISH_DESTINATION.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            receive_timeout: Duration::from_secs(DEFAULT_RECEIVE_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `CLOUDSENSE_*` environment variables.
    ///
    /// Unset or empty variables keep the default; durations that fail to
    /// parse or are zero are ignored with a warning rather than silently
    /// producing a publisher that never fires.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = non_empty_var("CLOUDSENSE_API_BASE") {
            config.api_base = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = non_empty_var("CLOUDSENSE_CHANNEL_URL") {
            config.channel_url = value;
        }
        if let Some(secs) = positive_secs_var("CLOUDSENSE_INTERVAL_SECS") {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = positive_secs_var("CLOUDSENSE_RECEIVE_TIMEOUT_SECS") {
            config.receive_timeout = Duration::from_secs(secs);
        }

        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn positive_secs_var(name: &str) -> Option<u64> {
    let raw = non_empty_var(name)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(secs),
        _ => {
            tracing::warn!(var = name, value = %raw, "ignoring invalid duration override");
            None
        }
    }
}
