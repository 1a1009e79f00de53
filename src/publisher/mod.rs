//! Periodic telemetry publisher.
//!
//! Delivers one [`Reading`] to the broker's collect topic on a fixed
//! cadence. Every attempt is self-contained: open a fresh channel
//! connection, subscribe to the collect topic under a random client id,
//! send the reading, wait (bounded) for the broker's single reply, drop
//! the connection.
//!
//! Scheduling is an explicit `tokio` interval driven from one task, not
//! a self-rearming one-shot timer. Attempts never overlap: a reply that
//! arrives later than one interval delays the next tick instead of racing
//! it. The whole loop stops through the [`PublisherHandle`]'s
//! cancellation token. The schedule re-arms after every attempt whether
//! it succeeded or failed; there is no retry or backoff.

mod transport;

pub use transport::{ChannelConnector, ChannelLink, WsConnector};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::stomp::Frame;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Inclusive upper bound for the random subscription client id.
/// Collisions between concurrent clients are tolerated; the id only
/// labels the subscription for diagnostics.
const MAX_CLIENT_ID: u32 = 1000;

/// One sensor measurement ready for transmission.
///
/// Serializes to the collect-channel wire form
/// `{"sensorId": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: String,
    pub data: serde_json::Value,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>, data: impl Into<serde_json::Value>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            data: data.into(),
        }
    }
}

/// Publishes readings to the collect channel, once or on a cadence.
pub struct Publisher {
    connector: Arc<dyn ChannelConnector>,
    subscribe_topic: String,
    destination: String,
    receive_timeout: Duration,
}

impl Publisher {
    /// Publisher over `connector`, with topics and the receive bound
    /// taken from `config`.
    pub fn new(connector: Arc<dyn ChannelConnector>, config: &ClientConfig) -> Self {
        Self {
            connector,
            subscribe_topic: config.subscribe_topic.clone(),
            destination: config.publish_destination.clone(),
            receive_timeout: config.receive_timeout,
        }
    }

    /// Perform one publish attempt and return the broker's reply body.
    ///
    /// Connects, subscribes with `ack:auto`, sends the reading, then
    /// waits for exactly one inbound frame, bounded by the configured
    /// receive timeout. The connection is dropped when the attempt ends,
    /// success or not.
    pub async fn publish_once(&self, reading: &Reading) -> Result<String> {
        let mut link = self.connector.connect().await?;

        let client_id = rand::rng().random_range(0..=MAX_CLIENT_ID);
        link.send(Frame::subscribe(&client_id.to_string(), &self.subscribe_topic).encode())
            .await?;

        let body = serde_json::to_string(reading)
            .map_err(|e| Error::protocol(format!("could not encode reading: {e}")))?;
        link.send(Frame::send(&self.destination, body).encode())
            .await?;
        tracing::debug!(
            sensor_id = %reading.sensor_id,
            client_id,
            destination = %self.destination,
            "reading sent"
        );

        let raw = tokio::time::timeout(self.receive_timeout, link.recv())
            .await
            .map_err(|_| Error::Timeout)??
            .ok_or_else(|| Error::protocol("channel closed before any message arrived"))?;

        match Frame::parse(&raw) {
            Ok(frame) => {
                tracing::info!(command = %frame.command, body = %frame.body, "channel reply");
                Ok(frame.body)
            }
            Err(_) => {
                // Log whatever came back even if it is not a STOMP frame.
                tracing::info!(raw = %raw, "channel reply (unframed)");
                Ok(raw)
            }
        }
    }

    /// Publish `reading` immediately, then once per `interval`, until the
    /// returned handle is stopped.
    ///
    /// `interval` must be positive and `reading.sensor_id` is expected to
    /// be non-empty. Attempts run one at a time: if an
    /// attempt outlasts the interval, the next tick is delayed rather
    /// than allowed to overlap. A failed attempt is logged and the
    /// schedule re-arms regardless.
    pub fn start(self, reading: Reading, interval: Duration) -> PublisherHandle {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    outcome = self.publish_once(&reading) => match outcome {
                        Ok(_) => {
                            tracing::debug!(sensor_id = %reading.sensor_id, "publish attempt complete");
                        }
                        Err(err) => {
                            tracing::warn!(
                                sensor_id = %reading.sensor_id,
                                error = %err,
                                "publish attempt failed"
                            );
                        }
                    },
                }
            }
            tracing::info!(sensor_id = %reading.sensor_id, "telemetry publisher stopped");
        });

        PublisherHandle { cancel, task }
    }
}

/// Handle to a running periodic publisher.
///
/// Dropping the handle leaves the publisher running; call [`stop`] to
/// end the schedule. A stop during an in-flight attempt cancels the
/// attempt's pending receive.
///
/// [`stop`]: PublisherHandle::stop
pub struct PublisherHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl PublisherHandle {
    /// Request the publisher to stop. Returns immediately; await
    /// [`stopped`](PublisherHandle::stopped) to join the task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the publisher task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the publisher task to exit.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::{sleep, Instant};

    /// How a fake broker answers the per-attempt receive.
    #[derive(Clone, Copy)]
    enum ReplyMode {
        Now,
        After(Duration),
        Never,
    }

    #[derive(Default)]
    struct FakeShared {
        sent: Mutex<Vec<String>>,
        attempt_starts: Mutex<Vec<Instant>>,
        attempt_ends: Mutex<Vec<Instant>>,
    }

    /// Fake link that records outbound frames and answers per `mode`.
    struct FakeLink {
        shared: Arc<FakeShared>,
        mode: ReplyMode,
    }

    #[async_trait::async_trait]
    impl ChannelLink for FakeLink {
        async fn send(&mut self, text: String) -> Result<()> {
            self.shared.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<String>> {
            match self.mode {
                ReplyMode::Now => {}
                ReplyMode::After(delay) => sleep(delay).await,
                ReplyMode::Never => futures_util::future::pending::<()>().await,
            }
            self.shared.attempt_ends.lock().unwrap().push(Instant::now());
            Ok(Some(
                "MESSAGE\ndestination:/topic/collect\n\n{\"ack\":true}\0".to_string(),
            ))
        }
    }

    /// Connector that hands out [`FakeLink`]s and records attempt starts.
    struct FakeConnector {
        shared: Arc<FakeShared>,
        mode: ReplyMode,
    }

    impl FakeConnector {
        fn new(mode: ReplyMode) -> Self {
            Self {
                shared: Arc::new(FakeShared::default()),
                mode,
            }
        }

        fn attempts(&self) -> usize {
            self.shared.attempt_starts.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ChannelConnector for FakeConnector {
        async fn connect(&self) -> Result<Box<dyn ChannelLink>> {
            self.shared
                .attempt_starts
                .lock()
                .unwrap()
                .push(Instant::now());
            Ok(Box::new(FakeLink {
                shared: Arc::clone(&self.shared),
                mode: self.mode,
            }))
        }
    }

    fn publisher_over(connector: Arc<FakeConnector>) -> Publisher {
        Publisher::new(connector, &ClientConfig::default())
    }

    #[test]
    fn reading_serializes_to_wire_form() {
        let reading = Reading::new("S1", 11);
        assert_eq!(
            serde_json::to_value(&reading).unwrap(),
            serde_json::json!({ "sensorId": "S1", "data": 11 })
        );

        // And round-trips.
        let json = serde_json::to_string(&reading).unwrap();
        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }

    #[tokio::test]
    async fn publish_once_subscribes_then_sends() {
        let connector = Arc::new(FakeConnector::new(ReplyMode::Now));
        let publisher = publisher_over(connector.clone());

        let reply = publisher
            .publish_once(&Reading::new("S1", 11))
            .await
            .unwrap();
        assert_eq!(reply, "{\"ack\":true}");

        let sent = connector.shared.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);

        let subscribe = Frame::parse(&sent[0]).unwrap();
        assert_eq!(subscribe.command, "SUBSCRIBE");
        assert_eq!(subscribe.header("destination"), Some("/topic/collect"));
        assert_eq!(subscribe.header("ack"), Some("auto"));
        let id: u32 = subscribe.header("id").unwrap().parse().unwrap();
        assert!(id <= MAX_CLIENT_ID);

        let send = Frame::parse(&sent[1]).unwrap();
        assert_eq!(send.command, "SEND");
        assert_eq!(send.header("destination"), Some("/app/API/data"));
        assert_eq!(send.header("content-type"), Some("application/json"));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&send.body).unwrap(),
            serde_json::json!({ "sensorId": "S1", "data": 11 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silent_broker_times_out() {
        let connector = Arc::new(FakeConnector::new(ReplyMode::Never));
        let publisher = publisher_over(connector);
        let err = publisher
            .publish_once(&Reading::new("S1", 11))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_and_second_waits_full_interval() {
        let connector = Arc::new(FakeConnector::new(ReplyMode::Now));
        let publisher = publisher_over(connector.clone());

        let handle = publisher.start(Reading::new("S1", 11), Duration::from_secs(4));

        // Tick 0 fires as soon as the task runs.
        sleep(Duration::from_millis(10)).await;
        assert_eq!(connector.attempts(), 1);

        // Nothing more until the interval elapses.
        sleep(Duration::from_millis(3900)).await;
        assert_eq!(connector.attempts(), 1);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.attempts(), 2);

        handle.stop();
        handle.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn late_attempt_delays_next_tick_instead_of_overlapping() {
        // Broker replies after 6s against a 4s interval.
        let connector = Arc::new(FakeConnector::new(ReplyMode::After(Duration::from_secs(6))));
        let publisher = publisher_over(connector.clone());

        let handle = publisher.start(Reading::new("S1", 11), Duration::from_secs(4));
        sleep(Duration::from_secs(15)).await;
        handle.stop();
        handle.stopped().await;

        let starts = connector.shared.attempt_starts.lock().unwrap().clone();
        let ends = connector.shared.attempt_ends.lock().unwrap().clone();
        assert!(starts.len() >= 2);

        // Every attempt begins only after the previous one finished.
        for (next_start, prev_end) in starts.iter().skip(1).zip(ends.iter()) {
            assert!(next_start >= prev_end);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_rearms_after_failed_attempts() {
        // Every attempt times out (1s bound) against a 4s interval; the
        // schedule must keep firing regardless.
        let connector = Arc::new(FakeConnector::new(ReplyMode::Never));
        let mut config = ClientConfig::default();
        config.receive_timeout = Duration::from_secs(1);
        let publisher = Publisher::new(connector.clone(), &config);

        let handle = publisher.start(Reading::new("S1", 11), Duration::from_secs(4));
        sleep(Duration::from_secs(10)).await;
        handle.stop();
        handle.stopped().await;

        // Attempts at t=0, t=4, t=8 all started despite every one failing.
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_schedule() {
        let connector = Arc::new(FakeConnector::new(ReplyMode::Now));
        let publisher = publisher_over(connector.clone());

        let handle = publisher.start(Reading::new("S1", 11), Duration::from_secs(4));
        sleep(Duration::from_millis(100)).await;
        assert_eq!(connector.attempts(), 1);

        handle.stop();
        handle.stopped().await;

        sleep(Duration::from_secs(20)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_an_in_flight_attempt() {
        let connector = Arc::new(FakeConnector::new(ReplyMode::Never));
        let publisher = publisher_over(connector.clone());
        let handle = publisher.start(Reading::new("S1", 11), Duration::from_secs(4));

        sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());
        handle.stop();
        // Joins promptly even though the attempt's receive is pending.
        handle.stopped().await;
    }
}
