//! cloudsense: thin client for the sensor-cloud platform.
//!
//! Logs a user in over the platform's HTTP API, optionally registers a
//! sensor, and pushes sensor readings to the platform's
//! STOMP-over-WebSocket collect channel on a fixed cadence.
//!
//! - [`cloud`]: request/response wrappers for the user and sensor API,
//!   operating on a caller-owned [`Session`] value
//! - [`publisher`]: the periodic telemetry publisher and its channel
//!   transport seam
//! - [`stomp`]: the minimal frame codec the channel handshake speaks
//! - [`config`]: endpoint addresses, topics, and timing

pub mod cloud;
pub mod config;
pub mod error;
pub mod publisher;
pub mod stomp;

pub use cloud::{CloudClient, NewUser, Session, UserProfile};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use publisher::{
    ChannelConnector, ChannelLink, Publisher, PublisherHandle, Reading, WsConnector,
};
