//! Minimal client-side STOMP frame codec.
//!
//! Only the frames this client actually exchanges are modeled: outbound
//! `SUBSCRIBE` and `SEND`, plus whatever single frame the broker pushes
//! back on the collect topic (`MESSAGE`, `CONNECTED`, or `ERROR`). No
//! transactions, no receipts, no heart-beats.
//!
//! Wire shape: command line, one `name:value` line per header, a blank
//! line, the body, and a NUL terminator.

use crate::error::{Error, Result};

/// One STOMP frame, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command, e.g. `SUBSCRIBE` or `MESSAGE`.
    pub command: String,
    /// Headers in wire order. Lookup is first-match, per the STOMP spec.
    pub headers: Vec<(String, String)>,
    /// Frame body, empty for control frames.
    pub body: String,
}

impl Frame {
    /// Subscription frame for `destination`, labeled with a client-chosen
    /// `id` and auto acknowledgment.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self {
            command: "SUBSCRIBE".to_string(),
            headers: vec![
                ("id".to_string(), id.to_string()),
                ("destination".to_string(), destination.to_string()),
                ("ack".to_string(), "auto".to_string()),
            ],
            body: String::new(),
        }
    }

    /// Publish frame carrying a JSON `body` to `destination`.
    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Self {
            command: "SEND".to_string(),
            headers: vec![
                ("destination".to_string(), destination.to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: body.into(),
        }
    }

    /// First header with the given name, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to the wire form, NUL terminator included.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse an inbound frame.
    ///
    /// Tolerates CRLF line endings and the trailing NUL (with or without
    /// it). Anything without a command line or with a malformed header
    /// is a protocol error.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim_end_matches('\0');

        let (head, body) = match split_head_body(raw) {
            Some(parts) => parts,
            None => (raw, ""),
        };

        let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));
        let command = match lines.next() {
            Some(line) if !line.trim().is_empty() => line.trim().to_string(),
            _ => return Err(Error::protocol("frame is missing a command line")),
        };

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::protocol(format!("malformed header line: {line:?}")))?;
            headers.push((name.to_string(), value.to_string()));
        }

        Ok(Self {
            command,
            headers,
            body: body.to_string(),
        })
    }
}

/// Split a frame at the blank line separating headers from body.
fn split_head_body(raw: &str) -> Option<(&str, &str)> {
    if let Some(idx) = raw.find("\n\n") {
        return Some((&raw[..idx], &raw[idx + 2..]));
    }
    raw.find("\r\n\r\n")
        .map(|idx| (&raw[..idx], &raw[idx + 4..]))
}
