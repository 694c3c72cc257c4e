//! Frame payload decoding into typed stream events.
//!
//! Decoding is total: malformed JSON, unknown event types and unknown part
//! kinds all become [`StreamEvent::Noop`] with a logged diagnostic, so the
//! reducer never has to deal with decode failures.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{trace, warn};

/// Sentinel payload some servers send after the last event.
const DONE_SENTINEL: &str = "[DONE]";

/// Which text field of an assistant message a part feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Text,
    Reasoning,
}

impl FromStr for PartKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "reasoning" | "thinking" => Ok(Self::Reasoning),
            _ => Err(format!("Unknown part kind: {value}")),
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartKind::Text => write!(f, "text"),
            PartKind::Reasoning => write!(f, "reasoning"),
        }
    }
}

/// Events decoded from one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A new assistant part begins; `payload` is its first piece of text.
    PartStart { kind: PartKind, payload: String },
    /// More text for the currently open part.
    PartDelta { kind: PartKind, payload: String },
    /// The assistant invoked a tool.
    ToolCall { name: String, args: Option<Value> },
    /// A tool returned.
    ToolResult { name: String, result: Option<Value> },
    /// The server signalled the end of the response.
    Done,
    /// Anything that could not be decoded; dropped by the reducer.
    Noop,
}

/// Decodes one frame into a [`StreamEvent`].
///
/// `data:` lines are joined with `\n` to form the payload; `event:`, `id:` and
/// comment lines are ignored. Never fails.
pub fn decode_frame(frame: &str) -> StreamEvent {
    let mut data_lines = Vec::new();
    let mut has_other_lines = false;

    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        } else if !line.starts_with(':') && !line.trim().is_empty() {
            has_other_lines = true;
        }
    }

    if data_lines.is_empty() {
        if has_other_lines {
            warn!(frame, "frame has no data line");
        } else {
            trace!("keepalive comment frame");
        }
        return StreamEvent::Noop;
    }

    decode_payload(&data_lines.join("\n"))
}

/// Decodes a JSON payload (the frame with its `data: ` prefix removed).
pub fn decode_payload(payload: &str) -> StreamEvent {
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return StreamEvent::Done;
    }

    let envelope: Envelope = match serde_json::from_str(payload) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, payload, "dropping malformed event payload");
            return StreamEvent::Noop;
        }
    };

    match envelope.into_event() {
        Ok(event) => {
            trace!(?event, "decoded event");
            event
        }
        Err(reason) => {
            warn!(reason = %reason, payload, "dropping unrecognized event");
            StreamEvent::Noop
        }
    }
}

// === Wire Structures ===

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(alias = "part_delta_kind")]
    part_kind: String,
    #[serde(default, alias = "content_delta")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(alias = "tool_name")]
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireToolResult {
    #[serde(alias = "tool_name")]
    name: String,
    #[serde(default, alias = "content")]
    result: Option<Value>,
}

impl Envelope {
    fn into_event(self) -> Result<StreamEvent, String> {
        match self.event_type.as_str() {
            "part_start" => {
                let part: WirePart = field(self.data, "part")?;
                Ok(StreamEvent::PartStart {
                    kind: part.part_kind.parse()?,
                    payload: part.content.unwrap_or_default(),
                })
            }
            "part_delta" => {
                let part: WirePart = field(self.data, "delta")?;
                Ok(StreamEvent::PartDelta {
                    kind: part.part_kind.parse()?,
                    payload: part.content.unwrap_or_default(),
                })
            }
            "tool_call" => {
                let call: WireToolCall = field(self.data, "tool_call")?;
                Ok(StreamEvent::ToolCall {
                    name: call.name,
                    args: call.args.filter(|v| !v.is_null()),
                })
            }
            "tool_result" => {
                let result: WireToolResult = field(self.data, "tool_result")?;
                Ok(StreamEvent::ToolResult {
                    name: result.name,
                    result: result.result.filter(|v| !v.is_null()),
                })
            }
            "done" => Ok(StreamEvent::Done),
            other => Err(format!("Unknown event type: {other}")),
        }
    }
}

/// Deserializes `data.<key>` into `T`.
fn field<T: DeserializeOwned>(mut data: Value, key: &str) -> Result<T, String> {
    let value = data
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| format!("Missing data.{key}"))?;
    serde_json::from_value(value).map_err(|err| format!("Invalid data.{key}: {err}"))
}
