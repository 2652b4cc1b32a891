//! Raw frame classification and operation tags.
//!
//! The server interleaves JSON control frames and raw binary payload
//! frames on the same socket. A received frame is a control frame if and
//! only if it parses as a JSON object; everything else is treated as an
//! opaque binary payload. The server provides no other discriminator, so
//! a corrupted control frame is indistinguishable from a binary payload
//! and will be routed as one. The rule must be kept exactly as-is for
//! protocol compatibility.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

use crate::WireError;

/// Operation tag carried in the `op` field of a control frame.
///
/// Decoded once at the transport boundary; all routing and matching
/// happens on this tag rather than on repeated string comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Session handshake.
    Init,
    /// File metadata notification or upload descriptor.
    Push,
    /// Request for a file version's content.
    Pull,
    /// End of the initial snapshot burst.
    Ready,
    /// Remote usage/quota query.
    Size,
    /// Keepalive request.
    Ping,
    /// Keepalive acknowledgment.
    Pong,
    /// Terminal acknowledgment (`{"op":"ok"}`).
    Ok,
    /// Transfer go-ahead; appears only as `{"res":"next"}`.
    Next,
    /// An op string this client does not recognize.
    Unknown,
}

impl Op {
    /// Decode an op string into its tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "init" => Op::Init,
            "push" => Op::Push,
            "pull" => Op::Pull,
            "ready" => Op::Ready,
            "size" => Op::Size,
            "ping" => Op::Ping,
            "pong" => Op::Pong,
            "ok" => Op::Ok,
            "next" => Op::Next,
            _ => Op::Unknown,
        }
    }
}

/// A single frame received from (or sent to) the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A JSON object control frame.
    Control(Map<String, Value>),
    /// An opaque binary payload frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Classify raw frame bytes.
    ///
    /// JSON-object frames become [`Frame::Control`]; everything else,
    /// including malformed JSON, becomes [`Frame::Binary`].
    pub fn classify(bytes: Vec<u8>) -> Self {
        match serde_json::from_slice::<Map<String, Value>>(&bytes) {
            Ok(map) => Frame::Control(map),
            Err(_) => Frame::Binary(bytes),
        }
    }

    /// The operation tag of a control frame, if it carries one.
    ///
    /// Returns `None` for binary frames and for control frames without
    /// an `op` field (e.g. the `{res: ...}` acknowledgments).
    pub fn op(&self) -> Option<Op> {
        match self {
            Frame::Control(map) => map.get("op").and_then(Value::as_str).map(Op::from_tag),
            Frame::Binary(_) => None,
        }
    }

    /// Whether this is a binary payload frame.
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }

    /// Whether this control frame contains all of the given keys.
    ///
    /// Always false for binary frames.
    pub fn has_keys(&self, keys: &[&str]) -> bool {
        match self {
            Frame::Control(map) => keys.iter().all(|k| map.contains_key(*k)),
            Frame::Binary(_) => false,
        }
    }

    /// The value of the `res` field, if present.
    pub fn res(&self) -> Option<&str> {
        match self {
            Frame::Control(map) => map.get("res").and_then(Value::as_str),
            Frame::Binary(_) => None,
        }
    }

    /// The acknowledgment tag of a `{res: ...}` frame, if present.
    ///
    /// `{res:"ok"}` and `{res:"next"}` acknowledge different exchange
    /// points; matching on the decoded tag keeps the string comparison
    /// in one place.
    pub fn ack(&self) -> Option<Op> {
        self.res().map(Op::from_tag)
    }

    /// Decode a control frame into a typed message.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, WireError> {
        match self {
            Frame::Control(map) => {
                Ok(serde_json::from_value(Value::Object(map.clone()))?)
            }
            Frame::Binary(_) => Err(WireError::NotControl),
        }
    }

    /// Consume a binary frame, returning its payload.
    pub fn into_binary(self) -> Option<Vec<u8>> {
        match self {
            Frame::Binary(bytes) => Some(bytes),
            Frame::Control(_) => None,
        }
    }
}

/// Log-friendly rendering: control frames print their JSON, binary
/// frames print only their byte count.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Control(map) => {
                write!(f, "{}", Value::Object(map.clone()))
            }
            Frame::Binary(bytes) => write!(f, "binary [{}]", bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_classifies_as_control() {
        let frame = Frame::classify(br#"{"op":"ready","version":7}"#.to_vec());
        assert!(matches!(frame, Frame::Control(_)));
        assert_eq!(frame.op(), Some(Op::Ready));
    }

    #[test]
    fn raw_bytes_classify_as_binary() {
        let frame = Frame::classify(vec![0x00, 0xFF, 0x10]);
        assert!(frame.is_binary());
        assert_eq!(frame.op(), None);
    }

    #[test]
    fn malformed_json_classifies_as_binary() {
        // The protocol gives us no better discriminator; a truncated
        // control frame is routed as payload.
        let frame = Frame::classify(br#"{"op":"ready""#.to_vec());
        assert!(frame.is_binary());
    }

    #[test]
    fn json_scalar_classifies_as_binary() {
        // Only JSON *objects* count as control frames.
        let frame = Frame::classify(b"42".to_vec());
        assert!(frame.is_binary());
    }

    #[test]
    fn op_tags_decode() {
        assert_eq!(Op::from_tag("push"), Op::Push);
        assert_eq!(Op::from_tag("pong"), Op::Pong);
        assert_eq!(Op::from_tag("frobnicate"), Op::Unknown);
    }

    #[test]
    fn res_frame_has_no_op() {
        let frame = Frame::classify(br#"{"res":"next"}"#.to_vec());
        assert_eq!(frame.op(), None);
        assert_eq!(frame.res(), Some("next"));
        assert_eq!(frame.ack(), Some(Op::Next));
    }

    #[test]
    fn ack_and_op_are_distinct() {
        // Terminal {op:"ok"} is not the handshake {res:"ok"}.
        let terminal = Frame::classify(br#"{"op":"ok"}"#.to_vec());
        assert_eq!(terminal.op(), Some(Op::Ok));
        assert_eq!(terminal.ack(), None);

        let handshake = Frame::classify(br#"{"res":"ok"}"#.to_vec());
        assert_eq!(handshake.op(), None);
        assert_eq!(handshake.ack(), Some(Op::Ok));
    }

    #[test]
    fn has_keys_matches_key_sets() {
        let frame = Frame::classify(br#"{"hash":"ab","size":10,"pieces":1}"#.to_vec());
        assert!(frame.has_keys(&["hash", "size", "pieces"]));
        assert!(!frame.has_keys(&["hash", "uid"]));
    }

    #[test]
    fn display_hides_binary_content() {
        let frame = Frame::Binary(vec![1, 2, 3, 4]);
        assert_eq!(frame.to_string(), "binary [4]");
    }

    #[test]
    fn decode_on_binary_fails() {
        let frame = Frame::Binary(vec![1]);
        let result: Result<crate::Ready, _> = frame.decode();
        assert!(matches!(result, Err(WireError::NotControl)));
    }
}
