//! Text (JSON) and binary (protobuf) codecs for events.
//!
//! Binary frames carry a small protobuf envelope whose payload is the
//! event's JSON shape expressed as a `google.protobuf.Value`, so both
//! transports decode into the same tagged enums.

use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Error returned by the decode and encode helpers.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf envelope.
    #[error("failed to decode protobuf envelope: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The JSON shape did not match any known event.
    #[error("invalid event payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The envelope carried no payload.
    #[error("envelope has no event payload")]
    MissingPayload,
}

/// Encode an event as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_text<T: Serialize>(event: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

/// Decode an event from a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed JSON or unknown event shapes.
pub fn decode_text<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode an event into protobuf envelope bytes.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if the event cannot be represented as JSON.
pub fn encode_binary<T: Serialize>(event: &T) -> Result<Vec<u8>, CodecError> {
    let payload = serde_json::to_value(event)?;
    let kind = payload.get("type").and_then(Value::as_str).unwrap_or_default().to_owned();
    let wire = WireEnvelope { ts: now_ms(), event: Some(json_to_proto_value(&payload)), kind };
    Ok(wire.encode_to_vec())
}

/// Decode protobuf envelope bytes into an event.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes,
/// [`CodecError::MissingPayload`] for an empty envelope, and
/// [`CodecError::Json`] when the payload is not a known event.
pub fn decode_binary<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let wire = WireEnvelope::decode(bytes)?;
    let payload = wire.event.ok_or(CodecError::MissingPayload)?;
    Ok(serde_json::from_value(proto_to_json_value(&payload))?)
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => prost_types::value::Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(v) => prost_types::value::Kind::BoolValue(*v),
        Value::Number(v) => prost_types::value::Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => prost_types::value::Kind::StringValue(v.clone()),
        Value::Array(v) => prost_types::value::Kind::ListValue(prost_types::ListValue {
            values: v.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(v) => prost_types::value::Kind::StructValue(prost_types::Struct {
            fields: v
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        prost_types::value::Kind::NullValue(_) => Value::Null,
        prost_types::value::Kind::NumberValue(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
        prost_types::value::Kind::StringValue(v) => Value::String(v.clone()),
        prost_types::value::Kind::BoolValue(v) => Value::Bool(*v),
        prost_types::value::Kind::StructValue(v) => Value::Object(
            v.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect::<Map<_, _>>(),
        ),
        prost_types::value::Kind::ListValue(v) => Value::Array(v.values.iter().map(proto_to_json_value).collect()),
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireEnvelope {
    #[prost(int64, tag = "1")]
    ts: i64,
    #[prost(message, optional, tag = "2")]
    event: Option<prost_types::Value>,
    /// Event `type` tag, readable without decoding the payload.
    #[prost(string, tag = "3")]
    kind: String,
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
