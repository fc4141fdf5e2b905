use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Suffix of the topic the modem listens on for outbound frames.
pub const REQUEST_TOPIC_SUFFIX: &str = "/set";

#[derive(Serialize)]
struct Outbound<'a> {
    action: &'a [u8],
}

/// Extract the frame bytes from an inbound bus payload.
///
/// Frames travel as `{"action": [7, 0, ...]}`. The modem also echoes plain
/// string actions; those carry no frame and give `Ok(None)`. Fails only if the
/// payload is not a JSON object.
pub fn decode_action(payload: &str) -> Result<Option<Vec<u8>>> {
    let mut envelope: Map<String, Value> = serde_json::from_str(payload)?;
    let Some(Value::Array(items)) = envelope.remove("action") else {
        return Ok(None);
    };
    if items.is_empty() {
        return Ok(None);
    }

    let bytes: Option<Vec<u8>> = items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect();
    if bytes.is_none() {
        tracing::debug!("Action array is not a byte sequence: {}", payload);
    }
    Ok(bytes)
}

/// Wrap an outbound frame for publishing.
pub fn encode_action(frame: &[u8]) -> Result<String> {
    Ok(serde_json::to_string(&Outbound { action: frame })?)
}

#[must_use]
pub fn request_topic(topic: &str) -> String {
    format!("{}{}", topic, REQUEST_TOPIC_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MercuryError;

    #[test]
    fn byte_array_action() {
        let frame = decode_action(r#"{"action": [7, 0, 91, 34, 99, 1, 2], "linkquality": 120}"#)
            .unwrap()
            .unwrap();
        assert_eq!(frame, vec![7, 0, 91, 34, 99, 1, 2]);
    }

    #[test]
    fn string_and_missing_actions_are_ignored() {
        assert_eq!(decode_action(r#"{"action": "get_status"}"#).unwrap(), None);
        assert_eq!(decode_action(r#"{"action": []}"#).unwrap(), None);
        assert_eq!(decode_action(r#"{"linkquality": 87}"#).unwrap(), None);
        assert_eq!(decode_action(r#"{"action": [1, 256]}"#).unwrap(), None);
        assert_eq!(decode_action(r#"{"action": [1, -1]}"#).unwrap(), None);
    }

    #[test]
    fn non_json_payload() {
        assert!(matches!(decode_action("not json"), Err(MercuryError::Json(_))));
    }

    #[test]
    fn envelope_must_be_an_object() {
        assert!(matches!(decode_action("[[7,0,91]]"), Err(MercuryError::Json(_))));
        assert!(matches!(decode_action("[7,0,91]"), Err(MercuryError::Json(_))));
        assert!(matches!(decode_action("42"), Err(MercuryError::Json(_))));
    }

    #[test]
    fn outbound_envelope() {
        assert_eq!(
            encode_action(&[7, 0, 0, 91, 34, 99, 13, 90]).unwrap(),
            r#"{"action":[7,0,0,91,34,99,13,90]}"#
        );
        assert_eq!(
            request_topic("zigbee2mqtt/electricity_counter"),
            "zigbee2mqtt/electricity_counter/set"
        );
    }
}
