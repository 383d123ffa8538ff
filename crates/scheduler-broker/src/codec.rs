//! `MessageCodec` (spec.md §4.1): envelope encode/decode and the opaque
//! binary serializer used for `function`/`args`/`kwargs`/`time_to_start`
//! blobs.
//!
//! The binary encoder is `serde_json::to_vec`/`from_slice` over
//! `serde_json::Value` — any JSON-representable argument graph round-trips
//! (a self-describing format is required here since the value being carried
//! is itself a `Value`: `bincode`'s `Deserializer` rejects
//! `deserialize_any`, which `Value`'s `Deserialize` impl depends on). The
//! base64 wrapping of the encoded bytes is the wire contract spec.md §4.1
//! calls out explicitly, not an implementation detail.

use base64::Engine;
use scheduler_shared::error::CodecError;
use scheduler_shared::envelope::Envelope;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// JSON-serializes an envelope. Blob fields inside `arguments` are expected
/// to already be base64 strings produced by [`serialize`].
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(envelope).map_err(|e| CodecError::MalformedEnvelope(e.to_string()))
}

/// Parses a wire message into an [`Envelope`], distinguishing a JSON syntax
/// failure from a structurally incomplete (but syntactically valid) one.
pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            CodecError::MalformedJson(e.to_string())
        } else {
            CodecError::MalformedEnvelope(e.to_string())
        }
    })
}

/// base64(json(value)) — the binary encoding used for every `<b64>` field
/// in spec.md §6.
pub fn serialize(value: &serde_json::Value) -> Result<String, CodecError> {
    let bytes =
        serde_json::to_vec(value).map_err(|e| CodecError::Unserializable(e.to_string()))?;
    Ok(B64.encode(bytes))
}

/// Inverse of [`serialize`].
pub fn deserialize(encoded: &str) -> Result<serde_json::Value, CodecError> {
    let bytes = B64
        .decode(encoded)
        .map_err(|source| CodecError::MalformedBase64 {
            field: "<b64>",
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|e| CodecError::Deserialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_shared::envelope::MessageType;

    #[test]
    fn decode_encode_round_trips_for_every_envelope_shape() {
        let shapes = vec![
            Envelope::new(
                "id-1",
                "client-a",
                MessageType::Initialization,
                serde_json::json!({"enable_overdue": true}),
            ),
            Envelope::new(
                "id-2",
                "client-a",
                MessageType::Info,
                serde_json::json!({"responce": 0}),
            ),
            Envelope::new(
                "id-3",
                "client-a",
                MessageType::Error,
                serde_json::json!({"error_code": 3, "message": "bad"}),
            ),
            Envelope::new(
                "id-4",
                "client-a",
                MessageType::Task,
                serde_json::json!({
                    "lifetime": 30,
                    "function": serialize(&serde_json::json!({"handler": "noop"})).unwrap(),
                    "args": serialize(&serde_json::json!([])).unwrap(),
                    "kwargs": serialize(&serde_json::json!({})).unwrap(),
                    "time_to_start": serialize(&serde_json::json!("2026-01-01T00:00:00Z")).unwrap(),
                    "hard": false,
                }),
            ),
            Envelope::new(
                "id-5",
                "client-a",
                MessageType::Cancel,
                serde_json::json!({"task_id": "t-1"}),
            ),
        ];

        for envelope in shapes {
            let bytes = encode(&envelope).unwrap();
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.id, envelope.id);
            assert_eq!(decoded.client, envelope.client);
            assert_eq!(decoded.arguments, envelope.arguments);
        }
    }

    #[test]
    fn decode_rejects_non_json_as_malformed_json() {
        let err = decode(b"not json at all {{{").unwrap_err();
        assert!(matches!(err, CodecError::MalformedJson(_)));
    }

    #[test]
    fn decode_rejects_missing_fields_as_malformed_envelope() {
        let err = decode(br#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEnvelope(_)));
    }

    #[test]
    fn serialize_deserialize_round_trips_arbitrary_json() {
        let value = serde_json::json!({"a": [1, 2, 3], "b": "text", "c": null});
        let encoded = serialize(&value).unwrap();
        let decoded = deserialize(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn deserialize_rejects_invalid_base64() {
        let err = deserialize("not-valid-base64!!").unwrap_err();
        assert!(matches!(err, CodecError::MalformedBase64 { .. }));
    }
}
