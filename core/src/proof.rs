//! Proof-of-purchase codec.
//!
//! A proof binds a ticket id to its event and issuance time in a compact
//! JSON payload, rendered as a QR code for scanning at the gate. The payload
//! is not signed: whoever can read a payload can replay it, which is why the
//! verification gate cross-checks the stored booking and admits each ticket
//! exactly once.

use chrono::{DateTime, TimeZone, Utc};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EventId, TicketId};

/// The decoded contents of a scanned proof of purchase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPayload {
    /// The ticket the proof admits
    pub ticket_id: TicketId,
    /// The event the ticket was sold for
    pub event_id: EventId,
    /// When the ticket was issued, as epoch milliseconds
    #[serde(rename = "issuedAtEpochMillis")]
    pub issued_at_ms: i64,
}

impl ProofPayload {
    /// Builds a payload stamped with `issued_at`.
    #[must_use]
    pub fn new(ticket_id: TicketId, event_id: EventId, issued_at: DateTime<Utc>) -> Self {
        Self {
            ticket_id,
            event_id,
            issued_at_ms: issued_at.timestamp_millis(),
        }
    }

    /// The issuance instant, when the stamp is a representable time.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.issued_at_ms).single()
    }
}

/// Serializes a payload to its scannable JSON text.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if serialization fails.
pub fn encode(payload: &ProofPayload) -> Result<String, CoreError> {
    serde_json::to_string(payload)
        .map_err(|e| CoreError::validation(format!("proof payload serialization failed: {e}")))
}

/// Parses scanned text back into a payload.
///
/// # Errors
///
/// Returns [`CoreError::MalformedProof`] when the text is not valid JSON,
/// is missing the ticket or event id, or carries an empty ticket token.
pub fn decode(raw: &str) -> Result<ProofPayload, CoreError> {
    let payload: ProofPayload =
        serde_json::from_str(raw).map_err(|e| CoreError::MalformedProof(e.to_string()))?;
    if payload.ticket_id.as_str().is_empty() {
        return Err(CoreError::MalformedProof("empty ticket id".to_string()));
    }
    Ok(payload)
}

/// Renders encoded proof text as an SVG QR code.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] when the text exceeds QR capacity.
pub fn render_qr_svg(encoded: &str) -> Result<String, CoreError> {
    let code = QrCode::with_error_correction_level(encoded.as_bytes(), EcLevel::M)
        .map_err(|e| CoreError::validation(format!("proof does not fit a barcode: {e}")))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn sample_payload() -> ProofPayload {
        ProofPayload::new(
            TicketId::from_token("h31vQkkBYYuzJAgzjqN9TttPKe9Lx9O1zSzSbsFY8bU".to_string()),
            EventId::new(),
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        )
    }

    #[test]
    fn encode_then_decode_returns_the_same_payload() {
        let payload = sample_payload();
        let text = encode(&payload).unwrap();
        assert_eq!(decode(&text).unwrap(), payload);
    }

    #[test]
    fn encoded_text_uses_the_documented_key_names() {
        let text = encode(&sample_payload()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("ticketId").is_some());
        assert!(value.get("eventId").is_some());
        assert!(value.get("issuedAtEpochMillis").is_some());
    }

    #[test]
    fn garbage_is_rejected_as_malformed() {
        assert!(matches!(
            decode("not a proof"),
            Err(CoreError::MalformedProof(_))
        ));
    }

    #[test]
    fn missing_event_id_is_rejected_as_malformed() {
        let text = r#"{"ticketId":"abc","issuedAtEpochMillis":0}"#;
        assert!(matches!(decode(text), Err(CoreError::MalformedProof(_))));
    }

    #[test]
    fn empty_ticket_id_is_rejected_as_malformed() {
        let text = format!(
            r#"{{"ticketId":"","eventId":"{}","issuedAtEpochMillis":0}}"#,
            Uuid::new_v4()
        );
        assert!(matches!(decode(&text), Err(CoreError::MalformedProof(_))));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let payload = sample_payload();
        let mut value: serde_json::Value =
            serde_json::from_str(&encode(&payload).unwrap()).unwrap();
        value["venueHint"] = serde_json::json!("door B");
        assert_eq!(decode(&value.to_string()).unwrap(), payload);
    }

    #[test]
    fn issued_at_round_trips_to_the_stamped_instant() {
        let issued = Utc.with_ymd_and_hms(2025, 7, 1, 18, 30, 0).unwrap();
        let payload = ProofPayload::new(
            TicketId::from_token("3vUJ5l0n4W0s9c2qFh7d8kzMbTQxYrGaCeDpLwnoiIA".to_string()),
            EventId::new(),
            issued,
        );
        assert_eq!(payload.issued_at().unwrap(), issued);
    }

    #[test]
    fn rendered_barcode_is_svg() {
        let text = encode(&sample_payload()).unwrap();
        let svg = render_qr_svg(&text).unwrap();
        assert!(svg.contains("<svg"));
    }

    proptest! {
        #[test]
        fn any_payload_survives_the_round_trip(
            token in "[A-Za-z0-9_-]{43}",
            event_seed in any::<u128>(),
            issued_at_ms in -8_000_000_000_000_i64..8_000_000_000_000,
        ) {
            let payload = ProofPayload {
                ticket_id: TicketId::from_token(token),
                event_id: EventId::from_uuid(Uuid::from_u128(event_seed)),
                issued_at_ms,
            };
            let text = encode(&payload).unwrap();
            prop_assert_eq!(decode(&text).unwrap(), payload);
        }
    }
}
