//! Test fixtures and payload generators.

use chrono::Utc;
use etl_core::AnalyticsEvent;
use uuid::Uuid;

/// A view event with unique ids.
pub fn view_event() -> AnalyticsEvent {
    AnalyticsEvent::new(
        format!("user-{}", Uuid::new_v4()),
        format!("movie-{}", Uuid::new_v4()),
        Utc::now().timestamp_millis(),
    )
}

/// Wire payload for an event.
pub fn payload_for(event: &AnalyticsEvent) -> Vec<u8> {
    event.encode().unwrap()
}

/// A well-formed payload with unique ids.
pub fn valid_payload() -> Vec<u8> {
    payload_for(&view_event())
}

/// N well-formed payloads.
pub fn valid_payloads(n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|_| valid_payload()).collect()
}

/// A payload that is not JSON at all.
pub fn malformed_payload() -> Vec<u8> {
    b"{\"user_id\": \"u-1\", \"movie_id\":".to_vec()
}

/// Valid JSON with a mistyped field.
pub fn mistyped_payload() -> Vec<u8> {
    serde_json::json!({
        "user_id": "u-1",
        "movie_id": "m-1",
        "timestamp_ms": "yesterday"
    })
    .to_string()
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_decode_as_expected() {
        assert!(AnalyticsEvent::decode(&valid_payload()).is_ok());
        assert!(AnalyticsEvent::decode(&malformed_payload()).is_err());
        assert!(AnalyticsEvent::decode(&mistyped_payload()).is_err());
    }
}
