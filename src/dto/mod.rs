use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Room and series payloads.
pub mod duel;
/// Health payload.
pub mod health;
/// Custom validators for request fields.
pub mod validation;

/// Render an instant the way every room payload exposes timestamps.
pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timestamps_are_rfc3339() {
        let instant = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);
        assert_eq!(format_system_time(instant), "2024-01-01T00:00:00Z");
    }
}
