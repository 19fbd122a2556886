use chrono::{DateTime, FixedOffset, SecondsFormat, Timelike, Utc};

/// The deployment runs on Philippine time (UTC+8, no daylight saving).
/// Attendance dates and the check-in window are defined in this zone.
const LOCAL_UTC_OFFSET_SECS: i32 = 8 * 3600;

fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_UTC_OFFSET_SECS).expect("UTC+8 is a valid fixed offset")
}

/// One clock reading, captured once per scan and threaded through so the
/// date key, time string and classification all reflect the same instant.
#[derive(Debug, Clone, Copy)]
pub struct ScanInstant {
    utc: DateTime<Utc>,
    local: DateTime<FixedOffset>,
}

impl ScanInstant {
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(utc: DateTime<Utc>) -> Self {
        ScanInstant {
            utc,
            local: utc.with_timezone(&local_offset()),
        }
    }

    /// Local wall-clock time, used by the classifier.
    pub fn local_time(&self) -> chrono::NaiveTime {
        self.local.time()
    }

    /// `h:mm:ssam` / `h:mm:sspm` — 12-hour clock, no leading zero on the
    /// hour, midnight and noon fold to 12.
    pub fn time_of_day(&self) -> String {
        let hour = self.local.hour();
        let suffix = if hour >= 12 { "pm" } else { "am" };
        let hour12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!(
            "{}:{:02}:{:02}{}",
            hour12,
            self.local.minute(),
            self.local.second(),
            suffix
        )
    }

    /// `YYYY-MM-DD` in local time. This is the attendance ledger's date key.
    pub fn date_key(&self) -> String {
        self.local.format("%Y-%m-%d").to_string()
    }

    /// RFC 3339 UTC write timestamp with millisecond precision.
    pub fn created_at(&self) -> String {
        self.utc.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn at(rfc3339_utc: &str) -> ScanInstant {
        let utc = DateTime::parse_from_rfc3339(rfc3339_utc)
            .expect("parse instant")
            .with_timezone(&Utc);
        ScanInstant::from_utc(utc)
    }

    #[test]
    fn time_of_day_drops_leading_zero_and_folds_noon_midnight() {
        // 21:45:23 UTC = 5:45:23am local (+8).
        assert_eq!(at("2026-03-01T21:45:23Z").time_of_day(), "5:45:23am");
        // 04:00:00 UTC = 12:00:00pm local.
        assert_eq!(at("2026-03-02T04:00:00Z").time_of_day(), "12:00:00pm");
        // 16:00:05 UTC = 12:00:05am local.
        assert_eq!(at("2026-03-01T16:00:05Z").time_of_day(), "12:00:05am");
        // 08:05:09 UTC = 4:05:09pm local.
        assert_eq!(at("2026-03-02T08:05:09Z").time_of_day(), "4:05:09pm");
    }

    #[test]
    fn date_key_rolls_over_at_local_midnight_not_utc() {
        // 15:59 UTC is still Mar 1 local; 16:00 UTC is Mar 2 local.
        assert_eq!(at("2026-03-01T15:59:59Z").date_key(), "2026-03-01");
        assert_eq!(at("2026-03-01T16:00:00Z").date_key(), "2026-03-02");
    }

    #[test]
    fn created_at_is_utc_rfc3339_with_millis() {
        assert_eq!(
            at("2026-03-01T21:45:23Z").created_at(),
            "2026-03-01T21:45:23.000Z"
        );
    }
}
