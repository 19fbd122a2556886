use crate::clock::ScanInstant;
use chrono::{NaiveTime, Timelike};

/// A code carrying this marker is a check-in code; anything else is
/// treated as a check-out code.
const CHECK_IN_MARKER: &str = "_IN_";

/// User-facing messages, kept byte-for-byte with what the mobile app shows.
pub const MSG_INVALID: &str = "Invalid QRcode";
pub const MSG_SCANNED: &str = "Your QRcode is Scanned";

/// Check-in window: scans before 05:30:00 local are rejected, scans up to
/// and including 06:00:00 are on time, anything later is late.
const EARLIEST_CHECK_IN_SECS: u32 = 5 * 3600 + 30 * 60;
const ON_TIME_CUTOFF_SECS: u32 = 6 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn from_code(code: &str) -> Self {
        if code.contains(CHECK_IN_MARKER) {
            Direction::In
        } else {
            Direction::Out
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Invalid,
    Present,
    Absent,
    Scanned,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Invalid => "invalid",
            ScanStatus::Present => "present",
            ScanStatus::Absent => "absent",
            ScanStatus::Scanned => "scanned",
        }
    }
}

/// The whole attendance policy. Check-outs carry no time gate; check-ins
/// are classified against the morning window, with both boundaries
/// inclusive in `Present`.
pub fn classify(direction: Direction, local_time: NaiveTime) -> ScanStatus {
    match direction {
        Direction::Out => ScanStatus::Scanned,
        Direction::In => {
            let secs = local_time.num_seconds_from_midnight();
            if secs < EARLIEST_CHECK_IN_SECS {
                ScanStatus::Invalid
            } else if secs <= ON_TIME_CUTOFF_SECS {
                ScanStatus::Present
            } else {
                ScanStatus::Absent
            }
        }
    }
}

/// Read side of the student directory: which student owns a code.
/// Matching is exact and case-sensitive against either of the two codes.
pub trait UserDirectory {
    fn find_by_code(&self, code: &str) -> anyhow::Result<Option<crate::store::Student>>;
}

/// One row per (email, date, direction); a re-scan replaces time and status.
pub trait AttendanceLedger {
    fn upsert(&self, rec: &AttendanceUpsert<'_>) -> anyhow::Result<()>;
}

/// Append-only audit trail of every scan attempt that resolved to a student.
pub trait ScanHistory {
    fn append(&self, entry: &HistoryAppend<'_>) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct AttendanceUpsert<'a> {
    pub user_email: &'a str,
    pub date: &'a str,
    pub scan_time: &'a str,
    pub status: ScanStatus,
    pub direction: Direction,
    pub created_at: &'a str,
}

#[derive(Debug)]
pub struct HistoryAppend<'a> {
    pub user_email: &'a str,
    pub qr_code: &'a str,
    pub direction: Direction,
    pub scan_time: &'a str,
    pub status: ScanStatus,
    pub message: &'a str,
    pub created_at: &'a str,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub success: bool,
    pub status: ScanStatus,
    pub message: &'static str,
    /// Absent only when the code resolved to no student.
    pub detail: Option<ScanDetail>,
}

#[derive(Debug, Clone)]
pub struct ScanDetail {
    pub user_email: String,
    pub user_name: String,
    pub direction: Direction,
    pub scan_time: String,
    pub date: String,
}

/// Orchestrates lookup, classification and the two best-effort writes.
/// The ports are injected at construction; the processor holds no database
/// handle of its own.
pub struct ScanProcessor<'a> {
    directory: &'a dyn UserDirectory,
    ledger: &'a dyn AttendanceLedger,
    history: &'a dyn ScanHistory,
}

impl<'a> ScanProcessor<'a> {
    pub fn new(
        directory: &'a dyn UserDirectory,
        ledger: &'a dyn AttendanceLedger,
        history: &'a dyn ScanHistory,
    ) -> Self {
        ScanProcessor {
            directory,
            ledger,
            history,
        }
    }

    /// Turns one raw code plus one clock reading into a classified outcome.
    ///
    /// Ledger and history writes are best-effort: a failure in either is
    /// logged and does not abort the sibling write or the response. Only a
    /// directory lookup failure propagates as an error.
    pub fn process(&self, raw_code: &str, at: &ScanInstant) -> anyhow::Result<ScanOutcome> {
        let Some(user) = self.directory.find_by_code(raw_code)? else {
            // Unresolved codes leave no audit trail. Known asymmetry with
            // the too-early path, kept as-is.
            return Ok(ScanOutcome {
                success: false,
                status: ScanStatus::Invalid,
                message: MSG_INVALID,
                detail: None,
            });
        };

        let direction = Direction::from_code(raw_code);
        let scan_time = at.time_of_day();
        let date = at.date_key();
        let created_at = at.created_at();
        let status = classify(direction, at.local_time());

        let detail = ScanDetail {
            user_email: user.email.clone(),
            user_name: user.name.clone(),
            direction,
            scan_time: scan_time.clone(),
            date: date.clone(),
        };

        if status == ScanStatus::Invalid {
            // Too early for check-in: audit trail only, no ledger row.
            let entry = HistoryAppend {
                user_email: &user.email,
                qr_code: raw_code,
                direction,
                scan_time: &scan_time,
                status,
                message: MSG_INVALID,
                created_at: &created_at,
            };
            if let Err(e) = self.history.append(&entry) {
                tracing::error!(error = %e, email = %user.email, "scan history append failed");
            }
            return Ok(ScanOutcome {
                success: false,
                status,
                message: MSG_INVALID,
                detail: Some(detail),
            });
        }

        if let Err(e) = self.ledger.upsert(&AttendanceUpsert {
            user_email: &user.email,
            date: &date,
            scan_time: &scan_time,
            status,
            direction,
            created_at: &created_at,
        }) {
            tracing::error!(error = %e, email = %user.email, "attendance upsert failed");
        }
        if let Err(e) = self.history.append(&HistoryAppend {
            user_email: &user.email,
            qr_code: raw_code,
            direction,
            scan_time: &scan_time,
            status,
            message: MSG_SCANNED,
            created_at: &created_at,
        }) {
            tracing::error!(error = %e, email = %user.email, "scan history append failed");
        }

        Ok(ScanOutcome {
            success: true,
            status,
            message: MSG_SCANNED,
            detail: Some(detail),
        })
    }
}
