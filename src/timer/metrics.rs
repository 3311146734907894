//! Live attendance metrics derived from a snapshot and the current time.
//!
//! Nothing here is persisted: every tick rebuilds a [`LiveState`] from the
//! last confirmed [`AttendanceDay`] and one `now` reading, so the guard and
//! the displayed numbers can never disagree.

use chrono::{DateTime, Duration, Utc};

use crate::client::attendance::models::AttendanceDay;
use crate::timer::session::find_active_record;

/// Checkout stays disabled for this many milliseconds after punching in.
pub const CHECKOUT_GUARD_MS: i64 = 60_000;

/// Largest value the `HH:MM:SS` display renders.
pub const DISPLAY_CEILING: &str = "99:59:59";

const MAX_DISPLAY_SECS: i64 = 99 * 3600 + 59 * 60 + 59;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveMetrics {
    pub elapsed_in_session: Duration,
    pub live_total: Duration,
    pub schedule: Duration,
    pub remaining: Duration,
    pub overtime: Duration,
}

impl LiveMetrics {
    pub fn compute(day: &AttendanceDay, now: DateTime<Utc>) -> Self {
        let elapsed = find_active_record(&day.punch_records)
            .map(|record| elapsed_since(record.punch_in, now))
            .unwrap_or_else(Duration::zero);
        Self::from_parts(day, elapsed)
    }

    fn from_parts(day: &AttendanceDay, elapsed: Duration) -> Self {
        let schedule = Duration::minutes(i64::from(day.schedule_minutes));
        let live_total = Duration::minutes(i64::from(day.total_minutes)) + elapsed;

        LiveMetrics {
            elapsed_in_session: elapsed,
            live_total,
            schedule,
            remaining: (schedule - live_total).max(Duration::zero()),
            overtime: (live_total - schedule).max(Duration::zero()),
        }
    }

    pub fn live_total_minutes(&self) -> f64 {
        as_minutes(self.live_total)
    }

    pub fn remaining_minutes(&self) -> f64 {
        as_minutes(self.remaining)
    }

    pub fn overtime_minutes(&self) -> f64 {
        as_minutes(self.overtime)
    }

    pub fn schedule_met(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// `now - punch_in`, clamped so clock skew never yields a negative session.
pub fn elapsed_since(punch_in: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - punch_in).max(Duration::zero())
}

pub fn checkout_locked(has_active: bool, elapsed: Duration) -> bool {
    has_active && elapsed.num_milliseconds() < CHECKOUT_GUARD_MS
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub record_id: String,
    pub punch_in: DateTime<Utc>,
}

/// Metrics and guard for a single instant.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveState {
    pub now: DateTime<Utc>,
    pub active: Option<ActiveSession>,
    pub metrics: LiveMetrics,
    pub checkout_locked: bool,
}

impl LiveState {
    pub fn evaluate(day: &AttendanceDay, now: DateTime<Utc>) -> Self {
        let active = find_active_record(&day.punch_records).map(|record| ActiveSession {
            record_id: record.id.clone(),
            punch_in: record.punch_in,
        });
        let elapsed = active
            .as_ref()
            .map(|session| elapsed_since(session.punch_in, now))
            .unwrap_or_else(Duration::zero);
        let metrics = LiveMetrics::from_parts(day, elapsed);

        LiveState {
            now,
            checkout_locked: checkout_locked(active.is_some(), elapsed),
            active,
            metrics,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.active.is_some()
    }

    /// Time left before checkout is allowed, `None` once it is.
    pub fn checkout_unlocks_in(&self) -> Option<Duration> {
        self.checkout_locked
            .then(|| Duration::milliseconds(CHECKOUT_GUARD_MS) - self.metrics.elapsed_in_session)
    }
}

fn as_minutes(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 60_000.0
}

/// `HH:MM:SS`, floored to the second, saturating at [`DISPLAY_CEILING`].
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.num_seconds().clamp(0, MAX_DISPLAY_SECS);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Same display for a fractional minute count.
pub fn format_minutes(minutes: f64) -> String {
    if !minutes.is_finite() || minutes <= 0.0 {
        return if minutes == f64::INFINITY {
            DISPLAY_CEILING.to_string()
        } else {
            "00:00:00".to_string()
        };
    }

    let hours = (minutes / 60.0).floor();
    if hours > 99.0 {
        return DISPLAY_CEILING.to_string();
    }
    let rest = minutes - hours * 60.0;
    let whole = rest.floor();
    let seconds = ((rest - whole) * 60.0).floor().min(59.0);

    format!("{:02}:{:02}:{:02}", hours as i64, whole as i64, seconds as i64)
}
