use crate::client::attendance::models::PunchRecord;

/// First record without a punch-out, if any.
///
/// The server guarantees at most one open record per day. If that ever
/// breaks, the first open record wins and the inconsistency is logged.
pub fn find_active_record(records: &[PunchRecord]) -> Option<&PunchRecord> {
    let mut open = records.iter().filter(|record| record.is_open());
    let active = open.next()?;

    let extra: Vec<&str> = open.map(|record| record.id.as_str()).collect();
    if !extra.is_empty() {
        tracing::debug!(
            active = %active.id,
            ignored = ?extra,
            "more than one open punch record; using the first"
        );
    }

    Some(active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, hour: u32, closed: bool) -> PunchRecord {
        let punch_in = Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap();
        PunchRecord {
            id: id.to_string(),
            punch_in,
            punch_out: closed.then(|| punch_in + chrono::Duration::minutes(30)),
            project_id: None,
            work_site_id: None,
            note: None,
        }
    }

    #[test]
    fn empty_day_has_no_active_record() {
        assert!(find_active_record(&[]).is_none());
    }

    #[test]
    fn all_closed_has_no_active_record() {
        let records = vec![record("a", 8, true), record("b", 10, true)];
        assert!(find_active_record(&records).is_none());
    }

    #[test]
    fn finds_the_open_record() {
        let records = vec![record("a", 8, true), record("b", 10, false)];
        assert_eq!(find_active_record(&records).map(|r| r.id.as_str()), Some("b"));
    }

    #[test]
    fn several_open_records_pick_the_first() {
        let records = vec![
            record("a", 8, true),
            record("b", 9, false),
            record("c", 10, false),
        ];
        assert_eq!(find_active_record(&records).map(|r| r.id.as_str()), Some("b"));
    }
}
