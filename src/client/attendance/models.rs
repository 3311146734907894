use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Today's attendance for one user, as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDay {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub schedule_minutes: u32,
    /// Closed sessions only; the open one is added live on the client.
    pub total_minutes: u32,
    #[serde(default)]
    pub punch_records: Vec<PunchRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchRecord {
    pub id: String,
    pub punch_in: DateTime<Utc>,
    #[serde(default)]
    pub punch_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub work_site_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl PunchRecord {
    pub fn is_open(&self) -> bool {
        self.punch_out.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMeta {
    pub ip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchInRequest {
    pub user_id: String,
    pub project_id: String,
    pub work_site_id: String,
    #[serde(flatten)]
    pub client: ClientMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchOutRequest {
    pub user_id: String,
    pub punch_record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub client: ClientMeta,
}

/// Envelope every endpoint answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_today_snapshot() {
        let body = r#"{
            "success": true,
            "data": {
                "date": "2026-10-19",
                "scheduleMinutes": 480,
                "totalMinutes": 125,
                "punchRecords": [
                    {"id": "r1", "punchIn": "2026-10-19T08:00:00Z", "punchOut": "2026-10-19T10:05:00Z",
                     "projectId": "p-1", "workSiteId": "hq"},
                    {"id": "r2", "punchIn": "2026-10-19T11:00:00Z", "punchOut": null}
                ]
            }
        }"#;

        let parsed: ApiResponse<AttendanceDay> = serde_json::from_str(body).unwrap();
        let day = parsed.data.unwrap();

        assert!(parsed.success);
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2026, 10, 19));
        assert_eq!(day.schedule_minutes, 480);
        assert_eq!(day.punch_records.len(), 2);
        assert!(!day.punch_records[0].is_open());
        assert!(day.punch_records[1].is_open());
        assert_eq!(
            day.punch_records[1].punch_in,
            Utc.with_ymd_and_hms(2026, 10, 19, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn empty_day_defaults_records() {
        let day: AttendanceDay =
            serde_json::from_str(r#"{"scheduleMinutes": 480, "totalMinutes": 0}"#).unwrap();
        assert!(day.punch_records.is_empty());
        assert!(day.date.is_none());
    }

    #[test]
    fn punch_out_omits_missing_note_and_flattens_meta() {
        let request = PunchOutRequest {
            user_id: "emp-7".into(),
            punch_record_id: "r2".into(),
            note: None,
            client: ClientMeta {
                ip: "10.0.0.2".into(),
                latitude: 1.5,
                longitude: -2.0,
                device: "kiosk".into(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["punchRecordId"], "r2");
        assert_eq!(json["ip"], "10.0.0.2");
        assert_eq!(json["device"], "kiosk");
        assert!(json.get("note").is_none());
    }

    #[test]
    fn rejection_envelope_has_no_data() {
        let parsed: ApiResponse<PunchRecord> =
            serde_json::from_str(r#"{"success": false, "message": "No open session"}"#).unwrap();
        assert!(!parsed.success);
        assert!(parsed.data.is_none());
        assert_eq!(parsed.message.as_deref(), Some("No open session"));
    }
}
