use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::client::attendance::models::{
    ApiResponse, AttendanceDay, PunchInRequest, PunchOutRequest, PunchRecord,
};
use crate::context::UserContext;
use crate::error::{PunchError, PunchResult};

/// The remote attendance operations the timer depends on.
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    async fn get_today_attendance(&self) -> PunchResult<AttendanceDay>;

    /// Fails server-side if a session is already open.
    async fn punch_in(&self, request: PunchInRequest) -> PunchResult<PunchRecord>;

    /// Fails server-side if no session is open or the session is too young.
    async fn punch_out(&self, request: PunchOutRequest) -> PunchResult<PunchRecord>;
}

pub struct HttpAttendanceApi {
    client: reqwest::Client,
    domain_api: String,
    context: Arc<UserContext>,
}

impl HttpAttendanceApi {
    pub fn new(domain_api: impl Into<String>, context: Arc<UserContext>) -> Self {
        HttpAttendanceApi {
            client: reqwest::Client::new(),
            domain_api: domain_api.into().trim_end_matches('/').to_string(),
            context,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/attendance/{}", self.domain_api, path)
    }

    fn headers(&self) -> PunchResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.context.auth_token))
            .map_err(|_| PunchError::InvalidToken)?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl AttendanceApi for HttpAttendanceApi {
    async fn get_today_attendance(&self) -> PunchResult<AttendanceDay> {
        let url = self.url("today");
        tracing::debug!(%url, "fetching today's attendance");

        let res = self
            .client
            .get(url)
            .headers(self.headers()?)
            .query(&[("userId", self.context.user_id.as_str())])
            .send()
            .await?;

        read_envelope(res).await
    }

    async fn punch_in(&self, request: PunchInRequest) -> PunchResult<PunchRecord> {
        let url = self.url("punch-in");
        tracing::debug!(%url, project = %request.project_id, site = %request.work_site_id, "punch in");

        let res = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        read_envelope(res).await
    }

    async fn punch_out(&self, request: PunchOutRequest) -> PunchResult<PunchRecord> {
        let url = self.url("punch-out");
        tracing::debug!(%url, record = %request.punch_record_id, "punch out");

        let res = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        read_envelope(res).await
    }
}

async fn read_envelope<T: DeserializeOwned>(res: reqwest::Response) -> PunchResult<T> {
    let status = res.status();
    let body = res.text().await?;
    decode_envelope(status, &body)
}

/// Maps status + body to the payload, a rejection, or a malformed-response error.
pub fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> PunchResult<T> {
    let parsed = serde_json::from_str::<ApiResponse<T>>(body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(PunchError::Rejected { status, message });
    }

    let envelope = parsed.map_err(|e| PunchError::MalformedResponse(e.to_string()))?;
    if !envelope.success {
        return Err(PunchError::Rejected {
            status,
            message: envelope.message.unwrap_or_else(|| "request not accepted".to_string()),
        });
    }

    envelope
        .data
        .ok_or_else(|| PunchError::MalformedResponse("success without data".to_string()))
}
