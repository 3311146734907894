use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;

use crate::client::attendance::models::{
    AttendanceDay, ClientMeta, PunchInRequest, PunchOutRequest,
};
use crate::client::attendance::services::AttendanceApi;
use crate::context::UserContext;
use crate::error::{PunchError, PunchResult};
use crate::logging::AuditLog;
use crate::timer::clock::Clock;
use crate::timer::metrics::LiveState;
use crate::timer::session::find_active_record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PunchState {
    CheckedOut,
    CheckedIn { record_id: String },
}

impl PunchState {
    pub fn of(day: Option<&AttendanceDay>) -> Self {
        match day.and_then(|d| find_active_record(&d.punch_records)) {
            Some(record) => PunchState::CheckedIn {
                record_id: record.id.clone(),
            },
            None => PunchState::CheckedOut,
        }
    }
}

/// Submits punches and owns the confirmed snapshot.
///
/// State only moves after the server accepts a punch *and* a fresh snapshot
/// has been fetched. Nothing is applied optimistically. Every fetch takes a
/// ticket when it is issued; a result older than the last published one is
/// dropped, so a slow refresh cannot undo a newer confirmed punch.
pub struct PunchDispatcher {
    api: Arc<dyn AttendanceApi>,
    context: Arc<UserContext>,
    client_meta: ClientMeta,
    clock: Arc<dyn Clock>,
    audit: AuditLog,
    note_required_before_schedule: bool,
    snapshot: watch::Sender<Option<AttendanceDay>>,
    in_flight: AtomicBool,
    next_fetch: AtomicU64,
    published_fetch: AtomicU64,
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PunchDispatcher {
    pub fn new(
        api: Arc<dyn AttendanceApi>,
        context: Arc<UserContext>,
        client_meta: ClientMeta,
        clock: Arc<dyn Clock>,
        audit: AuditLog,
    ) -> Self {
        let (snapshot, _) = watch::channel(None);
        PunchDispatcher {
            api,
            context,
            client_meta,
            clock,
            audit,
            note_required_before_schedule: false,
            snapshot,
            in_flight: AtomicBool::new(false),
            next_fetch: AtomicU64::new(0),
            published_fetch: AtomicU64::new(0),
        }
    }

    pub fn with_note_required_before_schedule(mut self, required: bool) -> Self {
        self.note_required_before_schedule = required;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AttendanceDay>> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> Option<AttendanceDay> {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> PunchState {
        PunchState::of(self.snapshot.borrow().as_ref())
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Live view of the current snapshot at the dispatcher's clock.
    pub fn live_state(&self) -> Option<LiveState> {
        let now = self.clock.now();
        self.snapshot
            .borrow()
            .as_ref()
            .map(|day| LiveState::evaluate(day, now))
    }

    /// Fetches today's attendance and publishes it.
    ///
    /// A result that arrives after a newer one has been published is discarded.
    pub async fn refresh(&self) -> PunchResult<()> {
        let ticket = self.fetch_ticket();
        let day = self
            .api
            .get_today_attendance()
            .await
            .map_err(|e| self.fail("refresh", e))?;
        self.publish(ticket, day);
        Ok(())
    }

    pub async fn punch_in(&self, project_id: &str, work_site_id: &str) -> PunchResult<PunchState> {
        let project_id = project_id.trim();
        let work_site_id = work_site_id.trim();
        if project_id.is_empty() {
            return Err(self.fail("punch in", PunchError::MissingSelection("project")));
        }
        if work_site_id.is_empty() {
            return Err(self.fail("punch in", PunchError::MissingSelection("work site")));
        }
        if let PunchState::CheckedIn { .. } = self.state() {
            return Err(self.fail("punch in", PunchError::AlreadyCheckedIn));
        }

        let _in_flight = self.begin("punch in")?;
        let request = PunchInRequest {
            user_id: self.context.user_id.clone(),
            project_id: project_id.to_string(),
            work_site_id: work_site_id.to_string(),
            client: self.client_meta.clone(),
        };

        let record = self
            .api
            .punch_in(request)
            .await
            .map_err(|e| self.fail("punch in", e))?;
        self.audit.info(&format!(
            "punch in accepted: record {} project {} site {}",
            record.id, project_id, work_site_id
        ));

        self.refetch_after("punch in").await
    }

    pub async fn punch_out(&self, note: Option<&str>) -> PunchResult<PunchState> {
        let note = note.map(str::trim).filter(|n| !n.is_empty());

        let Some(live) = self.live_state() else {
            return Err(self.fail("punch out", PunchError::NotCheckedIn));
        };
        let Some(record_id) = live.active.as_ref().map(|s| s.record_id.clone()) else {
            return Err(self.fail("punch out", PunchError::NotCheckedIn));
        };
        if let Some(wait) = live.checkout_unlocks_in() {
            let remaining_secs = (wait.num_milliseconds() + 999) / 1000;
            return Err(self.fail("punch out", PunchError::CheckoutLocked { remaining_secs }));
        }
        if self.note_required_before_schedule && note.is_none() && !live.metrics.schedule_met() {
            return Err(self.fail("punch out", PunchError::NoteRequired));
        }

        let _in_flight = self.begin("punch out")?;
        let request = PunchOutRequest {
            user_id: self.context.user_id.clone(),
            punch_record_id: record_id,
            note: note.map(str::to_string),
            client: self.client_meta.clone(),
        };

        let record = self
            .api
            .punch_out(request)
            .await
            .map_err(|e| self.fail("punch out", e))?;
        self.audit
            .info(&format!("punch out accepted: record {}", record.id));

        self.refetch_after("punch out").await
    }

    fn begin(&self, action: &str) -> PunchResult<InFlight<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(self.fail(action, PunchError::Busy));
        }
        Ok(InFlight(&self.in_flight))
    }

    async fn refetch_after(&self, action: &str) -> PunchResult<PunchState> {
        let ticket = self.fetch_ticket();
        match self.api.get_today_attendance().await {
            Ok(day) => {
                self.publish(ticket, day);
                Ok(self.state())
            }
            Err(e) => Err(self.fail(&format!("{} accepted, refresh", action), e)),
        }
    }

    fn fetch_ticket(&self) -> u64 {
        self.next_fetch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns false when a newer fetch has already been published.
    fn publish(&self, ticket: u64, day: AttendanceDay) -> bool {
        let open = day.punch_records.iter().filter(|r| r.is_open()).count();
        let published = self.snapshot.send_if_modified(|current| {
            // checked under the channel's write lock so publishes cannot interleave
            if ticket <= self.published_fetch.load(Ordering::Acquire) {
                return false;
            }
            self.published_fetch.store(ticket, Ordering::Release);
            *current = Some(day);
            true
        });

        if !published {
            tracing::debug!(ticket, "dropping stale attendance snapshot");
        } else if open > 1 {
            let err = PunchError::Inconsistent(format!("{} open punch records", open));
            self.audit.warn(&err.to_string());
        }
        published
    }

    fn fail(&self, action: &str, err: PunchError) -> PunchError {
        match err {
            PunchError::Busy | PunchError::CheckoutLocked { .. } => {
                self.audit.warn(&format!("{} refused: {}", action, err))
            }
            _ => self.audit.error(&format!("{} failed: {}", action, err)),
        }
        err
    }
}
