use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::client::attendance::models::AttendanceDay;
use crate::timer::clock::Clock;
use crate::timer::metrics::LiveState;

pub const TICK: Duration = Duration::from_millis(1000);

/// Owns the background task that keeps [`LiveState`] current.
///
/// The state is recomputed as soon as the snapshot changes and then once per
/// [`TICK`] while a session is open. With no open session the task only waits
/// for the next snapshot. Dropping the handle cancels the task.
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(
        snapshot: watch::Receiver<Option<AttendanceDay>>,
        clock: Arc<dyn Clock>,
        out: watch::Sender<Option<LiveState>>,
    ) -> Self {
        let handle = tokio::spawn(run(snapshot, clock, out));
        Ticker {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn evaluate(
    snapshot: &watch::Receiver<Option<AttendanceDay>>,
    clock: &dyn Clock,
) -> Option<LiveState> {
    snapshot
        .borrow()
        .as_ref()
        .map(|day| LiveState::evaluate(day, clock.now()))
}

async fn run(
    mut snapshot: watch::Receiver<Option<AttendanceDay>>,
    clock: Arc<dyn Clock>,
    out: watch::Sender<Option<LiveState>>,
) {
    loop {
        snapshot.borrow_and_update();
        let state = evaluate(&snapshot, clock.as_ref());
        let active = state.as_ref().is_some_and(LiveState::is_checked_in);
        out.send_replace(state);

        if !active {
            if snapshot.changed().await.is_err() {
                return;
            }
            continue;
        }

        let mut interval = interval_at(Instant::now() + TICK, TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    out.send_replace(evaluate(&snapshot, clock.as_ref()));
                }
                changed = snapshot.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}
