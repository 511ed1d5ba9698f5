use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use super::controller::SessionCell;
use super::session::{SessionState, SubmitTrigger, Tick};

/// The countdown task for one timed quiz attempt.
///
/// Ticks the shared session once per second. On expiry it runs the one
/// auto-submit — scoring, persistence, outcome — under the session mutex and
/// stops. It also stops, silently, the moment the session leaves
/// `InProgress` by any other path, so a stray tick can never touch a
/// finalized attempt.
pub(crate) struct CountdownTimer {
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    pub(crate) fn spawn(cell: Arc<SessionCell>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticks = interval(Duration::from_secs(1));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);
            // The first tick resolves immediately; the countdown starts one
            // second from now.
            ticks.tick().await;

            loop {
                ticks.tick().await;
                let mut session = cell.session.lock().await;
                if session.state() != SessionState::InProgress {
                    break;
                }
                match session.tick() {
                    Tick::Counting(_) => {}
                    Tick::Inactive => break,
                    Tick::Expired => {
                        let now = cell.clock.now();
                        if let Ok(attempt) = session.finish(now, SubmitTrigger::TimeExpired) {
                            let outcome = cell.persist(attempt, SubmitTrigger::TimeExpired).await;
                            *cell.outcome.lock().await = Some(outcome);
                        }
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    /// Stop the countdown. Idempotent; also runs on drop.
    pub(crate) fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
