//! Overdue-notification scheduling.
//!
//! A dispatch pass looks at every running session with a due time, computes
//! its overrun step (15-minute buckets past `planned_end_at`), and sends at
//! most one message per session per pass to every active subscription of the
//! session's owner. A step is recorded as notified only when at least one
//! delivery succeeded, so an all-failed step is retried on the next pass.
//! Failures of individual subscriptions never abort the pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::delivery::{DeliveryOutcome, PushDelivery};
use super::subscription::PushSubscription;
use crate::clock::Clock;
use crate::error::CoreError;
use crate::owner::OwnerId;
use crate::session::types::SessionType;
use crate::storage::Store;
use chrono::{DateTime, Utc};

/// Width of one overrun step: 15 minutes.
pub const OVERDUE_STEP_SECONDS: i64 = 15 * 60;

/// Overrun step of a running session: -1 before the due time, 0 from the due
/// time up to 15 minutes past, then one per further 15 minutes.
pub fn notification_step(planned_end_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let overrun_secs = (now - planned_end_at).num_seconds();
    if overrun_secs < 0 {
        return -1;
    }
    overrun_secs / OVERDUE_STEP_SECONDS
}

/// Title and body for a notification step.
pub fn notification_message(step: i64, session_type: SessionType) -> (String, String) {
    let phase = if session_type.is_focus() {
        "focus"
    } else {
        "break"
    };
    if step <= 0 {
        return (
            "Pomodoro time reached".to_string(),
            format!("The {phase} session has reached 00:00."),
        );
    }
    (
        "Pomodoro running over".to_string(),
        format!("The {phase} session is {} minutes past its planned end.", step * 15),
    )
}

/// Counters reported by one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub checked_sessions: usize,
    pub sent_notifications: usize,
    pub deactivated_subscriptions: usize,
}

/// One dispatch pass over the store, driven by an external periodic trigger.
pub struct NotificationDispatcher<'a, D: PushDelivery> {
    store: &'a mut Store,
    clock: &'a dyn Clock,
    delivery: &'a D,
}

/// Per-pass view of a subscription; gone endpoints are skipped for the rest
/// of the pass without re-reading the store.
struct PassSubscription {
    subscription: PushSubscription,
    active: bool,
}

impl<'a, D: PushDelivery> NotificationDispatcher<'a, D> {
    pub fn new(store: &'a mut Store, clock: &'a dyn Clock, delivery: &'a D) -> Self {
        Self {
            store,
            clock,
            delivery,
        }
    }

    /// Evaluate all running sessions and deliver due steps. Best-effort:
    /// a failing session/subscription pair never blocks the others.
    pub fn run_pass(&mut self) -> Result<DispatchReport, CoreError> {
        let now = self.clock.now();
        let sessions = self.store.running_sessions()?;
        let mut report = DispatchReport {
            checked_sessions: sessions.len(),
            ..DispatchReport::default()
        };

        let owners: Vec<OwnerId> = sessions.iter().map(|s| s.owner).collect();
        let mut subscriptions: HashMap<OwnerId, Vec<PassSubscription>> = self
            .store
            .active_subscriptions_by_owner(&owners)?
            .into_iter()
            .map(|(owner, subs)| {
                let subs = subs
                    .into_iter()
                    .map(|subscription| PassSubscription {
                        subscription,
                        active: true,
                    })
                    .collect();
                (owner, subs)
            })
            .collect();

        for session in &sessions {
            // Sessions without a due time are never evaluated, never marked.
            let Some(planned_end_at) = session.planned_end_at else {
                continue;
            };
            let step = notification_step(planned_end_at, now);
            if step < 0 || step <= session.last_notified_step {
                continue;
            }

            let (title, body) = notification_message(step, session.session_type);
            let payload = serde_json::json!({
                "title": title,
                "body": body,
                "tag": format!("pomodoro-{}-step-{}", session.id, step),
            })
            .to_string();

            let Some(owner_subs) = subscriptions.get_mut(&session.owner) else {
                continue;
            };

            let mut delivered_any = false;
            for entry in owner_subs.iter_mut().filter(|entry| entry.active) {
                match self.delivery.send(&entry.subscription, &payload) {
                    DeliveryOutcome::Delivered => {
                        delivered_any = true;
                        report.sent_notifications += 1;
                    }
                    DeliveryOutcome::Gone => {
                        self.store.deactivate_subscription(
                            &entry.subscription.owner,
                            &entry.subscription.id,
                            now,
                        )?;
                        entry.active = false;
                        report.deactivated_subscriptions += 1;
                    }
                    DeliveryOutcome::Failed(reason) => {
                        tracing::warn!(
                            subscription = %entry.subscription.id,
                            session = %session.id,
                            %reason,
                            "push delivery failed"
                        );
                    }
                }
            }

            // Mark the step only when something got through; otherwise the
            // next pass retries it.
            if delivered_any {
                self.store
                    .mark_session_notified(&session.owner, &session.id, step)?;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::types::{SessionType, StartSession};
    use crate::session::SessionService;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;

    /// Delivery double scripted per endpoint, recording every attempt.
    struct ScriptedDelivery {
        outcomes: HashMap<String, DeliveryOutcome>,
        attempts: RefCell<Vec<String>>,
    }

    impl ScriptedDelivery {
        fn new(outcomes: &[(&str, DeliveryOutcome)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|(endpoint, outcome)| (endpoint.to_string(), outcome.clone()))
                    .collect(),
                attempts: RefCell::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.borrow().clone()
        }
    }

    impl PushDelivery for ScriptedDelivery {
        fn send(&self, subscription: &PushSubscription, _payload: &str) -> DeliveryOutcome {
            self.attempts.borrow_mut().push(subscription.endpoint.clone());
            self.outcomes
                .get(&subscription.endpoint)
                .cloned()
                .unwrap_or(DeliveryOutcome::Delivered)
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
    }

    fn start_focus(store: &mut Store, clock: &ManualClock, owner: &OwnerId) -> uuid::Uuid {
        let session = SessionService::new(store, clock)
            .start(
                owner,
                StartSession {
                    title: String::new(),
                    session_type: SessionType::Focus,
                    planned_seconds: Some(1500),
                    cycle_index: 1,
                    tags: Vec::new(),
                },
            )
            .unwrap();
        session.id
    }

    fn subscribe(store: &mut Store, owner: &OwnerId, endpoint: &str) {
        store
            .upsert_subscription(owner, endpoint, "key", "auth", Utc::now())
            .unwrap();
    }

    #[test]
    fn step_boundaries() {
        let due = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        assert_eq!(notification_step(due, due - Duration::seconds(1)), -1);
        assert_eq!(notification_step(due, due), 0);
        assert_eq!(notification_step(due, due + Duration::minutes(15)), 1);
        assert_eq!(notification_step(due, due + Duration::minutes(31)), 2);
    }

    #[test]
    fn messages_distinguish_reached_from_overrun() {
        let (title, body) = notification_message(0, SessionType::Focus);
        assert_eq!(title, "Pomodoro time reached");
        assert!(body.contains("focus"));

        let (title, body) = notification_message(2, SessionType::ShortBreak);
        assert_eq!(title, "Pomodoro running over");
        assert!(body.contains("30 minutes"));
        assert!(body.contains("break"));
    }

    #[test]
    fn pass_sends_nothing_before_due_time() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        start_focus(&mut store, &clock, &owner);
        subscribe(&mut store, &owner, "https://push/a");

        clock.advance(Duration::seconds(100));
        let delivery = ScriptedDelivery::new(&[]);
        let report = NotificationDispatcher::new(&mut store, &clock, &delivery)
            .run_pass()
            .unwrap();
        assert_eq!(report.checked_sessions, 1);
        assert_eq!(report.sent_notifications, 0);
        assert!(delivery.attempts().is_empty());
    }

    #[test]
    fn pass_sends_once_per_step_and_marks_session() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let session_id = start_focus(&mut store, &clock, &owner);
        subscribe(&mut store, &owner, "https://push/a");

        // Reach the due time exactly: step 0.
        clock.advance(Duration::seconds(1500));
        let delivery = ScriptedDelivery::new(&[]);
        let report = NotificationDispatcher::new(&mut store, &clock, &delivery)
            .run_pass()
            .unwrap();
        assert_eq!(report.sent_notifications, 1);
        let session = store.get_session(&owner, &session_id).unwrap().unwrap();
        assert_eq!(session.last_notified_step, 0);

        // Repeat pass at the same instant sends nothing further.
        let report = NotificationDispatcher::new(&mut store, &clock, &delivery)
            .run_pass()
            .unwrap();
        assert_eq!(report.sent_notifications, 0);

        // Fifteen minutes later: step 1 fires once.
        clock.advance(Duration::minutes(15));
        let report = NotificationDispatcher::new(&mut store, &clock, &delivery)
            .run_pass()
            .unwrap();
        assert_eq!(report.sent_notifications, 1);
        let session = store.get_session(&owner, &session_id).unwrap().unwrap();
        assert_eq!(session.last_notified_step, 1);
    }

    #[test]
    fn gone_subscription_is_deactivated_without_aborting() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let session_id = start_focus(&mut store, &clock, &owner);
        subscribe(&mut store, &owner, "https://push/gone");
        subscribe(&mut store, &owner, "https://push/ok");

        clock.advance(Duration::seconds(1500));
        let delivery = ScriptedDelivery::new(&[
            ("https://push/gone", DeliveryOutcome::Gone),
            ("https://push/ok", DeliveryOutcome::Delivered),
        ]);
        let report = NotificationDispatcher::new(&mut store, &clock, &delivery)
            .run_pass()
            .unwrap();
        assert_eq!(report.sent_notifications, 1);
        assert_eq!(report.deactivated_subscriptions, 1);

        // The delivery succeeded for one subscription, so the step is marked.
        let session = store.get_session(&owner, &session_id).unwrap().unwrap();
        assert_eq!(session.last_notified_step, 0);

        // Future passes skip the deactivated endpoint.
        let subs = store.active_subscriptions(&owner).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].endpoint, "https://push/ok");
    }

    #[test]
    fn all_failed_step_is_retried_next_pass() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let session_id = start_focus(&mut store, &clock, &owner);
        subscribe(&mut store, &owner, "https://push/flaky");

        clock.advance(Duration::seconds(1500));
        let failing = ScriptedDelivery::new(&[(
            "https://push/flaky",
            DeliveryOutcome::Failed("HTTP 500".into()),
        )]);
        let report = NotificationDispatcher::new(&mut store, &clock, &failing)
            .run_pass()
            .unwrap();
        assert_eq!(report.sent_notifications, 0);
        assert_eq!(report.deactivated_subscriptions, 0);

        // Step not marked, so a healthy pass re-sends it.
        let session = store.get_session(&owner, &session_id).unwrap().unwrap();
        assert_eq!(session.last_notified_step, -1);

        let healthy = ScriptedDelivery::new(&[]);
        let report = NotificationDispatcher::new(&mut store, &clock, &healthy)
            .run_pass()
            .unwrap();
        assert_eq!(report.sent_notifications, 1);
    }

    #[test]
    fn paused_sessions_are_not_evaluated() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let session_id = start_focus(&mut store, &clock, &owner);
        subscribe(&mut store, &owner, "https://push/a");

        SessionService::new(&mut store, &clock)
            .pause(&owner, &session_id)
            .unwrap();

        clock.advance(Duration::hours(2));
        let delivery = ScriptedDelivery::new(&[]);
        let report = NotificationDispatcher::new(&mut store, &clock, &delivery)
            .run_pass()
            .unwrap();
        assert_eq!(report.checked_sessions, 0);
        assert!(delivery.attempts().is_empty());
    }

    #[test]
    fn owner_without_subscriptions_is_skipped_but_counted() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        start_focus(&mut store, &clock, &owner);

        clock.advance(Duration::seconds(1500));
        let delivery = ScriptedDelivery::new(&[]);
        let report = NotificationDispatcher::new(&mut store, &clock, &delivery)
            .run_pass()
            .unwrap();
        assert_eq!(report.checked_sessions, 1);
        assert_eq!(report.sent_notifications, 0);
    }
}
