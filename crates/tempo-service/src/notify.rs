//! # Punch Notifications
//!
//! Seam for telling the outside world (a manager's feed, a chat webhook)
//! that a punch happened. Delivery is fire-and-forget: the notification is
//! spawned onto the runtime and a failure is logged, never surfaced to the
//! employee who punched.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{info, warn};

use tempo_core::PunchKind;

/// A punch that just happened.
#[derive(Debug, Clone)]
pub struct PunchEvent {
    pub employee_id: String,
    pub employee_name: String,
    pub kind: PunchKind,
    pub at: NaiveDateTime,
    /// Lateness carried for clock-in events, zero otherwise.
    pub late_minutes: i64,
}

/// Delivery backend for punch events.
#[async_trait]
pub trait PunchNotifier: Send + Sync {
    async fn notify_punch(&self, event: &PunchEvent) -> Result<(), String>;
}

/// Default backend: structured log line, always succeeds.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl PunchNotifier for LogNotifier {
    async fn notify_punch(&self, event: &PunchEvent) -> Result<(), String> {
        info!(
            employee_id = %event.employee_id,
            kind = event.kind.label(),
            at = %event.at,
            late_minutes = event.late_minutes,
            "punch"
        );
        Ok(())
    }
}

/// Spawns the delivery so the punch response never waits on it.
pub fn dispatch(notifier: Arc<dyn PunchNotifier>, event: PunchEvent) {
    tokio::spawn(async move {
        if let Err(err) = notifier.notify_punch(&event).await {
            warn!(
                employee_id = %event.employee_id,
                kind = event.kind.label(),
                error = %err,
                "punch notification failed"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier(AtomicUsize);

    #[async_trait]
    impl PunchNotifier for CountingNotifier {
        async fn notify_punch(&self, _event: &PunchEvent) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event() -> PunchEvent {
        PunchEvent {
            employee_id: "emp-1".to_string(),
            employee_name: "Ana Souza".to_string(),
            kind: PunchKind::ClockIn,
            at: "2026-08-24T09:00:00".parse().unwrap(),
            late_minutes: 0,
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers() {
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        dispatch(notifier.clone(), event());

        // give the spawned task a tick to run
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_panic() {
        struct FailingNotifier;

        #[async_trait]
        impl PunchNotifier for FailingNotifier {
            async fn notify_punch(&self, _event: &PunchEvent) -> Result<(), String> {
                Err("webhook down".to_string())
            }
        }

        dispatch(Arc::new(FailingNotifier), event());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
