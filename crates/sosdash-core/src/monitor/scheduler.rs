use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::reconciler::Reconciler;
use crate::api::AlertApi;
use crate::config::RefreshSettings;

/// Periodic refresh driver for one dashboard session.
///
/// Owns at most one timer chain. Each cycle *dispatches* a poll (and
/// optionally a notification fetch) as its own task and re-arms right away,
/// so the interval is measured between dispatches and slow responses can
/// overlap. Stopping cancels the timer only; fetches already in flight
/// complete and are still applied.
pub struct RefreshScheduler<A: AlertApi> {
    reconciler: Arc<Reconciler<A>>,
    interval: Duration,
    include_notifications: bool,
    /// Pending timer chain, if running
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Cycles dispatched since creation
    dispatches: Arc<AtomicU64>,
}

impl<A: AlertApi> RefreshScheduler<A> {
    pub fn new(reconciler: Arc<Reconciler<A>>, settings: &RefreshSettings) -> Self {
        Self {
            reconciler,
            interval: Duration::from_millis(settings.interval_ms),
            include_notifications: settings.include_notifications,
            timer: Mutex::new(None),
            dispatches: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start (or restart) the timer chain.
    ///
    /// Dispatches one cycle immediately, then one per interval. Calling it
    /// while running cancels the pending chain first, so chains never
    /// accumulate.
    pub fn start(&self) {
        self.spawn_chain(true);
    }

    /// Start after the caller has just fetched notifications itself: the
    /// immediate cycle polls only, later cycles are complete.
    pub fn start_after_seed(&self) {
        self.spawn_chain(false);
    }

    fn spawn_chain(&self, notify_first: bool) {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
            tracing::debug!("Refresh scheduler restarted");
        }

        let reconciler = Arc::clone(&self.reconciler);
        let dispatches = Arc::clone(&self.dispatches);
        let interval = self.interval;
        let include_notifications = self.include_notifications;

        *timer = Some(tokio::spawn(async move {
            let mut notify = notify_first;
            loop {
                let cycle = dispatches.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(cycle, "Dispatching refresh cycle");
                dispatch_cycle(&reconciler, include_notifications && notify);
                notify = true;
                tokio::time::sleep(interval).await;
            }
        }));

        tracing::info!(
            "Refresh scheduler started (interval={}ms, notifications={})",
            interval.as_millis(),
            include_notifications,
        );
    }

    /// Cancel the pending timer. No-op when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
            tracing::info!("Refresh scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of cycles dispatched so far
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::SeqCst)
    }
}

impl<A: AlertApi> Drop for RefreshScheduler<A> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fire one cycle's requests without waiting for them
fn dispatch_cycle<A: AlertApi>(reconciler: &Arc<Reconciler<A>>, include_notifications: bool) {
    reconciler.request_refresh();

    if include_notifications {
        let reconciler = Arc::clone(reconciler);
        tokio::spawn(async move {
            // Failure already reported
            let _ = reconciler.fetch_notifications().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::NotificationRecord;
    use crate::test_support::{reconciler, settle, MockApi};

    const INTERVAL: Duration = Duration::from_millis(5000);

    fn settings(include_notifications: bool) -> RefreshSettings {
        RefreshSettings {
            interval_ms: INTERVAL.as_millis() as u64,
            include_notifications,
        }
    }

    async fn tick() {
        tokio::time::advance(INTERVAL).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_dispatches_immediately_then_every_interval() {
        let api = Arc::new(MockApi::default());
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let scheduler = RefreshScheduler::new(rec, &settings(false));

        scheduler.start();
        settle().await;
        assert!(scheduler.is_running());
        assert_eq!(scheduler.dispatch_count(), 1);
        assert_eq!(api.poll_calls(), 1);

        tick().await;
        assert_eq!(scheduler.dispatch_count(), 2);
        tick().await;
        assert_eq!(scheduler.dispatch_count(), 3);
        assert_eq!(api.poll_calls(), 3);
        assert_eq!(api.notification_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_keeps_one_timer_chain() {
        let api = Arc::new(MockApi::default());
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let scheduler = RefreshScheduler::new(rec, &settings(false));

        scheduler.start();
        scheduler.start();
        settle().await;
        assert_eq!(scheduler.dispatch_count(), 1);
        assert_eq!(api.poll_calls(), 1);

        tick().await;
        assert_eq!(scheduler.dispatch_count(), 2);
        assert_eq!(api.poll_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_while_running_does_not_double_up() {
        let api = Arc::new(MockApi::default());
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let scheduler = RefreshScheduler::new(rec, &settings(false));

        scheduler.start();
        settle().await;
        scheduler.start();
        settle().await;
        // Restart dispatches its own immediate cycle
        assert_eq!(scheduler.dispatch_count(), 2);

        tick().await;
        assert_eq!(scheduler.dispatch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_timer() {
        let api = Arc::new(MockApi::default());
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let scheduler = RefreshScheduler::new(rec, &settings(true));

        scheduler.start();
        settle().await;
        scheduler.stop();
        settle().await;
        assert!(!scheduler.is_running());

        tick().await;
        tick().await;
        assert_eq!(scheduler.dispatch_count(), 1);
        assert_eq!(api.poll_calls(), 1);
        assert_eq!(api.notification_calls(), 1);

        // Stopping again is harmless, and start works after stop
        scheduler.stop();
        scheduler.start();
        settle().await;
        assert_eq!(scheduler.dispatch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_poll_is_applied_after_stop() {
        let api = Arc::new(MockApi::default());
        let gate = api.gate_poll();
        let (rec, _rx) = reconciler(api.clone(), &["a", "b"]);
        let view = rec.view();
        let scheduler = RefreshScheduler::new(rec, &settings(false));

        scheduler.start();
        settle().await;
        scheduler.stop();

        gate.send(Ok(["a".to_string()].into())).unwrap();
        settle().await;
        assert!(view.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_polls_overlap() {
        let api = Arc::new(MockApi::default());
        let _slow = api.gate_poll();
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let scheduler = RefreshScheduler::new(rec, &settings(false));

        scheduler.start();
        settle().await;
        // First poll never resolves; the next dispatch happens anyway
        tick().await;
        assert_eq!(api.poll_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_halt_scheduler() {
        let api = Arc::new(MockApi::default());
        api.push_poll_err(crate::api::ApiError::Network("down".into()));
        api.push_poll(&["a"]);
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let view = rec.view();
        let scheduler = RefreshScheduler::new(rec, &settings(false));

        scheduler.start();
        settle().await;
        assert!(view.is_empty());

        tick().await;
        assert!(view.contains("a"));
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_includes_notifications() {
        let api = Arc::new(MockApi::default());
        api.push_notifications(vec![NotificationRecord::unseen("a", "A")]);
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let view = rec.view();
        let scheduler = RefreshScheduler::new(rec, &settings(true));

        scheduler.start();
        settle().await;
        assert_eq!(api.notification_calls(), 1);
        assert!(view.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_after_seed_skips_first_notification_fetch() {
        let api = Arc::new(MockApi::default());
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let scheduler = RefreshScheduler::new(rec, &settings(true));

        scheduler.start_after_seed();
        settle().await;
        assert_eq!(api.poll_calls(), 1);
        assert_eq!(api.notification_calls(), 0);

        tick().await;
        assert_eq!(api.poll_calls(), 2);
        assert_eq!(api.notification_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_timer() {
        let api = Arc::new(MockApi::default());
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let scheduler = RefreshScheduler::new(rec, &settings(false));

        scheduler.start();
        settle().await;
        drop(scheduler);

        tick().await;
        tick().await;
        assert_eq!(api.poll_calls(), 1);
    }
}
