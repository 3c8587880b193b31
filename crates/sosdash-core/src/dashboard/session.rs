use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{AlertApi, ApiError};
use crate::config::RefreshSettings;
use crate::connections::{ConnectionRegistry, ConnectionRow};
use crate::monitor::{Reconciler, RefreshScheduler};
use crate::sos::{SelfAlertState, SelfAlertStateMachine};
use crate::state::AlertView;

/// One activation of the dashboard screen.
///
/// Holds the registry, alert set, scheduler and own-alert state for as
/// long as the screen is visible. Dropping it stops the refresh timer.
pub struct DashboardSession<A: AlertApi> {
    reconciler: Arc<Reconciler<A>>,
    scheduler: RefreshScheduler<A>,
    self_alert: SelfAlertStateMachine<A>,
}

impl<A: AlertApi> DashboardSession<A> {
    pub(crate) fn new(reconciler: Arc<Reconciler<A>>, refresh: &RefreshSettings) -> Self {
        Self {
            scheduler: RefreshScheduler::new(Arc::clone(&reconciler), refresh),
            self_alert: SelfAlertStateMachine::attached(Arc::clone(&reconciler)),
            reconciler,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        self.reconciler.registry()
    }

    /// Read-only view of the active alert set
    pub fn alerts(&self) -> AlertView {
        self.reconciler.view()
    }

    /// Registry rows joined with the current alert set, in registry order
    pub fn rows(&self) -> Vec<ConnectionRow> {
        let alerts = self.reconciler.view().snapshot();
        self.registry().rows(&alerts)
    }

    pub fn self_alert_state(&self) -> SelfAlertState {
        self.self_alert.state()
    }

    pub fn subscribe_self_alert(&self) -> watch::Receiver<SelfAlertState> {
        self.self_alert.subscribe()
    }

    /// Toggle the user's own SOS; the state follows the server's answer
    pub async fn toggle_self_alert(&self) -> Result<SelfAlertState, ApiError> {
        self.self_alert.toggle().await
    }

    /// Poll once outside the schedule
    pub fn refresh_now(&self) -> JoinHandle<()> {
        self.reconciler.request_refresh()
    }

    pub fn start_refresh(&self) {
        self.scheduler.start();
    }

    /// Start refreshing right after activation fetched notifications
    pub(crate) fn start_refresh_after_seed(&self) {
        self.scheduler.start_after_seed();
    }

    pub fn stop_refresh(&self) {
        self.scheduler.stop();
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_running()
    }

    /// End the session. Requests already in flight still land in this
    /// session's alert set, which nothing reads afterwards.
    pub fn deactivate(self) {
        self.scheduler.stop();
        tracing::debug!("Dashboard session deactivated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{reconciler, settle, MockApi};

    #[tokio::test]
    async fn test_rows_follow_alert_set() {
        let api = Arc::new(MockApi::default());
        api.push_poll(&["b"]);
        let (rec, _rx) = reconciler(api, &["a", "b"]);
        let session = DashboardSession::new(rec, &RefreshSettings::default());

        session.refresh_now().await.unwrap();

        let rows = session.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].email, "a");
        assert!(!rows[0].alerting);
        assert_eq!(rows[1].email, "b");
        assert!(rows[1].alerting);
        assert_eq!(session.registry().len(), 2);
        assert_eq!(session.alerts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop_refresh() {
        let api = Arc::new(MockApi::default());
        let (rec, _rx) = reconciler(api.clone(), &["a"]);
        let session = DashboardSession::new(rec, &RefreshSettings::default());

        assert!(!session.is_refreshing());
        session.start_refresh();
        settle().await;
        assert!(session.is_refreshing());
        assert_eq!(api.poll_calls(), 1);

        session.stop_refresh();
        assert!(!session.is_refreshing());
    }

    #[tokio::test]
    async fn test_self_alert_watch() {
        let api = Arc::new(MockApi::default());
        api.push_toggle(Ok(crate::api::ToggleOutcome {
            active: true,
            event_id: None,
            message: Some("SOS event created".into()),
        }));
        let (rec, _rx) = reconciler(api, &[]);
        let session = DashboardSession::new(rec, &RefreshSettings::default());
        let mut watcher = session.subscribe_self_alert();

        assert_eq!(
            session.toggle_self_alert().await,
            Ok(SelfAlertState::Active)
        );
        assert!(watcher.has_changed().unwrap());
        assert_eq!(session.self_alert_state(), SelfAlertState::Active);
    }
}
