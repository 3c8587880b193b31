use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::api::{AlertApi, ApiError};
use crate::auth::CredentialStore;
use crate::dashboard::DashboardEvent;
use crate::monitor::Reconciler;

/// The user's own alert state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SelfAlertState {
    #[default]
    Idle,
    Active,
}

impl SelfAlertState {
    /// Map the server's `active` flag
    pub fn from_active(active: bool) -> Self {
        if active {
            SelfAlertState::Active
        } else {
            SelfAlertState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SelfAlertState::Active)
    }
}

impl fmt::Display for SelfAlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfAlertState::Idle => write!(f, "idle"),
            SelfAlertState::Active => write!(f, "active"),
        }
    }
}

/// Tracks the user's own alert from authoritative toggle responses.
///
/// ```text
///            toggle -> {active: true}
///   Idle ─────────────────────────────► Active
///    ▲                                    │
///    └────────────────────────────────────┘
///            toggle -> {active: false}
/// ```
///
/// The state never moves before the server answers, and a failed toggle
/// leaves it where it was. Toggles are never retried: the endpoint flips a
/// binary state, so a retry could undo the first attempt.
///
/// Only a session token is needed to toggle. A machine attached to a
/// dashboard session also requests a refresh poll after each success.
pub struct SelfAlertStateMachine<A: AlertApi> {
    api: Arc<A>,
    credentials: Arc<dyn CredentialStore>,
    event_tx: broadcast::Sender<DashboardEvent>,
    /// Session to refresh after a successful toggle
    refresher: Option<Arc<Reconciler<A>>>,
    state_tx: watch::Sender<SelfAlertState>,
}

impl<A: AlertApi> SelfAlertStateMachine<A> {
    /// New machine in `Idle`, independent of any dashboard session
    pub fn new(
        api: Arc<A>,
        credentials: Arc<dyn CredentialStore>,
        event_tx: broadcast::Sender<DashboardEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SelfAlertState::Idle);
        Self {
            api,
            credentials,
            event_tx,
            refresher: None,
            state_tx,
        }
    }

    /// New machine in `Idle` that refreshes `reconciler` after each toggle
    pub fn attached(reconciler: Arc<Reconciler<A>>) -> Self {
        let mut machine = Self::new(
            Arc::clone(reconciler.api()),
            Arc::clone(reconciler.credentials()),
            reconciler.event_sender().clone(),
        );
        machine.refresher = Some(reconciler);
        machine
    }

    pub fn state(&self) -> SelfAlertState {
        *self.state_tx.borrow()
    }

    /// Receiver that observes every committed transition
    pub fn subscribe(&self) -> watch::Receiver<SelfAlertState> {
        self.state_tx.subscribe()
    }

    /// Send one toggle request and adopt the server's answer.
    ///
    /// On success an attached machine also requests a refresh poll, which
    /// races independently with any scheduled poll.
    pub async fn toggle(&self) -> Result<SelfAlertState, ApiError> {
        let token = self.credentials.token().ok_or(ApiError::Unauthenticated)?;
        let before = self.state();

        let outcome = match self.api.send_toggle(&token).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(state = %before, "SOS toggle failed: {}", e);
                return Err(e);
            }
        };

        let next = SelfAlertState::from_active(outcome.active);
        self.state_tx.send_replace(next);
        tracing::info!(
            from = %before,
            to = %next,
            event_id = outcome.event_id.as_deref().unwrap_or("-"),
            "SOS toggled"
        );
        // No subscribers is fine
        let _ = self
            .event_tx
            .send(DashboardEvent::SelfAlertChanged { state: next });
        if let Some(reconciler) = &self.refresher {
            reconciler.request_refresh();
        }

        Ok(next)
    }
}
