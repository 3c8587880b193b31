//! Dashboard, the Facade entry-point for consumers (CLI, other front-ends).
//!
//! Owns the API collaborator, credentials, settings and the event channel.
//! Each screen activation produces a fresh [`DashboardSession`]; nothing
//! survives from one activation to the next.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;

use super::events::DashboardEvent;
use super::session::DashboardSession;
use crate::api::{AlertApi, ApiError};
use crate::auth::{CredentialStore, SessionToken};
use crate::config::Settings;
use crate::connections::{ConnectionRegistry, SosEvent};
use crate::monitor::Reconciler;
use crate::sos::{SelfAlertState, SelfAlertStateMachine};

/// Default broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The Facade that wraps the synchronization engine.
///
/// Constructed via [`DashboardBuilder`](super::builder::DashboardBuilder).
pub struct Dashboard<A: AlertApi> {
    api: Arc<A>,
    credentials: Arc<dyn CredentialStore>,
    settings: Arc<Settings>,
    event_tx: broadcast::Sender<DashboardEvent>,
}

impl<A: AlertApi> Dashboard<A> {
    /// Create a new Dashboard (prefer `DashboardBuilder`)
    pub(crate) fn new(
        api: Arc<A>,
        credentials: Arc<dyn CredentialStore>,
        settings: Arc<Settings>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            credentials,
            settings,
            event_tx,
        }
    }

    /// Access application settings (read-only)
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Subscribe to dashboard events.
    ///
    /// If the receiver falls behind, older events are dropped (lagged);
    /// a lagging binder should simply re-render from
    /// [`DashboardSession::rows`].
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.event_tx.subscribe()
    }

    /// Whether a session token is available
    pub fn is_authenticated(&self) -> bool {
        self.credentials.token().is_some()
    }

    fn session_token(&self) -> Result<SessionToken, ApiError> {
        self.credentials.token().ok_or(ApiError::Unauthenticated)
    }

    /// Activate the dashboard screen.
    ///
    /// Loads the connection registry, seeds the alert set from one poll and
    /// one notification fetch, then starts the refresh scheduler, whose
    /// first cycle polls again without refetching notifications. Fails
    /// only when signed out or when the registry cannot be loaded; seed
    /// failures are reported as events and left to the scheduler.
    pub async fn activate(&self) -> Result<DashboardSession<A>, ApiError> {
        let token = self.session_token()?;

        let connections = self.api.fetch_connections(&token).await.inspect_err(|e| {
            tracing::warn!("Failed to load connections: {}", e);
        })?;
        let registry = Arc::new(ConnectionRegistry::new(connections));
        tracing::info!(count = registry.len(), "Loaded connections");
        let _ = self.event_tx.send(DashboardEvent::ConnectionsLoaded {
            count: registry.len(),
        });

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&self.api),
            Arc::clone(&self.credentials),
            Arc::clone(&registry),
            self.event_tx.clone(),
        ));
        let session = DashboardSession::new(Arc::clone(&reconciler), &self.settings.refresh);

        if registry.is_empty() {
            tracing::info!("No connections found; refresh not started");
            return Ok(session);
        }

        if let Err(e) = reconciler.poll().await {
            if e.is_fatal() {
                return Err(e);
            }
        }
        if let Err(e) = reconciler.fetch_notifications().await {
            if e.is_fatal() {
                return Err(e);
            }
        }

        session.start_refresh_after_seed();
        Ok(session)
    }

    /// Toggle the user's own SOS without an active session.
    ///
    /// Needs only the session token, so it works even when the connection
    /// list cannot be loaded. No refresh poll follows.
    pub async fn toggle_self_alert(&self) -> Result<SelfAlertState, ApiError> {
        SelfAlertStateMachine::new(
            Arc::clone(&self.api),
            Arc::clone(&self.credentials),
            self.event_tx.clone(),
        )
        .toggle()
        .await
    }

    /// SOS history of one connection, most recent first
    pub async fn history(&self, email: &str) -> Result<Vec<SosEvent>, ApiError> {
        let token = self.session_token()?;
        self.api.fetch_events(&token, email).await
    }

    /// Store a token obtained from the login endpoint
    pub fn sign_in(&self, token: SessionToken, user_id: Option<&str>) -> Result<()> {
        self.credentials.save(&token, user_id)
    }

    /// Forget the stored token
    pub fn logout(&self) -> Result<()> {
        self.credentials.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }
}
