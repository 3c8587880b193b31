//! Merge protocol between the poll, the notification feed and the alert set.
//!
//! - A successful poll replaces the whole set (`replace_all`), in the order
//!   responses *arrive*. Two overlapping polls are not reordered: whichever
//!   completes last wins, even if it was dispatched first.
//! - Unseen notifications only add (`add_one`) and raise a one-shot
//!   [`DashboardEvent::SosAlert`]. Duplicates are processed again.
//! - A failed fetch leaves the set untouched and is reported, never retried.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::feed::NotificationFeed;
use crate::api::{AlertApi, ApiError};
use crate::auth::{CredentialStore, SessionToken};
use crate::connections::{ConnectionRegistry, NotificationRecord};
use crate::dashboard::{DashboardEvent, RefreshSource};
use crate::state::{ActiveAlertSet, AlertView, SharedAlertSet};

/// Sole writer of the active-alert set
pub struct Reconciler<A> {
    api: Arc<A>,
    credentials: Arc<dyn CredentialStore>,
    registry: Arc<ConnectionRegistry>,
    feed: NotificationFeed<A>,
    alerts: SharedAlertSet,
    event_tx: broadcast::Sender<DashboardEvent>,
}

impl<A: AlertApi> Reconciler<A> {
    pub fn new(
        api: Arc<A>,
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<ConnectionRegistry>,
        event_tx: broadcast::Sender<DashboardEvent>,
    ) -> Self {
        Self {
            feed: NotificationFeed::new(api.clone()),
            api,
            credentials,
            registry,
            alerts: Arc::new(RwLock::new(ActiveAlertSet::new())),
            event_tx,
        }
    }

    /// Read-only view of the alert set
    pub fn view(&self) -> AlertView {
        AlertView::new(self.alerts.clone())
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub(crate) fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub(crate) fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub(crate) fn event_sender(&self) -> &broadcast::Sender<DashboardEvent> {
        &self.event_tx
    }

    /// Current token, or `Unauthenticated` without touching the network
    pub(crate) fn session_token(&self) -> Result<SessionToken, ApiError> {
        self.credentials.token().ok_or(ApiError::Unauthenticated)
    }

    pub(crate) fn emit(&self, event: DashboardEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Apply a complete poll result.
    ///
    /// Returns whether membership changed.
    pub fn on_poll_result(&self, ids: HashSet<String>) -> bool {
        let changed = self.alerts.write().replace_all(&ids, &self.registry);
        tracing::debug!(reported = ids.len(), changed, "Applied poll result");
        if changed {
            self.emit(DashboardEvent::AlertSetChanged);
        }
        changed
    }

    /// Apply a notification batch in the order given.
    ///
    /// Returns the number of alert signals raised.
    pub fn on_notifications(&self, records: &[NotificationRecord]) -> usize {
        let mut signals = 0;
        let mut changed = false;

        for record in NotificationFeed::<A>::unseen(records) {
            let Some(email) = record.trigger_email.as_deref() else {
                tracing::debug!("Skipping unseen notification without trigger email");
                continue;
            };

            changed |= self.alerts.write().add_one(email, &self.registry);

            let name = record
                .trigger_name
                .clone()
                .unwrap_or_else(|| email.to_string());
            tracing::info!(trigger = %email, "{} triggered an SOS", name);
            self.emit(DashboardEvent::SosAlert {
                trigger_name: name,
                trigger_email: email.to_string(),
            });
            signals += 1;
        }

        if changed {
            self.emit(DashboardEvent::AlertSetChanged);
        }
        signals
    }

    /// Fetch the authoritative alert list once and apply it
    pub async fn poll(&self) -> Result<(), ApiError> {
        let result = match self.session_token() {
            Ok(token) => self.api.fetch_active_alert_ids(&token).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(ids) => {
                self.on_poll_result(ids);
                Ok(())
            }
            Err(e) => {
                self.report_failure(RefreshSource::Poll, &e);
                Err(e)
            }
        }
    }

    /// Fetch the notification feed once and apply it
    pub async fn fetch_notifications(&self) -> Result<(), ApiError> {
        let result = match self.session_token() {
            Ok(token) => self.feed.fetch(&token).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(records) => {
                self.on_notifications(&records);
                Ok(())
            }
            Err(e) => {
                self.report_failure(RefreshSource::Notifications, &e);
                Err(e)
            }
        }
    }

    /// Dispatch a poll without waiting for it.
    ///
    /// The poll races any other in-flight poll; its result is applied
    /// whenever it arrives.
    pub fn request_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // Failure already reported
            let _ = this.poll().await;
        })
    }

    fn report_failure(&self, source: RefreshSource, error: &ApiError) {
        tracing::warn!(%source, "Refresh failed: {}", error);
        self.emit(DashboardEvent::RefreshFailed {
            source,
            error: error.clone(),
        });
    }
}
