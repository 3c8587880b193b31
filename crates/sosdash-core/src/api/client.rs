use std::collections::HashSet;
use std::future::Future;

use super::types::{ApiError, ToggleOutcome};
use crate::auth::SessionToken;
use crate::connections::{Connection, NotificationRecord, SosEvent};

/// Remote operations the synchronization engine depends on.
///
/// Implemented over HTTP by [`HttpAlertApi`](super::HttpAlertApi); tests
/// substitute scripted implementations.
pub trait AlertApi: Send + Sync + 'static {
    /// Full connection list for the signed-in user
    fn fetch_connections(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Vec<Connection>, ApiError>> + Send;

    /// Authoritative poll: emails of every user with an active alert
    fn fetch_active_alert_ids(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<HashSet<String>, ApiError>> + Send;

    /// Notification feed addressed to the signed-in user
    fn fetch_notifications(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Vec<NotificationRecord>, ApiError>> + Send;

    /// Toggle the signed-in user's own alert (same endpoint both ways)
    fn send_toggle(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<ToggleOutcome, ApiError>> + Send;

    /// SOS history of one connection, most recent first
    fn fetch_events(
        &self,
        token: &SessionToken,
        email: &str,
    ) -> impl Future<Output = Result<Vec<SosEvent>, ApiError>> + Send;
}
