//! Scripted [`AlertApi`] and helpers shared by unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use crate::api::{AlertApi, ApiError, ToggleOutcome};
use crate::auth::{CredentialStore, SessionToken, StaticCredentials};
use crate::connections::{Connection, ConnectionRegistry, NotificationRecord, SosEvent};
use crate::dashboard::DashboardEvent;
use crate::monitor::Reconciler;

/// One scripted answer
pub(crate) enum Reply<T> {
    Ready(Result<T, ApiError>),
    Gated(oneshot::Receiver<Result<T, ApiError>>),
}

async fn resolve<T>(reply: Reply<T>) -> Result<T, ApiError> {
    match reply {
        Reply::Ready(result) => result,
        Reply::Gated(rx) => rx
            .await
            .unwrap_or_else(|_| Err(ApiError::Network("gate dropped".to_string()))),
    }
}

/// API whose answers are queued by the test.
///
/// Unscripted polls and notification fetches answer with an empty result;
/// an unscripted toggle fails.
#[derive(Default)]
pub(crate) struct MockApi {
    connections: Mutex<Option<Result<Vec<Connection>, ApiError>>>,
    polls: Mutex<VecDeque<Reply<HashSet<String>>>>,
    notifications: Mutex<VecDeque<Reply<Vec<NotificationRecord>>>>,
    toggles: Mutex<VecDeque<Reply<ToggleOutcome>>>,
    events: Mutex<Vec<SosEvent>>,
    poll_calls: AtomicUsize,
    notification_calls: AtomicUsize,
    toggle_calls: AtomicUsize,
}

impl MockApi {
    pub fn with_connections(emails: &[&str]) -> Self {
        let api = Self::default();
        *api.connections.lock() = Some(Ok(connections(emails)));
        api
    }

    pub fn fail_connections(&self, err: ApiError) {
        *self.connections.lock() = Some(Err(err));
    }

    pub fn set_events(&self, events: Vec<SosEvent>) {
        *self.events.lock() = events;
    }

    pub fn push_poll(&self, emails: &[&str]) {
        self.polls.lock().push_back(Reply::Ready(Ok(ids(emails))));
    }

    pub fn push_poll_err(&self, err: ApiError) {
        self.polls.lock().push_back(Reply::Ready(Err(err)));
    }

    pub fn gate_poll(&self) -> oneshot::Sender<Result<HashSet<String>, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.polls.lock().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_notifications(&self, records: Vec<NotificationRecord>) {
        self.notifications
            .lock()
            .push_back(Reply::Ready(Ok(records)));
    }

    pub fn push_notifications_err(&self, err: ApiError) {
        self.notifications.lock().push_back(Reply::Ready(Err(err)));
    }

    pub fn push_toggle(&self, result: Result<ToggleOutcome, ApiError>) {
        self.toggles.lock().push_back(Reply::Ready(result));
    }

    pub fn gate_toggle(&self) -> oneshot::Sender<Result<ToggleOutcome, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.toggles.lock().push_back(Reply::Gated(rx));
        tx
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn notification_calls(&self) -> usize {
        self.notification_calls.load(Ordering::SeqCst)
    }

    pub fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }
}

impl AlertApi for MockApi {
    async fn fetch_connections(&self, _token: &SessionToken) -> Result<Vec<Connection>, ApiError> {
        let scripted = self.connections.lock().clone();
        scripted.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_active_alert_ids(
        &self,
        _token: &SessionToken,
    ) -> Result<HashSet<String>, ApiError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.polls.lock().pop_front();
        match reply {
            Some(reply) => resolve(reply).await,
            None => Ok(HashSet::new()),
        }
    }

    async fn fetch_notifications(
        &self,
        _token: &SessionToken,
    ) -> Result<Vec<NotificationRecord>, ApiError> {
        self.notification_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.notifications.lock().pop_front();
        match reply {
            Some(reply) => resolve(reply).await,
            None => Ok(Vec::new()),
        }
    }

    async fn send_toggle(&self, _token: &SessionToken) -> Result<ToggleOutcome, ApiError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.toggles.lock().pop_front();
        match reply {
            Some(reply) => resolve(reply).await,
            None => Err(ApiError::Network("no scripted toggle".to_string())),
        }
    }

    async fn fetch_events(
        &self,
        _token: &SessionToken,
        email: &str,
    ) -> Result<Vec<SosEvent>, ApiError> {
        let events = self.events.lock().clone();
        Ok(events
            .into_iter()
            .filter(|e| e.triggered_by.as_deref() == Some(email))
            .collect())
    }
}

pub(crate) fn connections(emails: &[&str]) -> Vec<Connection> {
    emails
        .iter()
        .map(|e| Connection::new(*e, e.to_uppercase()))
        .collect()
}

pub(crate) fn ids(emails: &[&str]) -> HashSet<String> {
    emails.iter().map(|e| e.to_string()).collect()
}

pub(crate) fn signed_in() -> Arc<dyn CredentialStore> {
    Arc::new(StaticCredentials::with_token("test-token"))
}

/// Reconciler over `registry` backed by `api`, plus an event receiver
pub(crate) fn reconciler(
    api: Arc<MockApi>,
    registry: &[&str],
) -> (Arc<Reconciler<MockApi>>, broadcast::Receiver<DashboardEvent>) {
    let (tx, rx) = broadcast::channel(64);
    let registry = Arc::new(ConnectionRegistry::new(connections(registry)));
    (
        Arc::new(Reconciler::new(api, signed_in(), registry, tx)),
        rx,
    )
}

/// Let spawned tasks run until they block
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Drain every event currently queued
pub(crate) fn drain(rx: &mut broadcast::Receiver<DashboardEvent>) -> Vec<DashboardEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
