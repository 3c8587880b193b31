use std::sync::Arc;

use crate::api::{AlertApi, ApiError};
use crate::auth::SessionToken;
use crate::connections::NotificationRecord;

/// Restartable source of notification records.
///
/// Every [`fetch`](Self::fetch) asks the server again and yields a fresh,
/// finite batch; nothing is cached between calls.
pub struct NotificationFeed<A> {
    api: Arc<A>,
}

impl<A: AlertApi> NotificationFeed<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Fetch the current batch in server order
    pub async fn fetch(&self, token: &SessionToken) -> Result<Vec<NotificationRecord>, ApiError> {
        let records = self.api.fetch_notifications(token).await?;
        tracing::debug!(count = records.len(), "Fetched notifications");
        Ok(records)
    }

    /// Unseen records of a batch, preserving order and duplicates
    pub fn unseen(records: &[NotificationRecord]) -> impl Iterator<Item = &NotificationRecord> {
        records.iter().filter(|r| r.is_unseen())
    }
}
