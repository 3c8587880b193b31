//! Events broadcast to UI binders.
//!
//! Binders call [`Dashboard::subscribe()`](super::Dashboard::subscribe) and
//! re-render on [`DashboardEvent::AlertSetChanged`]; [`DashboardEvent::SosAlert`]
//! is the one-shot signal meant for a transient message.

use std::fmt;

use crate::api::ApiError;
use crate::sos::SelfAlertState;

/// Which refresh operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSource {
    /// Full-state poll of active alerts
    Poll,
    /// Notification feed fetch
    Notifications,
}

impl fmt::Display for RefreshSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshSource::Poll => write!(f, "poll"),
            RefreshSource::Notifications => write!(f, "notifications"),
        }
    }
}

/// Events emitted while a dashboard session is active
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    /// The connection registry was (re)loaded
    ConnectionsLoaded {
        /// Number of known connections
        count: usize,
    },

    /// Active-alert membership changed; re-render
    AlertSetChanged,

    /// An unseen notification reported an alert
    SosAlert {
        trigger_name: String,
        trigger_email: String,
    },

    /// The user's own alert state changed after a toggle
    SelfAlertChanged { state: SelfAlertState },

    /// A poll or notification fetch failed; state was left untouched
    RefreshFailed {
        source: RefreshSource,
        error: ApiError,
    },
}
