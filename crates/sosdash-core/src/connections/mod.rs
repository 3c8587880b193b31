//! Connections (monitored people), notification records and SOS history.

mod registry;
mod types;

pub use registry::{ConnectionRegistry, ConnectionRow};
pub use types::{Connection, NotificationRecord, SosEvent};
pub(crate) use types::connections_from_rows;
