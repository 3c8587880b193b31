use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::Connection;
use crate::state::ActiveAlertSet;

/// Connections known to the current session, in load order.
///
/// Loaded once per activation and never mutated afterwards; a reload
/// builds a new registry.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
    index: HashMap<String, usize>,
}

impl ConnectionRegistry {
    /// Build a registry from a full connection load.
    ///
    /// Duplicate emails keep their first occurrence.
    pub fn new(connections: Vec<Connection>) -> Self {
        let mut kept = Vec::with_capacity(connections.len());
        let mut index = HashMap::with_capacity(connections.len());

        for conn in connections {
            if index.contains_key(&conn.email) {
                tracing::debug!(email = %conn.email, "Dropping duplicate connection");
                continue;
            }
            index.insert(conn.email.clone(), kept.len());
            kept.push(conn);
        }

        Self {
            connections: kept,
            index,
        }
    }

    /// Whether `email` belongs to a known connection
    pub fn contains(&self, email: &str) -> bool {
        self.index.contains_key(email)
    }

    /// Look up a connection by email
    pub fn get(&self, email: &str) -> Option<&Connection> {
        self.index.get(email).map(|&i| &self.connections[i])
    }

    /// Iterate connections in load order
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Derive the per-row presentation view from the current alert set
    pub fn rows(&self, alerts: &ActiveAlertSet) -> Vec<ConnectionRow> {
        self.connections
            .iter()
            .map(|conn| ConnectionRow {
                email: conn.email.clone(),
                display_name: conn.display_name.clone(),
                device_id: conn.device_id.clone(),
                last_alert_at: conn.last_alert_at,
                alerting: alerts.contains(&conn.email),
            })
            .collect()
    }
}

/// Owned snapshot of one dashboard row.
///
/// Computed fresh on every render; holds no lock and no animation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRow {
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_alert_at: Option<DateTime<Utc>>,
    /// Whether the connection currently has an active alert
    pub alerting: bool,
}
