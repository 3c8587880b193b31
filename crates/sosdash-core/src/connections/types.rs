use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A person the signed-in user monitors.
///
/// `email` is the identity key; everything else is display data. Field
/// aliases accept both the `/connections` shape (`other_user_*`) and the
/// `/sos/active` user rows (`user_*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier of the connection
    #[serde(rename = "user_email", alias = "other_user_email")]
    pub email: String,
    /// Name shown in the dashboard
    #[serde(
        rename = "user_name",
        alias = "other_user_name",
        default,
        deserialize_with = "deserialize_nullable_name"
    )]
    pub display_name: String,
    /// SOS device registered by this connection, if any
    #[serde(default)]
    pub device_id: Option<String>,
    /// Start of the most recent SOS event (`"-"` on the wire means never)
    #[serde(
        rename = "last_sos",
        default,
        deserialize_with = "deserialize_last_sos"
    )]
    pub last_alert_at: Option<DateTime<Utc>>,
}

impl Connection {
    /// Create a connection with only identity and name
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
            device_id: None,
            last_alert_at: None,
        }
    }
}

/// Accept a null name as empty
fn deserialize_nullable_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a `/connections` payload row by row, dropping rows that carry no
/// usable email instead of failing the whole list
pub(crate) fn connections_from_rows(rows: Vec<serde_json::Value>) -> Vec<Connection> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<Connection>(row) {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::debug!("Skipping connection row: {}", e);
                None
            }
        })
        .collect()
}

/// Parse `last_sos`, treating the `"-"` placeholder and unparsable values as absent
fn deserialize_last_sos<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Parse an RFC 3339 timestamp as returned by the API
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One entry of the notification feed (`GET /notifications`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Email of the connection that raised the alert
    #[serde(default)]
    pub trigger_email: Option<String>,
    /// Name of the connection that raised the alert
    #[serde(default)]
    pub trigger_name: Option<String>,
    /// When the notification was acknowledged; `None` means unseen
    #[serde(default)]
    pub seen_at: Option<String>,
}

impl NotificationRecord {
    /// An unacknowledged alert from `email`
    pub fn unseen(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            trigger_email: Some(email.into()),
            trigger_name: Some(name.into()),
            seen_at: None,
        }
    }

    /// Whether this record still represents an unacknowledged alert
    pub fn is_unseen(&self) -> bool {
        self.seen_at.is_none()
    }
}

/// A past or ongoing SOS event of one connection (`GET /sos/events`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SosEvent {
    pub event_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub triggered_by: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub on_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub off_at: Option<DateTime<Utc>>,
    /// Whether the event has been closed
    #[serde(default)]
    pub handled: bool,
    /// Who closed the event, if anyone
    #[serde(default)]
    pub handled_by: Option<String>,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}
