use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use sosdash_core::connections::{ConnectionRow, SosEvent};
use sosdash_core::sos::SelfAlertState;

const TIMESTAMP_FORMAT: &str = "%d-%m-%Y   %H:%M";

/// Format an SOS timestamp, `-` when absent
pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Status column of one connection row
pub fn status_cell(row: &ConnectionRow) -> String {
    if row.alerting {
        "ACTIVE SOS!".to_string()
    } else {
        format!("Last SOS: {}", format_timestamp(row.last_alert_at))
    }
}

/// Label of the action that toggling would perform
pub fn toggle_label(state: SelfAlertState) -> &'static str {
    match state {
        SelfAlertState::Idle => "send SOS",
        SelfAlertState::Active => "stop SOS",
    }
}

/// Render the full dashboard as text
pub fn dashboard(rows: &[ConnectionRow], own: SelfAlertState) -> String {
    let mut out = String::new();
    let name_width = rows
        .iter()
        .map(|r| display_name(r).chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let _ = writeln!(out, "Your SOS: {}", own);
    if rows.is_empty() {
        let _ = writeln!(out, "No connections yet");
    }
    for row in rows {
        let marker = if row.alerting { "!" } else { " " };
        let _ = writeln!(
            out,
            "{} {:<width$}  {}",
            marker,
            display_name(row),
            status_cell(row),
            width = name_width
        );
    }
    let _ = write!(out, "[t] {}  [r] refresh  [q] quit", toggle_label(own));
    out
}

fn display_name(row: &ConnectionRow) -> &str {
    if row.display_name.is_empty() {
        &row.email
    } else {
        &row.display_name
    }
}

/// Render the SOS history of one connection
pub fn history(email: &str, events: &[SosEvent]) -> String {
    if events.is_empty() {
        return format!("No SOS events for {}", email);
    }

    let mut out = format!("SOS history for {}", email);
    for event in events {
        let status = match (&event.off_at, event.handled) {
            (None, false) => "ongoing".to_string(),
            (_, true) => match &event.handled_by {
                Some(by) => format!("handled by {}", by),
                None => "handled".to_string(),
            },
            (Some(_), false) => "ended".to_string(),
        };
        let _ = write!(
            out,
            "\n  {}  ->  {}  ({})",
            format_timestamp(event.on_at),
            format_timestamp(event.off_at),
            status
        );
    }
    out
}
