use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use sosdash_core::api::{AlertApi, ApiError};
use sosdash_core::auth::SessionToken;
use sosdash_core::dashboard::{Dashboard, DashboardEvent, DashboardSession};

use crate::render;

/// Turn an API error into a user-facing one
fn describe(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Unauthenticated => {
            anyhow!("Not signed in. Run `sosdash token <TOKEN>` or set SOSDASH_TOKEN")
        }
        other => anyhow!(other),
    }
}

fn redraw<A: AlertApi>(session: &DashboardSession<A>) {
    println!("\n{}", render::dashboard(&session.rows(), session.self_alert_state()));
}

/// Interactive dashboard until `q`, end of input or Ctrl-C
pub async fn watch<A: AlertApi>(dashboard: &Dashboard<A>) -> Result<()> {
    let mut events = dashboard.subscribe();
    let session = match dashboard.activate().await {
        Ok(session) => session,
        Err(e) if e.is_fatal() => return Err(describe(e)),
        Err(e) => {
            return Err(describe(e)
                .context("Could not load the dashboard; `sosdash toggle` still sends your SOS"))
        }
    };
    redraw(&session);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            line = input.next_line() => {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => break Err(e.into()),
                };
                match line.as_deref().map(str::trim) {
                    None | Some("q") => break Ok(()),
                    Some("t") => match session.toggle_self_alert().await {
                        Ok(state) => println!("Your SOS is now {}", state),
                        Err(e) if e.is_fatal() => break Err(describe(e)),
                        Err(e) => eprintln!("Could not toggle SOS: {}", e),
                    },
                    Some("r") => {
                        let _ = session.refresh_now();
                    }
                    Some("") => redraw(&session),
                    Some(other) => eprintln!("Unknown command: {}", other),
                }
            }
            event = events.recv() => match event {
                Ok(DashboardEvent::AlertSetChanged)
                | Ok(DashboardEvent::SelfAlertChanged { .. }) => redraw(&session),
                Ok(DashboardEvent::SosAlert { trigger_name, .. }) => {
                    println!("\n*** SOS alert from {} ***", trigger_name);
                }
                Ok(DashboardEvent::RefreshFailed { error, .. }) if error.is_fatal() => {
                    break Err(describe(error));
                }
                Ok(DashboardEvent::RefreshFailed { source, error }) => {
                    tracing::debug!("Refresh ({}) failed: {}", source, error);
                }
                Ok(DashboardEvent::ConnectionsLoaded { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dashboard events lagged");
                    redraw(&session);
                }
                Err(RecvError::Closed) => break Ok(()),
            }
        }
    };

    session.deactivate();
    result
}

/// Toggle the own SOS once and report the server's answer.
///
/// Needs only the token; connections and alerts are not loaded.
pub async fn toggle<A: AlertApi>(dashboard: &Dashboard<A>) -> Result<()> {
    let state = dashboard.toggle_self_alert().await.map_err(describe)?;
    println!("Your SOS is now {}", state);
    Ok(())
}

pub async fn history<A: AlertApi>(dashboard: &Dashboard<A>, email: &str) -> Result<()> {
    let events = dashboard.history(email).await.map_err(describe)?;
    println!("{}", render::history(email, &events));
    Ok(())
}

pub fn token<A: AlertApi>(
    dashboard: &Dashboard<A>,
    token: &str,
    user_id: Option<&str>,
) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token must not be empty");
    }
    dashboard.sign_in(SessionToken::new(token), user_id)?;
    println!("Token saved");
    Ok(())
}

pub fn logout<A: AlertApi>(dashboard: &Dashboard<A>) -> Result<()> {
    dashboard.logout()?;
    println!("Signed out");
    Ok(())
}
