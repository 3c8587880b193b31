use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sosdash_core::config::{Command, Config, Settings};
use sosdash_core::dashboard::DashboardBuilder;

mod commands;
mod render;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    let dashboard = DashboardBuilder::http(settings)
        .context("Failed to set up the API client")?
        .build();

    match cli.command() {
        Command::Watch => commands::watch(&dashboard).await,
        Command::Toggle => commands::toggle(&dashboard).await,
        Command::History { email } => commands::history(&dashboard, &email).await,
        Command::Token { token, user_id } => {
            commands::token(&dashboard, &token, user_id.as_deref())
        }
        Command::Logout => commands::logout(&dashboard),
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("sosdash=debug,sosdash_core=debug")
    } else {
        EnvFilter::new("sosdash=info,sosdash_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
