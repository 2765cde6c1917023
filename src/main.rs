use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whatiamtodo::app;
use whatiamtodo::cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "starting");

    if let Err(e) = app::run(cli).await {
        if e.is_session_expired() {
            eprintln!(
                "{} run `{} login` to sign in",
                "Session expired:".yellow().bold(),
                whatiamtodo::metadata::PKG_NAME
            );
        } else {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}
