//! SpendScope CLI and REST API entry point.
//!
//! Binary name: `spendscope`
//!
//! Parses CLI arguments, initializes the database and chat engine, then
//! dispatches to the command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use spendscope_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, SessionCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let tracing_options = TracingOptions {
        otel: cli.otel,
        ..TracingOptions::from_verbosity(cli.verbose, cli.quiet)
    };
    if let Err(e) = init_tracing(&tracing_options) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "spendscope", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.user).await?;

    match cli.command {
        Commands::Serve { port, host } => serve(state, &host, port, cli.quiet).await?,

        Commands::Chat(args) => {
            cli::chat::chat(&state, args, cli.json, cli.verbose > 0).await?;
        }

        Commands::Sessions { action } => match action {
            SessionCommand::List { limit } => {
                cli::session::list_sessions(&state, limit, cli.json).await?;
            }
            SessionCommand::Show { id } => {
                cli::session::show_session(&state, id, cli.json).await?;
            }
            SessionCommand::Delete { id, force } => {
                cli::session::delete_session(&state, id, force, cli.json).await?;
            }
        },

        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn serve(state: AppState, host: &str, port: u16, quiet: bool) -> anyhow::Result<()> {
    // Ensure the local user has an API key, print it if new
    if let Some(api_key) = http::extractors::auth::ensure_api_key(&state).await? {
        println!();
        println!(
            "  {} API key generated (save this -- it won't be shown again):",
            console::style("🔑").bold()
        );
        println!();
        println!("  {}", console::style(&api_key).yellow().bold());
        println!();
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} SpendScope API listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}/api/v1")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }
    tracing::info!(%addr, data_dir = %state.data_dir.display(), "API server started");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
