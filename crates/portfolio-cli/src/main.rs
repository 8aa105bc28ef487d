//! Portfolio CLI - a terminal client for the virtual portfolio service.
//!
//! Register, sign in, and view your portfolio from the command line. The
//! session token is kept between runs, so signing in once is enough until
//! the service expires it.

mod app;
mod pages;
mod prompt;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portfolio_core::auth::AuthState;
use portfolio_core::models::TradeSide;
use portfolio_core::{GuardDecision, Route, RouteGuard};

use app::App;

/// Environment variable naming a directory for daily log files
const LOG_DIR_ENV: &str = "PORTFOLIO_LOG_DIR";

#[derive(Parser)]
#[command(name = "portfolio", version, about = "Terminal client for the portfolio service")]
struct Cli {
    /// Keep the session token in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session starting at the dashboard (default)
    Run,
    /// Sign in and store the session token
    Login {
        #[arg(long, env = "PORTFOLIO_EMAIL")]
        email: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Show the portfolio once
    Dashboard,
    /// Show whether a session is stored
    Status,
    /// Latest quote for a ticker
    Quote { ticker: String },
    /// Search assets by name or symbol
    Search { query: String },
    /// Buy whole shares
    Buy { ticker: String, quantity: u32 },
    /// Sell whole shares
    Sell { ticker: String, quantity: u32 },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "portfolio.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();
    info!("Portfolio client starting");

    let mut app = App::new(cli.ephemeral)?;
    let state = app.start();

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => app.run(Route::LANDING).await,
        Command::Login { email } => pages::login::run_once(&mut app, email).await,
        Command::Register { username, email } => {
            pages::register::run_once(&mut app, username, email).await
        }
        Command::Logout => {
            let nav = app.ctx.session.logout();
            app.go(nav);
            println!("Signed out.");
            Ok(())
        }
        Command::Dashboard => dashboard_once(&mut app).await,
        Command::Status => {
            print_status(&app, state);
            Ok(())
        }
        Command::Quote { ticker } => pages::dashboard::quote(&app, &ticker).await,
        Command::Search { query } => pages::dashboard::search(&app, &query).await,
        Command::Buy { ticker, quantity } => {
            pages::dashboard::trade(&app, TradeSide::Buy, &ticker, quantity).await
        }
        Command::Sell { ticker, quantity } => {
            pages::dashboard::trade(&app, TradeSide::Sell, &ticker, quantity).await
        }
    };

    info!("Portfolio client shutting down");
    result
}

/// `portfolio dashboard`: guard, render once, no prompts
async fn dashboard_once(app: &mut App) -> Result<()> {
    match RouteGuard::check(Route::Dashboard, &app.ctx.session.snapshot()) {
        GuardDecision::Render => {}
        GuardDecision::Loading => anyhow::bail!("Session is still loading"),
        GuardDecision::Redirect(nav) => {
            app.go(nav);
            anyhow::bail!("Not signed in. Run `portfolio login` first.");
        }
    }
    app.go(portfolio_core::Navigation::push(Route::Dashboard));
    if let Some(nav) = pages::dashboard::render_portfolio(app).await {
        app.go(nav);
        anyhow::bail!("Session expired. Run `portfolio login` again.");
    }
    Ok(())
}

fn print_status(app: &App, state: AuthState) {
    println!("Service:  {}", app.ctx.api.base_url());
    let label = match state {
        AuthState::Authenticated => "signed in",
        AuthState::Unauthenticated => "signed out",
        AuthState::Initializing => "loading",
    };
    println!("Session:  {}", label);
    if let Some(email) = app.config.last_email.as_deref() {
        println!("Last user: {}", email);
    }
}
