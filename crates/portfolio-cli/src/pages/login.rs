use anyhow::Result;

use portfolio_core::models::Credentials;
use portfolio_core::{Navigation, Route};

use super::PageAction;
use crate::app::App;
use crate::prompt;

/// Environment variable supplying the password for non-interactive use
const PASSWORD_ENV: &str = "PORTFOLIO_PASSWORD";

pub async fn show(app: &mut App) -> Result<PageAction> {
    println!("\n== Sign in ==");
    if let Some(notice) = app.ctx.session.take_notice() {
        println!("{}", notice);
    }
    if let Some(error) = app.ctx.session.snapshot().error() {
        println!("Error: {}", error);
    }

    let default_email = app.config.last_email.clone();
    let email = prompt::line(
        "Email ('r' to register, 'q' to quit)",
        default_email.as_deref(),
    )?;
    match email.as_str() {
        "q" => return Ok(PageAction::Quit),
        "r" => return Ok(PageAction::Navigate(Navigation::push(Route::Register))),
        "" => return Ok(PageAction::Stay),
        _ => {}
    }

    let password = prompt::password("Password")?;
    Ok(submit(app, email, password).await.into())
}

/// Sign in and remember the email on success
pub async fn submit(app: &mut App, email: String, password: String) -> Option<Navigation> {
    let credentials = Credentials::new(email, password);
    let nav = app.ctx.session.login(&credentials).await;
    if nav.is_some() {
        app.remember_email(&credentials.email);
    }
    nav
}

/// `portfolio login`: one attempt, credentials from flags, env, or prompt
pub async fn run_once(app: &mut App, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| app.config.last_email.clone()) {
        Some(email) if !email.is_empty() => email,
        _ => prompt::line("Email", None)?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => prompt::password("Password")?,
    };

    match submit(app, email, password).await {
        Some(nav) => {
            app.go(nav);
            println!("Signed in.");
            Ok(())
        }
        None => {
            let snapshot = app.ctx.session.snapshot();
            let message = snapshot.error().unwrap_or("Login failed");
            anyhow::bail!("{}", message)
        }
    }
}
