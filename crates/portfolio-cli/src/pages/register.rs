use anyhow::Result;

use portfolio_core::models::RegisterRequest;

use super::PageAction;
use crate::app::App;
use crate::prompt;

pub async fn show(app: &mut App) -> Result<PageAction> {
    println!("\n== Create account ==");
    if let Some(error) = app.ctx.session.snapshot().error() {
        println!("Error: {}", error);
    }

    let username = prompt::line("Username ('b' to go back)", None)?;
    match username.as_str() {
        "b" => return Ok(PageAction::Back),
        "" => return Ok(PageAction::Stay),
        _ => {}
    }
    let email = prompt::line("Email", None)?;
    let password = prompt::password("Password")?;

    let request = RegisterRequest::new(username, email, password);
    Ok(app.ctx.session.register(&request).await.into())
}

/// `portfolio register`: one attempt, then report the notice or the error
pub async fn run_once(app: &mut App, username: Option<String>, email: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt::line("Username", None)?,
    };
    let email = match email {
        Some(email) => email,
        None => prompt::line("Email", None)?,
    };
    let password = prompt::password("Password")?;

    let request = RegisterRequest::new(username, email, password);
    match app.ctx.session.register(&request).await {
        Some(nav) => {
            app.go(nav);
            if let Some(notice) = app.ctx.session.take_notice() {
                println!("{}", notice);
            }
            Ok(())
        }
        None => {
            let snapshot = app.ctx.session.snapshot();
            anyhow::bail!("{}", snapshot.error().unwrap_or("Registration failed"))
        }
    }
}
