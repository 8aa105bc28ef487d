use anyhow::Result;
use futures::future::join_all;
use tracing::debug;

use portfolio_core::models::{PortfolioSnapshot, TradeOrder, TradeSide};
use portfolio_core::utils::{format_currency, holdings_table};
use portfolio_core::{Navigation, RequestError};

use super::PageAction;
use crate::app::App;
use crate::prompt;

pub async fn show(app: &mut App) -> Result<PageAction> {
    println!("\n== Dashboard ==");
    if let Some(nav) = render_portfolio(app).await {
        return Ok(PageAction::Navigate(nav));
    }

    println!("\n[r]efresh  [q]uote  [f]ind  [b]uy  [s]ell  [l]ogout  e[x]it");
    let choice = prompt::line("Action", Some("r"))?;
    let outcome = match choice.as_str() {
        "r" => return Ok(PageAction::Stay),
        "x" => return Ok(PageAction::Quit),
        "l" => return Ok(PageAction::Navigate(app.ctx.session.logout())),
        "q" => {
            let ticker = prompt::line("Ticker", None)?;
            quote(app, &ticker).await
        }
        "f" => {
            let query = prompt::line("Search", None)?;
            search(app, &query).await
        }
        "b" | "s" => {
            let side = if choice == "b" { TradeSide::Buy } else { TradeSide::Sell };
            let ticker = prompt::line("Ticker", None)?;
            let quantity = prompt::line("Quantity", None)?;
            match quantity.parse::<u32>() {
                Ok(quantity) => trade(app, side, &ticker, quantity).await,
                Err(_) => {
                    println!("Quantity must be a positive whole number");
                    Ok(())
                }
            }
        }
        _ => Ok(()),
    };

    match outcome {
        Ok(()) => Ok(PageAction::Stay),
        Err(e) => match e.downcast_ref::<RequestError>().and_then(RequestError::redirect) {
            Some(nav) => {
                println!("{}", e);
                Ok(PageAction::Navigate(nav))
            }
            None => {
                println!("Error: {}", e);
                Ok(PageAction::Stay)
            }
        },
    }
}

/// Print the portfolio. Returns a navigation when the session ended.
pub async fn render_portfolio(app: &App) -> Option<Navigation> {
    let mut portfolio = match app.ctx.session.portfolio().await {
        Ok(portfolio) => portfolio,
        Err(e) => {
            println!("{}", e);
            return e.redirect();
        }
    };
    if let Some(nav) = fill_market_values(app, &mut portfolio).await {
        println!("Your session has expired. Please log in again.");
        return Some(nav);
    }

    println!("Cash balance:     {}", format_currency(portfolio.cash_balance));
    println!("Portfolio value:  {}", format_currency(portfolio.total_value()));
    println!();
    println!("{}", holdings_table(&portfolio.holdings));
    None
}

/// Price holdings the service returned without a market value.
/// Quotes are fetched concurrently; a failed quote leaves the value unknown.
/// Returns a navigation when a rejected token ended the session.
async fn fill_market_values(app: &App, portfolio: &mut PortfolioSnapshot) -> Option<Navigation> {
    let missing: Vec<usize> = portfolio
        .holdings
        .iter()
        .enumerate()
        .filter(|(_, h)| h.current_market_value.is_none())
        .map(|(i, _)| i)
        .collect();
    if missing.is_empty() {
        return None;
    }

    let quotes = join_all(missing.iter().map(|&i| {
        let ticker = &portfolio.holdings[i].ticker_symbol;
        app.ctx.session.guarded(app.ctx.api.get_quote(ticker))
    }))
    .await;

    let mut redirect = None;
    for (i, quote) in missing.into_iter().zip(quotes) {
        match quote {
            Ok(quote) => {
                let holding = &mut portfolio.holdings[i];
                holding.current_market_value = Some(quote.price * holding.quantity);
            }
            Err(e @ RequestError::SessionExpired { .. }) => {
                // Only the quote that ended the session carries the redirect
                redirect = redirect.or(e.redirect());
            }
            Err(e) => debug!(error = %e, "Quote unavailable"),
        }
    }
    redirect
}

pub async fn quote(app: &App, ticker: &str) -> Result<()> {
    let quote = app.ctx.session.guarded(app.ctx.api.get_quote(ticker)).await?;
    match quote.name {
        Some(name) => println!("{} ({}): {}", quote.symbol, name, format_currency(quote.price)),
        None => println!("{}: {}", quote.symbol, format_currency(quote.price)),
    }
    Ok(())
}

pub async fn search(app: &App, query: &str) -> Result<()> {
    let results = app.ctx.session.guarded(app.ctx.api.search_assets(query)).await?;
    if results.is_empty() {
        println!("No matches for '{}'", query);
    }
    for asset in results {
        let exchange = asset.stock_exchange.as_deref().unwrap_or("-");
        println!("{:<8} {:<40} {}", asset.symbol, asset.name, exchange);
    }
    Ok(())
}

pub async fn trade(app: &App, side: TradeSide, ticker: &str, quantity: u32) -> Result<()> {
    let order = TradeOrder::new(ticker, quantity)
        .ok_or_else(|| anyhow::anyhow!("A ticker and a positive quantity are required"))?;
    let receipt = app.ctx.session.guarded(app.ctx.api.trade(side, &order)).await?;
    println!("{}", receipt.msg);
    Ok(())
}
