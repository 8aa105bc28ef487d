//! Application state and the page router.
//!
//! `App` owns the configuration and the `AppContext`, tracks the current
//! route, and applies the navigations returned by session operations.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use portfolio_core::auth::{AuthState, MemoryTokenStore};
use portfolio_core::{AppContext, Config, GuardDecision, Navigation, Route, RouteGuard};

use crate::pages::{self, PageAction};

pub struct App {
    pub config: Config,
    pub ctx: AppContext,
    route: Route,
    history: Vec<Route>,
}

impl App {
    /// Create the application. `ephemeral` keeps the token in memory only.
    pub fn new(ephemeral: bool) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let ctx = if ephemeral {
            AppContext::with_token_store(&config.api_url(), Arc::new(MemoryTokenStore::new()))?
        } else {
            AppContext::from_config(&config)?
        };

        Ok(Self {
            config,
            ctx,
            route: Route::LANDING,
            history: Vec::new(),
        })
    }

    /// Restore any saved session. Must run before the first render.
    pub fn start(&mut self) -> AuthState {
        self.ctx.session.hydrate()
    }

    /// Apply a navigation and report it to the session store
    pub fn go(&mut self, nav: Navigation) {
        if !nav.replace && nav.to != self.route {
            self.history.push(self.route);
        }
        debug!(from = %self.route, to = %nav.to, replace = nav.replace, "Navigate");
        self.route = nav.to;
        self.ctx.session.navigated(nav.to);
    }

    /// Return to the previous page, re-checked by the guard on the next pass
    pub fn back(&mut self) {
        if let Some(previous) = self.history.pop() {
            self.route = previous;
            self.ctx.session.navigated(previous);
        }
    }

    /// Remember the email of the last successful sign-in
    pub fn remember_email(&mut self, email: &str) {
        if self.config.last_email.as_deref() == Some(email) {
            return;
        }
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    /// Interactive loop: evaluate the guard, render the page, apply the
    /// navigation it returns.
    pub async fn run(&mut self, start: Route) -> Result<()> {
        self.go(Navigation::replace(start));

        loop {
            let snapshot = self.ctx.session.snapshot();
            match RouteGuard::check(self.route, &snapshot) {
                GuardDecision::Loading => {
                    println!("Loading...");
                    self.start();
                    continue;
                }
                GuardDecision::Redirect(nav) => {
                    self.go(nav);
                    continue;
                }
                GuardDecision::Render => {}
            }

            let action = match self.route {
                Route::Login => pages::login::show(self).await?,
                Route::Register => pages::register::show(self).await?,
                Route::Dashboard => pages::dashboard::show(self).await?,
            };

            match action {
                PageAction::Navigate(nav) => self.go(nav),
                PageAction::Back => self.back(),
                PageAction::Stay => {}
                PageAction::Quit => break,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl App {
    /// App around a prepared context, with default config and no history
    pub(crate) fn with_context(ctx: AppContext) -> Self {
        App {
            config: Config::default(),
            ctx,
            route: Route::LANDING,
            history: Vec::new(),
        }
    }
}
