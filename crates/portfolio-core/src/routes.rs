//! Application routes and navigation effects.
//!
//! Session operations never navigate on their own. They return a
//! `Navigation` and the caller applies it, then reports the new location
//! back through `SessionStore::navigated`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
}

impl Route {
    /// Where a successful login lands
    pub const LANDING: Route = Route::Dashboard;

    /// Where unauthenticated users are sent
    pub const ENTRY: Route = Route::Login;

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/dashboard" | "" => Some(Route::Dashboard),
            _ => None,
        }
    }

    /// Protected routes render only behind the route guard
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A navigation the caller is expected to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub to: Route,
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl Navigation {
    pub fn push(to: Route) -> Self {
        Self { to, replace: false }
    }

    pub fn replace(to: Route) -> Self {
        Self { to, replace: true }
    }
}
