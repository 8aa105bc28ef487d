use crate::routes::{Navigation, Route};

use super::{SessionSnapshot, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session status not known yet; show a neutral placeholder
    Loading,
    Redirect(Navigation),
    Render,
}

/// Gate for protected routes. Stateless; evaluate it on every render.
pub struct RouteGuard;

impl RouteGuard {
    pub fn evaluate(snapshot: &SessionSnapshot) -> GuardDecision {
        match (snapshot.status, snapshot.token()) {
            // Redirecting before hydration would evict a valid session
            (Status::Initializing, _) => GuardDecision::Loading,
            (Status::Ready, None) => GuardDecision::Redirect(Navigation::replace(Route::ENTRY)),
            (Status::Ready, Some(_)) => GuardDecision::Render,
        }
    }

    /// Decision for an arbitrary route; public routes always render.
    pub fn check(route: Route, snapshot: &SessionSnapshot) -> GuardDecision {
        if route.is_protected() {
            Self::evaluate(snapshot)
        } else {
            GuardDecision::Render
        }
    }
}
