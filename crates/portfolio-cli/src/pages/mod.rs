//! Page controllers. Each page renders from the session snapshot, calls
//! session operations, and hands the resulting navigation back to the
//! router in `app`.

pub mod dashboard;
pub mod login;
pub mod register;

use portfolio_core::Navigation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Navigate(Navigation),
    Back,
    Stay,
    Quit,
}

impl From<Option<Navigation>> for PageAction {
    fn from(nav: Option<Navigation>) -> Self {
        nav.map(PageAction::Navigate).unwrap_or(PageAction::Stay)
    }
}
