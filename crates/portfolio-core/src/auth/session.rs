//! Session store: the process-wide owner of authentication state.
//!
//! The store holds the in-memory token and derived identity, a loading
//! status, and the last login/register error. It is the only writer of the
//! durable token store and of the gateway's default auth header; both are
//! updated in the same critical section as the snapshot, so observers never
//! see them disagree.
//!
//! Every login/register attempt, logout and navigation bumps a generation
//! counter. An in-flight result is applied only if the generation it was
//! issued under is still current, so a slow or abandoned request can never
//! overwrite newer state.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, AuthGateway};
use crate::models::{Credentials, PortfolioSnapshot, RegisterRequest};
use crate::routes::{Navigation, Route};

use super::TokenStore;

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your credentials and try again.";
pub const REGISTER_FAILED_MESSAGE: &str = "Registration failed. Please try again.";
pub const REGISTERED_NOTICE: &str = "Registration successful! Please log in.";
pub const PORTFOLIO_UNAVAILABLE_MESSAGE: &str =
    "Could not load your portfolio. Please try again later.";
pub const REQUEST_FAILED_MESSAGE: &str = "The request could not be completed. Please try again later.";
const TIMEOUT_MESSAGE: &str = "Connection timed out. Please try again.";
const OFFLINE_MESSAGE: &str = "Unable to connect to server. Check your internet connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Restoring the session from durable storage
    Initializing,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// The signed-in user. Carries the token it was derived from, so identity
/// and token can never exist one without the other.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    token: String,
}

impl Identity {
    fn new(token: String) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").field("token", &"<redacted>").finish()
    }
}

/// A login/register failure, tied to the page that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageError {
    message: String,
    route: Route,
}

/// Point-in-time view of the session, as page controllers read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: Status,
    user: Option<Identity>,
    error: Option<PageError>,
    notice: Option<String>,
    route: Option<Route>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: Status::Initializing,
            user: None,
            error: None,
            notice: None,
            route: None,
        }
    }
}

impl SessionSnapshot {
    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.user.as_ref().map(Identity::token)
    }

    pub fn loading(&self) -> bool {
        self.status == Status::Initializing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// Whether a one-shot notice is waiting to be taken
    pub fn has_notice(&self) -> bool {
        self.notice.is_some()
    }

    /// Last location reported through `SessionStore::navigated`
    pub fn route(&self) -> Option<Route> {
        self.route
    }

    pub fn state(&self) -> AuthState {
        match (self.status, &self.user) {
            (Status::Initializing, _) => AuthState::Initializing,
            (Status::Ready, Some(_)) => AuthState::Authenticated,
            (Status::Ready, None) => AuthState::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    #[cfg(test)]
    pub(crate) fn with(status: Status, token: Option<&str>) -> Self {
        Self {
            status,
            user: token.map(|t| Identity::new(t.to_string())),
            ..Self::default()
        }
    }
}

/// Failure of a request made on behalf of the current session.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The service rejected the token. `redirect` is set when this ended
    /// the session that made the request.
    #[error("Your session has expired. Please log in again.")]
    SessionExpired { redirect: Option<Navigation> },

    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl RequestError {
    pub fn redirect(&self) -> Option<Navigation> {
        match self {
            RequestError::SessionExpired { redirect } => *redirect,
            RequestError::Failed { .. } => None,
        }
    }
}

/// User-facing text for a failed remote call
fn failure_message(error: &ApiError, fallback: &str) -> String {
    if let Some(message) = error.server_message() {
        return message.to_string();
    }
    let message = match error {
        ApiError::Timeout => TIMEOUT_MESSAGE,
        ApiError::NetworkError(_) => OFFLINE_MESSAGE,
        _ => fallback,
    };
    message.to_string()
}

pub struct SessionStore {
    gateway: Arc<dyn AuthGateway>,
    tokens: Arc<dyn TokenStore>,
    state: watch::Sender<SessionSnapshot>,
    generation: AtomicU64,
    hydrated: AtomicBool,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn AuthGateway>, tokens: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            gateway,
            tokens,
            state,
            generation: AtomicU64::new(0),
            hydrated: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Restore the session from durable storage.
    ///
    /// Runs once per store; later calls only report the current state. A
    /// missing or unreadable token means "no session", never an error.
    pub fn hydrate(&self) -> AuthState {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            debug!("Session already hydrated");
            return self.snapshot().state();
        }

        let stored = self.tokens.read();
        self.state.send_modify(|snapshot| {
            if let Some(token) = stored {
                self.gateway.set_auth_token(Some(&token));
                snapshot.user = Some(Identity::new(token));
            }
            snapshot.status = Status::Ready;
        });

        let state = self.snapshot().state();
        info!(?state, "Session hydrated");
        state
    }

    pub async fn login(&self, credentials: &Credentials) -> Option<Navigation> {
        let attempt = self.begin_attempt();
        debug!(attempt, email = %credentials.email, "Login attempt");

        match self.gateway.login(credentials).await {
            Ok(response) => {
                let applied = self.commit(attempt, |snapshot| {
                    self.install(snapshot, Some(response.access_token));
                    snapshot.error = None;
                });
                if applied {
                    info!("Login successful");
                    Some(Navigation::push(Route::LANDING))
                } else {
                    debug!(attempt, "Discarding superseded login result");
                    None
                }
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.record_error(attempt, failure_message(&e, LOGIN_FAILED_MESSAGE), Route::Login);
                None
            }
        }
    }

    /// Create an account. Never signs the user in: on success a one-shot
    /// notice is queued and the caller is sent to the login page.
    pub async fn register(&self, user: &RegisterRequest) -> Option<Navigation> {
        let attempt = self.begin_attempt();
        debug!(attempt, username = %user.username, "Registration attempt");

        match self.gateway.register(user).await {
            Ok(()) => {
                let applied = self.commit(attempt, |snapshot| {
                    snapshot.notice = Some(REGISTERED_NOTICE.to_string());
                });
                if applied {
                    info!(username = %user.username, "Registration successful");
                    Some(Navigation::push(Route::ENTRY))
                } else {
                    debug!(attempt, "Discarding superseded registration result");
                    None
                }
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.record_error(
                    attempt,
                    failure_message(&e, REGISTER_FAILED_MESSAGE),
                    Route::Register,
                );
                None
            }
        }
    }

    /// End the session. Safe to call when already signed out.
    pub fn logout(&self) -> Navigation {
        let was_authenticated = self.state.send_if_modified(|snapshot| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            let had_user = snapshot.user.is_some();
            self.install(snapshot, None);
            had_user
        });
        if was_authenticated {
            info!("Logged out");
        }
        Navigation::replace(Route::ENTRY)
    }

    /// Take the pending one-shot notice, if any
    pub fn take_notice(&self) -> Option<String> {
        let mut notice = None;
        self.state.send_if_modified(|snapshot| {
            notice = snapshot.notice.take();
            notice.is_some()
        });
        notice
    }

    /// Report that the caller moved to `to`.
    ///
    /// Leaving a page abandons its in-flight requests and clears an error
    /// that belongs to another page.
    pub fn navigated(&self, to: Route) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.route == Some(to) {
                return false;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            snapshot.route = Some(to);
            if snapshot.error.as_ref().is_some_and(|e| e.route != to) {
                snapshot.error = None;
            }
            true
        });
        debug!(route = %to, "Navigated");
    }

    /// Fetch the portfolio for the current session
    pub async fn portfolio(&self) -> Result<PortfolioSnapshot, RequestError> {
        self.guarded(self.gateway.get_portfolio())
            .await
            .map_err(|e| match e {
                RequestError::Failed { source, .. } => {
                    error!(error = %source, "Failed to load portfolio");
                    RequestError::Failed {
                        message: PORTFOLIO_UNAVAILABLE_MESSAGE.to_string(),
                        source,
                    }
                }
                expired => expired,
            })
    }

    /// Run an authenticated request. A `401` ends the session that issued
    /// it, unless something newer has replaced that session in the meantime.
    pub async fn guarded<T, F>(&self, request: F) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let issued = self.generation.load(Ordering::SeqCst);
        match request.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() => {
                let ended = self.commit(issued, |snapshot| {
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    self.install(snapshot, None);
                });
                if ended {
                    warn!("Session rejected by service, logged out");
                } else {
                    debug!("Ignoring rejection of a superseded session");
                }
                Err(RequestError::SessionExpired {
                    redirect: ended.then(|| Navigation::replace(Route::ENTRY)),
                })
            }
            Err(e) => Err(RequestError::Failed {
                message: failure_message(&e, REQUEST_FAILED_MESSAGE),
                source: e,
            }),
        }
    }

    /// Start a login/register attempt: supersede older ones, clear the error.
    fn begin_attempt(&self) -> u64 {
        let mut attempt = 0;
        self.state.send_if_modified(|snapshot| {
            attempt = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            snapshot.error.take().is_some()
        });
        attempt
    }

    /// Apply `update` if the generation is still `expected`.
    /// Returns whether it was applied.
    fn commit(&self, expected: u64, update: impl FnOnce(&mut SessionSnapshot)) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|snapshot| {
            if self.generation.load(Ordering::SeqCst) != expected {
                return false;
            }
            update(snapshot);
            applied = true;
            true
        });
        applied
    }

    fn record_error(&self, attempt: u64, message: String, route: Route) {
        let applied = self.commit(attempt, |snapshot| {
            snapshot.error = Some(PageError { message, route });
        });
        if !applied {
            debug!(attempt, "Discarding superseded failure");
        }
    }

    /// Write `token` through to durable storage and the gateway header.
    /// Must run inside a snapshot update, so the store I/O here is
    /// synchronous and holds the snapshot lock until it finishes.
    fn install(&self, snapshot: &mut SessionSnapshot, token: Option<String>) {
        let persisted = match &token {
            Some(token) => self.tokens.write(token),
            None => self.tokens.clear(),
        };
        if let Err(e) = persisted {
            warn!(error = %e, "Failed to persist session token");
        }
        self.gateway.set_auth_token(token.as_deref());
        snapshot.user = token.map(Identity::new);
    }
}
