//! Authentication module: token persistence, session state and route gating.
//!
//! This module provides:
//! - `TokenStore`: durable storage of the single session token (file,
//!   OS keychain, or memory)
//! - `SessionStore`: the session state machine and sole token writer
//! - `RouteGuard`: the render/redirect decision for protected routes

pub mod guard;
pub mod session;
pub mod token_store;

pub use guard::{GuardDecision, RouteGuard};
pub use session::{AuthState, Identity, RequestError, SessionSnapshot, SessionStore, Status};
pub use token_store::{origin_key, FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
