//! Portfolio client core library.
//!
//! This crate owns everything in the client that carries state:
//!
//! - `api`: the HTTP gateway to the remote portfolio service
//! - `auth`: token persistence, the session store and the route guard
//! - `models`: request/response payloads for the remote service
//! - `config`: on-disk configuration and environment overrides
//! - `context`: the explicitly owned application context wiring it together
//!
//! Presentation (prompts, tables, routing loop) lives in `portfolio-cli`.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod routes;
pub mod utils;

pub use api::{ApiClient, ApiError, AuthGateway};
pub use auth::{
    FileTokenStore, GuardDecision, KeyringTokenStore, MemoryTokenStore, RequestError,
    RouteGuard, SessionSnapshot, SessionStore, TokenStore,
};
pub use config::Config;
pub use context::AppContext;
pub use routes::{Navigation, Route};
