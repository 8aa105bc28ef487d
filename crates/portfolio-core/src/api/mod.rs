//! REST API client module for the portfolio service.
//!
//! This module provides the `ApiClient` for registering, logging in and
//! fetching portfolio and market data, plus the `AuthGateway` seam the
//! session store talks through.
//!
//! The service uses JWT bearer tokens obtained from `POST /auth/login`.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::{ApiClient, DEFAULT_API_URL};
pub use error::ApiError;
pub use gateway::AuthGateway;
