//! Data models for the portfolio service.
//!
//! - `Credentials`, `RegisterRequest`, `LoginResponse`: auth payloads
//! - `PortfolioSnapshot`, `Holding`: the authenticated user's portfolio
//! - `Quote`, `AssetMatch`, `TradeOrder`, `TradeReceipt`: market and trading

pub mod auth;
pub mod market;
pub mod portfolio;

pub use auth::{Credentials, LoginResponse, RegisterRequest};
pub use market::{AssetMatch, Quote, TradeOrder, TradeReceipt, TradeSide};
pub use portfolio::{Holding, PortfolioSnapshot};
