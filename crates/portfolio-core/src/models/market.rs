use serde::{Deserialize, Serialize};

use super::portfolio::decimal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    #[serde(deserialize_with = "decimal")]
    pub price: f64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMatch {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "stockExchange")]
    pub stock_exchange: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn path(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// Body of `POST /portfolio/buy` and `POST /portfolio/sell`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeOrder {
    pub ticker: String,
    pub quantity: u32,
}

impl TradeOrder {
    /// Build an order, normalizing the ticker the way the service stores it.
    /// Returns `None` for an empty ticker or a zero quantity.
    pub fn new(ticker: &str, quantity: u32) -> Option<Self> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() || quantity == 0 {
            return None;
        }
        Some(Self { ticker, quantity })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeReceipt {
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_order_normalizes() {
        let order = TradeOrder::new(" aapl ", 3).unwrap();
        assert_eq!(order.ticker, "AAPL");
        assert_eq!(order.quantity, 3);
        assert!(TradeOrder::new("", 3).is_none());
        assert!(TradeOrder::new("AAPL", 0).is_none());
    }

    #[test]
    fn test_parse_search_results() {
        let json = r#"[{"symbol": "AAPL", "name": "Apple Inc.", "currency": "USD", "stockExchange": "NASDAQ"}]"#;
        let results: Vec<AssetMatch> = serde_json::from_str(json).unwrap();
        assert_eq!(results[0].stock_exchange.as_deref(), Some("NASDAQ"));
    }

    #[test]
    fn test_parse_quote() {
        let quote: Quote =
            serde_json::from_str(r#"{"symbol": "AAPL", "price": 150.0, "name": "Test Asset"}"#)
                .unwrap();
        assert_eq!(quote.price, 150.0);
        assert_eq!(quote.name.as_deref(), Some("Test Asset"));
    }
}
