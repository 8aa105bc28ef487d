use serde::{de, Deserialize, Deserializer, Serialize};

/// Portfolio of the authenticated user, as returned by `GET /portfolio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    #[serde(deserialize_with = "decimal")]
    pub cash_balance: f64,
    #[serde(default, deserialize_with = "optional_decimal")]
    pub total_portfolio_value: Option<f64>,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(alias = "ticker")]
    pub ticker_symbol: String,
    #[serde(deserialize_with = "decimal")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "optional_decimal")]
    pub current_market_value: Option<f64>,
    #[serde(default, alias = "average_price", deserialize_with = "optional_decimal")]
    pub average_purchase_price: Option<f64>,
}

impl PortfolioSnapshot {
    /// Market value of all holdings that have a known price
    pub fn holdings_value(&self) -> f64 {
        self.holdings
            .iter()
            .filter_map(|h| h.current_market_value)
            .sum()
    }

    /// Total value reported by the service, or cash plus priced holdings
    pub fn total_value(&self) -> f64 {
        self.total_portfolio_value
            .unwrap_or_else(|| self.cash_balance + self.holdings_value())
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// The service serializes decimals as strings; accept either form.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrText::Number(n) => Ok(n),
            NumberOrText::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid decimal: {:?}", s))),
        }
    }
}

pub(crate) fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrText::deserialize(deserializer)?.into_f64()
}

pub(crate) fn optional_decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    Option::<NumberOrText>::deserialize(deserializer)?
        .map(NumberOrText::into_f64)
        .transpose()
}
