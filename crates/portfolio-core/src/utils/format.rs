use crate::models::Holding;

/// Shown instead of a holdings table when there is nothing to list
pub const NO_HOLDINGS_MESSAGE: &str = "You have no holdings in your portfolio.";

/// Width of the symbol column in the holdings table
const SYMBOL_WIDTH: usize = 10;

/// Format an amount as dollars with thousands separators: `$1,234.50`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Market value for a holding, or `N/A` when the service has no price
pub fn format_market_value(value: Option<f64>) -> String {
    value.map(format_currency).unwrap_or_else(|| "N/A".to_string())
}

/// Quantities are usually whole shares; drop a trailing `.0`
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        let text = format!("{:.6}", quantity);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Render holdings as a plain-text table
pub fn holdings_table(holdings: &[Holding]) -> String {
    if holdings.is_empty() {
        return NO_HOLDINGS_MESSAGE.to_string();
    }

    let mut out = format!("{:<w$}  {:>12}  {:>16}\n", "Symbol", "Quantity", "Market Value", w = SYMBOL_WIDTH);
    out.push_str(&"-".repeat(SYMBOL_WIDTH + 2 + 12 + 2 + 16));
    for holding in holdings {
        out.push('\n');
        out.push_str(&format!(
            "{:<w$}  {:>12}  {:>16}",
            truncate_string(&holding.ticker_symbol, SYMBOL_WIDTH),
            format_quantity(holding.quantity),
            format_market_value(holding.current_market_value),
            w = SYMBOL_WIDTH
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(750.5), "$750.50");
        assert_eq!(format_currency(1234.567), "$1,234.57");
        assert_eq!(format_currency(100000.0), "$100,000.00");
        assert_eq!(format_currency(-42.1), "-$42.10");
    }

    #[test]
    fn test_format_market_value() {
        assert_eq!(format_market_value(Some(12.0)), "$12.00");
        assert_eq!(format_market_value(None), "N/A");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(5.0), "5");
        assert_eq!(format_quantity(0.25), "0.25");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_holdings_table() {
        assert_eq!(holdings_table(&[]), NO_HOLDINGS_MESSAGE);

        let table = holdings_table(&[Holding {
            ticker_symbol: "AAPL".into(),
            quantity: 5.0,
            current_market_value: None,
            average_purchase_price: None,
        }]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Symbol"));
        assert!(lines[2].starts_with("AAPL"));
        assert!(lines[2].ends_with("N/A"));
    }
}
