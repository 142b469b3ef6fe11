//! Display formatting for table cells.

use chrono::{NaiveDate, NaiveDateTime};

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_DESCRIPTION: &str = "No description available";
pub const UNNAMED_STOCK: &str = "Unnamed Stock";
pub const UNNAMED_EXCHANGE: &str = "Unnamed Exchange";
pub const NEVER: &str = "Never";

/// Abbreviated dollar amount: `$1.50B`, `$2.80T`, `$999.00`.
///
/// Anything that is not a finite positive number is `N/A`.
pub fn format_money(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return NOT_AVAILABLE.to_string();
    }

    if value >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else {
        format!("${value:.2}")
    }
}

pub fn format_price(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), format_money)
}

/// `Dec 12, 1980`. Month names are always English.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// `Dec 12, 1980 14:05`
pub fn format_datetime(at: NaiveDateTime) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

pub fn format_optional_datetime(at: Option<NaiveDateTime>) -> String {
    at.map_or_else(|| NEVER.to_string(), format_datetime)
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| NOT_AVAILABLE.to_string(), format_date)
}

/// The value, or `placeholder` when it is missing or blank.
pub fn or_placeholder(value: Option<&str>, placeholder: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => placeholder.to_string(),
    }
}

pub fn market_status(live: bool) -> &'static str {
    if live { "Live" } else { "Closed" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money_thresholds() {
        assert_eq!(format_money(1_500_000_000.0), "$1.50B");
        assert_eq!(format_money(2_800_000_000_000.0), "$2.80T");
        assert_eq!(format_money(3_250_000.0), "$3.25M");
        assert_eq!(format_money(999.0), "$999.00");
        assert_eq!(format_money(0.5), "$0.50");
        // just under a threshold stays in the lower unit
        assert_eq!(format_money(999_999.0), "$999999.00");
    }

    #[test]
    fn test_format_money_not_available() {
        assert_eq!(format_money(0.0), "N/A");
        assert_eq!(format_money(-5.0), "N/A");
        assert_eq!(format_money(f64::NAN), "N/A");
        assert_eq!(format_money(f64::INFINITY), "N/A");
        assert_eq!(format_price(None), "N/A");
        assert_eq!(format_price(Some(12.0)), "$12.00");
    }

    #[test]
    fn test_format_dates() {
        let date = NaiveDate::from_ymd_opt(1980, 12, 12).unwrap();
        assert_eq!(format_date(date), "Dec 12, 1980");
        assert_eq!(format_optional_date(None), "N/A");

        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(format_datetime(at), "Mar 1, 2024 09:05");
        assert_eq!(format_optional_datetime(None), "Never");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(or_placeholder(Some("Apple"), UNNAMED_STOCK), "Apple");
        assert_eq!(or_placeholder(Some("   "), UNNAMED_STOCK), "Unnamed Stock");
        assert_eq!(or_placeholder(None, NO_DESCRIPTION), "No description available");
        assert_eq!(market_status(true), "Live");
        assert_eq!(market_status(false), "Closed");
    }
}
