use crate::models::Payment;
use crate::stats::parse_timestamp;

pub const SUPPORTED_CURRENCIES: [&str; 4] = ["GHS", "USD", "EUR", "GBP"];

/// Assumed when a payment carries no currency.
pub const DEFAULT_CURRENCY: &str = "GHS";

/// Fixed conversion rates, `(from, to, rate)`.
const RATES: [(&str, &str, f64); 12] = [
    ("GHS", "USD", 0.083),
    ("GHS", "EUR", 0.076),
    ("GHS", "GBP", 0.065),
    ("USD", "GHS", 12.05),
    ("USD", "EUR", 0.92),
    ("USD", "GBP", 0.79),
    ("EUR", "GHS", 13.16),
    ("EUR", "USD", 1.09),
    ("EUR", "GBP", 0.86),
    ("GBP", "GHS", 15.38),
    ("GBP", "USD", 1.27),
    ("GBP", "EUR", 1.17),
];

pub fn conversion_rate(source: &str, target: &str) -> f64 {
    if source == target {
        return 1.0;
    }
    RATES
        .iter()
        .find(|(from, to, _)| *from == source && *to == target)
        .map(|(_, _, rate)| *rate)
        .unwrap_or(1.0)
}

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "GHS" => "₵",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        other => other,
    }
}

/// Currency of a single payment.
pub fn payment_currency(payment: &Payment) -> &str {
    if payment.currency.is_empty() {
        DEFAULT_CURRENCY
    } else {
        &payment.currency
    }
}

/// Currency that aggregated totals are denominated in: the first payment's.
pub fn payments_currency(payments: &[Payment]) -> &str {
    payments.first().map(payment_currency).unwrap_or(DEFAULT_CURRENCY)
}

pub fn format_currency(amount: f64, target: &str, source: &str) -> String {
    let converted = amount * conversion_rate(source, target);
    format!("{}{:.2}", currency_symbol(target), converted)
}

/// Long-form date such as `Monday, January 6, 2025 at 2:00 PM`.
pub fn format_session_date(value: &str) -> String {
    match parse_timestamp(value) {
        Some(at) => at.format("%A, %B %-d, %Y at %-I:%M %p").to_string(),
        None => value.to_string(),
    }
}

pub fn format_trend(value: f64) -> String {
    if value >= 0.0 {
        format!("+{value:.1}%")
    } else {
        format!("{value:.1}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_in_source_currency() {
        assert_eq!(format_currency(120.0, "GHS", "GHS"), "₵120.00");
    }

    #[test]
    fn converts_between_currencies() {
        assert_eq!(format_currency(100.0, "USD", "GHS"), "$8.30");
        assert_eq!(format_currency(10.0, "GHS", "GBP"), "₵153.80");
    }

    #[test]
    fn unknown_currency_falls_back_to_code() {
        assert_eq!(format_currency(5.0, "JPY", "GHS"), "JPY5.00");
    }

    #[test]
    fn totals_use_first_payment_currency() {
        let usd = Payment {
            currency: "USD".to_string(),
            ..Payment::default()
        };
        let unset = Payment::default();
        assert_eq!(payments_currency(&[usd.clone(), unset.clone()]), "USD");
        assert_eq!(payments_currency(&[unset.clone(), usd]), "GHS");
        assert_eq!(payments_currency(&[]), "GHS");
        assert_eq!(payment_currency(&unset), "GHS");
    }

    #[test]
    fn session_dates_read_naturally() {
        assert_eq!(
            format_session_date("2025-01-06T14:00:00Z"),
            "Monday, January 6, 2025 at 2:00 PM"
        );
        assert_eq!(format_session_date("tbd"), "tbd");
    }

    #[test]
    fn trends_carry_sign() {
        assert_eq!(format_trend(12.5), "+12.5%");
        assert_eq!(format_trend(-4.0), "-4.0%");
    }
}
