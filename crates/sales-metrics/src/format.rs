//! Display helpers for dashboard values

use rust_decimal::{Decimal, RoundingStrategy};

/// German-locale EUR amount, e.g. `24.500,00 €`
pub fn format_eur(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    format!("{}{},{}\u{a0}€", sign, group_thousands(int_part), frac_part)
}

/// Integer percentage, e.g. `156%`
pub fn format_percent(value: i64) -> String {
    format!("{}%", value)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_eur() {
        assert_eq!(format_eur(dec!(24500)), "24.500,00\u{a0}€");
        assert_eq!(format_eur(dec!(5000)), "5.000,00\u{a0}€");
        assert_eq!(format_eur(dec!(999.995)), "1.000,00\u{a0}€");
        assert_eq!(format_eur(dec!(0.5)), "0,50\u{a0}€");
        assert_eq!(format_eur(dec!(1234567.891)), "1.234.567,89\u{a0}€");
        assert_eq!(format_eur(dec!(-7500)), "-7.500,00\u{a0}€");
        assert_eq!(format_eur(dec!(-0.001)), "0,00\u{a0}€");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(156), "156%");
        assert_eq!(format_percent(-40), "-40%");
    }
}
