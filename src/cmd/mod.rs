pub mod car;
pub mod salary;
pub mod schema;
pub mod years;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn format_gbp(amount: Decimal) -> String {
    format!("£{:.2}", amount)
}

pub fn format_gbp_signed(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-£{:.2}", amount.abs())
    } else {
        format!("£{:.2}", amount)
    }
}

/// Fraction as a percentage, trailing zeros removed (0.085 -> "8.5%")
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", (rate * dec!(100)).normalize())
}
