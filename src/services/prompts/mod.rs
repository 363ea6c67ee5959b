//! Pure prompt rendering.
//!
//! Builders take structured inputs and return a single text block; they never
//! touch storage or the network, so identical inputs always render identically.

pub mod book;
pub mod meal;

pub use book::{build_book_prompt, BookPreferences, BOOK_RESPONSE_SCHEMA};
pub use meal::{build_meal_prompt, MealPreferences, MEAL_RESPONSE_SCHEMA};

/// Renders a number without a trailing `.0` for whole values
pub(crate) fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.2}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// One decimal place, used for every computed score or percentage
pub(crate) fn format_one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(0.5), "0.5");
        assert_eq!(format_quantity(1.25), "1.25");
        assert_eq!(format_quantity(1.333), "1.33");
    }

    #[test]
    fn test_format_one_decimal() {
        assert_eq!(format_one_decimal(42.857), "42.9");
        assert_eq!(format_one_decimal(4.0), "4.0");
    }
}
