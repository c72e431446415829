//! Display formatting for observed quantities.

/// Render `value` with two decimals followed by `unit`, e.g. `23.46°C`.
pub fn format_float(value: f64, unit: &str) -> String {
    format!("{value:.2}{unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_decimals_with_suffix() {
        assert_eq!(format_float(23.456789, "°C"), "23.46°C");
        assert_eq!(format_float(25.987654, "°C"), "25.99°C");
        assert_eq!(format_float(60.98765, "%"), "60.99%");
    }

    #[test]
    fn pads_and_keeps_sign() {
        assert_eq!(format_float(5.0, "%"), "5.00%");
        assert_eq!(format_float(-3.456, "°C"), "-3.46°C");
        assert_eq!(format_float(0.0, ""), "0.00");
    }
}
