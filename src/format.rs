//! Chart-label formatting helpers
//!
//! Human-friendly axis labels for dollar amounts and large counts. Pure
//! string formatting; no chart rendering happens here.

/// Thousand-step suffixes
const SUFFIXES: [&str; 6] = ["", "K", "M", "B", "T", "P"];

fn scale(num: f64) -> (f64, &'static str) {
    let mut magnitude = 0;
    let mut value = num;
    while value.abs() >= 1000.0 && magnitude < SUFFIXES.len() - 1 {
        magnitude += 1;
        value /= 1000.0;
    }
    (value, SUFFIXES[magnitude])
}

/// Format a number with a thousand-step suffix: `1_500_000` with one
/// decimal becomes `1.5M`.
pub fn human_format(num: f64, decimals: usize) -> String {
    let (value, suffix) = scale(num);
    format!("{:.*}{}", decimals, value, suffix)
}

/// Same as [`human_format`] with a leading dollar sign.
pub fn human_format_dollar(num: f64, decimals: usize) -> String {
    format!("${}", human_format(num, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_numbers_unscaled() {
        assert_eq!(human_format(999.0, 0), "999");
        assert_eq!(human_format(0.0, 0), "0");
    }

    #[test]
    fn test_thousand_steps() {
        assert_eq!(human_format(1_234.0, 0), "1K");
        assert_eq!(human_format(1_500_000.0, 1), "1.5M");
        assert_eq!(human_format(1_240_000_000.0, 1), "1.2B");
        assert_eq!(human_format(3.0e15, 0), "3P");
    }

    #[test]
    fn test_negative_values_keep_sign() {
        assert_eq!(human_format(-2_500_000_000.0, 1), "-2.5B");
    }

    #[test]
    fn test_dollar_prefix() {
        assert_eq!(human_format_dollar(1_240_000_000.0, 1), "$1.2B");
        assert_eq!(human_format_dollar(42.0, 0), "$42");
    }
}
