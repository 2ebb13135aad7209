use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NumberFormat – explicit separator convention for decimal parsing
// ---------------------------------------------------------------------------

/// Separator convention used when parsing salary strings.
///
/// The convention is always passed in explicitly; nothing here looks at the
/// process locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// `1.234,56` – `.` groups thousands, `,` marks decimals.
    #[default]
    Brazilian,
    /// `1234.56` – `.` marks decimals, no grouping.
    Plain,
}

impl NumberFormat {
    pub fn decimal_separator(self) -> char {
        match self {
            NumberFormat::Brazilian => ',',
            NumberFormat::Plain => '.',
        }
    }

    pub fn thousands_separator(self) -> Option<char> {
        match self {
            NumberFormat::Brazilian => Some('.'),
            NumberFormat::Plain => None,
        }
    }

    /// Parse from a config / env token (`br`, `brazilian`, `plain`, `en`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "br" | "brazilian" | "pt-br" | "pt_br" => Some(NumberFormat::Brazilian),
            "plain" | "en" | "c" => Some(NumberFormat::Plain),
            _ => None,
        }
    }

    /// Parse a non-negative decimal such as `"R$ 1.234,56"`.
    ///
    /// Empty, malformed, non-finite and negative inputs all map to `None`:
    /// the caller treats them as a missing value.
    pub fn parse_decimal(self, raw: &str) -> Option<f64> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();
        if trimmed.is_empty() {
            return None;
        }

        let decimal = self.decimal_separator();
        let thousands = self.thousands_separator();
        let mut normalised = String::with_capacity(trimmed.len());
        for ch in trimmed.chars() {
            if Some(ch) == thousands {
                continue;
            }
            if ch == decimal {
                normalised.push('.');
            } else {
                normalised.push(ch);
            }
        }

        let value = normalised.parse::<f64>().ok()?;
        if value.is_finite() && value >= 0.0 {
            Some(value)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_brazilian_currency_strings() {
        let fmt = NumberFormat::Brazilian;
        assert_eq!(fmt.parse_decimal("1.234,56"), Some(1234.56));
        assert_eq!(fmt.parse_decimal("R$ 2.500,00"), Some(2500.0));
        assert_eq!(fmt.parse_decimal(" 980 "), Some(980.0));
    }

    #[test]
    fn parses_plain_decimals() {
        let fmt = NumberFormat::Plain;
        assert_eq!(fmt.parse_decimal("1234.5"), Some(1234.5));
        assert_eq!(fmt.parse_decimal("1,234.5"), None);
    }

    #[test]
    fn malformed_or_negative_values_are_missing() {
        let fmt = NumberFormat::Brazilian;
        assert_eq!(fmt.parse_decimal(""), None);
        assert_eq!(fmt.parse_decimal("abc"), None);
        assert_eq!(fmt.parse_decimal("-100,00"), None);
        assert_eq!(fmt.parse_decimal("NaN"), None);
    }

    #[test]
    fn tokens_select_a_convention() {
        assert_eq!(NumberFormat::from_token("BR"), Some(NumberFormat::Brazilian));
        assert_eq!(NumberFormat::from_token("plain"), Some(NumberFormat::Plain));
        assert_eq!(NumberFormat::from_token("fr"), None);
    }
}
