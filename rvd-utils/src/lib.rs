//! Shared utility functions for RVD crates.

/// Date utility functions
pub mod dates {
    use chrono::{NaiveDate, NaiveDateTime};

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format.
    ///
    /// A trailing time part (`2024-01-08T00:00:00`) is ignored, since the
    /// wastewater feeds mix both forms on their x axes.
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        let s = s.trim();
        let day = s.get(..10).unwrap_or(s);
        Ok(NaiveDate::parse_from_str(day, "%Y-%m-%d")?)
    }

    /// Format a timestamp the way the metadata report stores it,
    /// e.g. "2025-02-24T07:15:03".
    pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

}

/// Hex colour helpers for deriving sub-category shades from a base colour.
pub mod color {
    use crate::error::ColorError;

    /// Blend applied to the intensive care variant of a diagnosis colour.
    pub const WARD_LIGHTEN: f64 = 0.45;
    /// Blend applied to the female variant of a diagnosis colour.
    pub const GENDER_LIGHTEN: f64 = 0.35;

    /// Split `#rrggbb` (the `#` is optional) into its channels.
    pub fn parse_hex(hex: &str) -> Result<(u8, u8, u8), ColorError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(hex.to_string()));
        }
        let num = u32::from_str_radix(digits, 16)
            .map_err(|_| ColorError::InvalidHex(hex.to_string()))?;
        Ok(((num >> 16) as u8, ((num >> 8) & 0xff) as u8, (num & 0xff) as u8))
    }

    fn to_hex(r: u8, g: u8, b: u8) -> String {
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    fn lighten_channel(channel: u8, amount: f64) -> u8 {
        let c = f64::from(channel);
        (c + (256.0 - c) * amount).floor().min(255.0) as u8
    }

    /// Move each channel towards white by `amount` (clamped to `[0, 1]`).
    ///
    /// Channels are truncated after blending and capped at 255, so
    /// `#000000` at 0.5 gives `#808080` and any colour at 1.0 gives `#ffffff`.
    pub fn lighten_color(hex: &str, amount: f64) -> Result<String, ColorError> {
        let (r, g, b) = parse_hex(hex)?;
        let amount = amount.clamp(0.0, 1.0);
        Ok(to_hex(
            lighten_channel(r, amount),
            lighten_channel(g, amount),
            lighten_channel(b, amount),
        ))
    }

    /// CSS `rgba(r, g, b, alpha)` for translucent fills.
    pub fn hex_to_rgba(hex: &str, alpha: f64) -> Result<String, ColorError> {
        let (r, g, b) = parse_hex(hex)?;
        Ok(format!("rgba({r}, {g}, {b}, {alpha})"))
    }

    /// Intensive care admissions are drawn in a lighter shade of the
    /// diagnosis colour; every other ward keeps the base colour.
    pub fn ward_color(base: &str, ward: &str) -> Result<String, ColorError> {
        if ward == "Intensivstation" {
            lighten_color(base, WARD_LIGHTEN)
        } else {
            lighten_color(base, 0.0)
        }
    }

    /// Female bars are lighter than male ones.
    pub fn gender_color(base: &str, gender: &str) -> Result<String, ColorError> {
        if gender.eq_ignore_ascii_case("W") {
            lighten_color(base, GENDER_LIGHTEN)
        } else {
            lighten_color(base, 0.0)
        }
    }

}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ColorError {
        InvalidHex(String),
    }

    impl fmt::Display for ColorError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ColorError::InvalidHex(hex) => write!(f, "Color error: invalid hex colour '{}'", hex),
            }
        }
    }

    impl std::error::Error for ColorError {}
}
