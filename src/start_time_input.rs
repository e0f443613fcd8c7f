//! Start-offset text field model.
//!
//! The field keeps whatever the user typed so far (which may be an incomplete
//! number such as `-` or `12.`) next to the last value that actually parsed.

/// Display text plus the number it parses to, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct StartTimeInput {
    text: String,
    value: Option<f64>,
}

/// Returns `true` when `text` is an optional leading minus, digits, at most one
/// decimal point and more digits. Empty text and lone `-`/`.` are accepted so
/// that partially typed numbers survive.
pub fn is_start_time_text(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let mut seen_point = false;
    for ch in unsigned.chars() {
        match ch {
            '0'..='9' => {}
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    true
}

/// Parses gated start-time text into a finite number of seconds.
pub fn parse_start_time_text(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Reads the longest numeric prefix of `text`, ignoring leading whitespace
/// and a leading `+`, so `"1.5s"` reads as 1.5. Returns `None` when no prefix
/// is a finite number.
pub fn parse_leading_seconds(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let text = match text.strip_prefix('+') {
        Some(rest) if rest.starts_with('-') => return None,
        Some(rest) => rest,
        None => text,
    };
    let end = text
        .char_indices()
        .map(|(start, ch)| start + ch.len_utf8())
        .take_while(|&end| is_start_time_text(&text[..end]))
        .last()?;
    parse_start_time_text(&text[..end])
}

/// Formats seconds the way they are shown in the start-time field.
/// Integral values have no fractional part and negative zero prints as `0`.
pub fn format_seconds(seconds: f64) -> String {
    if seconds == 0.0 {
        return "0".to_string();
    }
    format!("{}", seconds)
}

/// Rounds seconds to `decimals` fractional digits.
pub fn round_seconds(seconds: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (seconds * factor).round() / factor
}

impl StartTimeInput {
    /// Validates freshly typed text. Returns `None` when the text fails the
    /// numeric gate; otherwise the text is kept verbatim.
    pub fn accept(text: &str) -> Option<Self> {
        if !is_start_time_text(text) {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            value: parse_start_time_text(text),
        })
    }

    /// Builds the field for a known offset.
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            text: format_seconds(seconds),
            value: Some(seconds),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed value, `None` while the text is only a partial number.
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl Default for StartTimeInput {
    fn default() -> Self {
        Self::from_seconds(0.0)
    }
}
