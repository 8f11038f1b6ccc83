//! Subscription payload decoder
//!
//! A subscription payload is a base64 blob bundling one proxy link per line.
//! Providers are sloppy about padding and alphabet, so decoding is lenient:
//! missing `=` padding is restored and both the URL-safe and standard
//! alphabets are accepted.

use crate::error::{Error, Result};
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine};
use once_cell::sync::Lazy;

static URL_SAFE_LENIENT: Lazy<GeneralPurpose> = Lazy::new(|| {
    GeneralPurpose::new(&alphabet::URL_SAFE, lenient_config())
});

static STANDARD_LENIENT: Lazy<GeneralPurpose> = Lazy::new(|| {
    GeneralPurpose::new(&alphabet::STANDARD, lenient_config())
});

fn lenient_config() -> GeneralPurposeConfig {
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
}

/// Decode a raw subscription payload into its link lines
///
/// Pure transformation: pads the input to a multiple of 4, base64-decodes it
/// (URL-safe alphabet first, standard as fallback), interprets the bytes as
/// UTF-8, and splits on line boundaries. Blank lines are dropped. Output is
/// identical whether or not the input carried trailing `=` padding.
pub fn decode_payload(raw: &str) -> Result<Vec<String>> {
    let text = decode_base64_text(raw)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Decode a lenient base64 string into UTF-8 text
///
/// Also used by the parser for inline vmess payloads, which suffer the same
/// padding and alphabet sloppiness as whole subscriptions.
pub fn decode_base64_text(raw: &str) -> Result<String> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let padded = pad_base64(&compact);

    let bytes = URL_SAFE_LENIENT
        .decode(&padded)
        .or_else(|_| STANDARD_LENIENT.decode(&padded))
        .map_err(|e| Error::Decode(format!("invalid base64: {}", e)))?;

    String::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
}

/// Restore trailing `=` padding to a multiple of 4 characters
fn pad_base64(s: &str) -> String {
    let remainder = s.len() % 4;
    if remainder == 0 {
        s.to_string()
    } else {
        format!("{}{}", s, "=".repeat(4 - remainder))
    }
}
