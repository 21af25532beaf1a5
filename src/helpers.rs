//! Small stateless helpers shared by the engine and exposed to Lua.
//!
//! - [`hex_to_rgb`] – `#rrggbb` / `#rgb` to an [`Rgb`] triple
//! - [`enum_to_string`] – reverse lookup of a value in a name table
//! - [`to_upper_first_char`] – capitalize the first character
//! - [`is_url`] – detect `http://` / `https://` sources
//! - [`serialize`] – build a query string from key/value pairs

use serde::Serialize;
use thiserror::Error;

/// Name returned by [`enum_to_string`] when no entry matches.
pub const UNKNOWN_ENUM: &str = "unknown";

/// Error type for hex color conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Digits after the optional `#` are neither 3 nor 6 long.
    #[error("invalid color length {0}, expected 3 or 6")]
    InvalidLength(usize),
    /// Contains a character that is not a hex digit.
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Convert a hex string into its RGB components.
///
/// The leading `#` is optional and digits are case-insensitive. The 3-digit
/// short form doubles each digit, so `#abc` reads as `#aabbcc` as in CSS. It
/// is not read by appending the digits to themselves (`#abcabc`).
///
/// ```
/// use meta2d::helpers::{hex_to_rgb, Rgb};
///
/// assert_eq!(hex_to_rgb("#ff8000").unwrap(), Rgb { r: 255, g: 128, b: 0 });
/// assert_eq!(hex_to_rgb("fff").unwrap(), Rgb { r: 255, g: 255, b: 255 });
/// ```
pub fn hex_to_rgb(hex: &str) -> Result<Rgb, ColorError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(bad));
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        n => return Err(ColorError::InvalidLength(n)),
    };

    // All characters are ASCII hex digits at this point.
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).unwrap_or_default();
    Ok(Rgb {
        r: channel(0),
        g: channel(2),
        b: channel(4),
    })
}

/// Look up the name of `value` in a table of `(name, value)` entries.
///
/// Returns [`UNKNOWN_ENUM`] when the table is missing or has no matching
/// entry. When several names share a value, the first one wins.
pub fn enum_to_string<'a, V, I>(entries: Option<I>, value: &V) -> &'a str
where
    V: PartialEq,
    I: IntoIterator<Item = (&'a str, V)>,
{
    entries
        .and_then(|entries| {
            entries
                .into_iter()
                .find(|(_, candidate)| candidate == value)
                .map(|(name, _)| name)
        })
        .unwrap_or(UNKNOWN_ENUM)
}

/// Upper-case the first character of `s`, leaving the rest untouched.
pub fn to_upper_first_char(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `true` when `s` contains an `http://` or `https://` scheme.
pub fn is_url(s: &str) -> bool {
    s.contains("http://") || s.contains("https://")
}

/// Join `key=value` pairs with `&`, percent-encoding keys and values.
pub fn serialize<K, V, I>(pairs: I) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", encode_component(k.as_ref()), encode_component(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode everything but the URI-component unreserved set.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
