//! Highlight styles and the hex color parser feeding them.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Opaque yellow, used whenever a color string cannot be parsed.
    pub const FALLBACK: Rgba = Rgba::opaque(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, u8::MAX)
    }

    /// Take the low 24 bits of `value` as `0xRRGGBB`.
    fn from_packed_rgb(value: i32) -> Self {
        let [_, r, g, b] = value.to_be_bytes();
        Self::opaque(r, g, b)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// Visual attributes applied to a flashed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightStyle {
    pub background: Rgba,
    /// `None` leaves the text color untouched.
    pub foreground: Option<Rgba>,
    pub bold: bool,
}

impl HighlightStyle {
    /// Build a style from user-facing color strings. An empty foreground means "no change".
    pub fn from_hex(background: &str, foreground: &str, bold: bool) -> Self {
        let foreground = foreground.trim();
        Self {
            background: parse_color(background),
            foreground: (!foreground.is_empty()).then(|| parse_color(foreground)),
            bold,
        }
    }
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self::from_hex("#E66159", "", true)
    }
}

/// Parse a user supplied color, falling back to [`Rgba::FALLBACK`] on any failure.
///
/// `#RRGGBBAA` is read byte by byte. Everything else goes through integer decoding with an
/// optional sign and a `0x`/`0X`/`#` (hex) or leading `0` (octal) prefix, keeping the low 24
/// bits as an opaque RGB value. `#F00` therefore decodes to `0x000F00`.
pub fn parse_color<'a>(input: impl Into<Option<&'a str>>) -> Rgba {
    let Some(input) = input.into() else {
        return Rgba::FALLBACK;
    };

    let parsed = if input.len() == 9 && input.starts_with('#') {
        parse_rgba_hex(&input[1..])
    } else {
        decode_integer(input).map(Rgba::from_packed_rgb)
    };

    parsed.unwrap_or_else(|| {
        tracing::debug!(input, "unparsable color, using fallback");
        Rgba::FALLBACK
    })
}

fn parse_rgba_hex(digits: &str) -> Option<Rgba> {
    if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |at: usize| u8::from_str_radix(digits.get(at..at + 2)?, 16).ok();
    Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?))
}

fn decode_integer(input: &str) -> Option<i32> {
    let (negative, rest) = match input.as_bytes().first()? {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    let (radix, digits) = if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))
    {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    // from_str_radix would accept a second sign here.
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}
