//! RGBA colors and their CSS notations

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{alpha1, char, multispace0},
    combinator::{all_consuming, map_opt, opt},
    error::ParseError as NomParseError,
    number::complete::double,
    sequence::preceded,
    Finish, IResult,
};
use serde::{Deserialize, Serialize};

use crate::error::SegueError;

/// RGBA color with channels in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 128.0 / 255.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from 8-bit channels
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f64 / 255.0,
            g as f64 / 255.0,
            b as f64 / 255.0,
            a as f64 / 255.0,
        )
    }

    /// Channels in `[r, g, b, a]` order
    pub fn to_array(&self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_array(channels: [f64; 4]) -> Self {
        Self::rgba(channels[0], channels[1], channels[2], channels[3])
    }

    /// Linear interpolation between two colors
    pub fn lerp(a: &Color, b: &Color, t: f64) -> Color {
        Color {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
            a: a.a + (b.a - a.a) * t,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        write!(
            f,
            "rgba({}, {}, {}, {})",
            channel(self.r),
            channel(self.g),
            channel(self.b),
            self.a.clamp(0.0, 1.0)
        )
    }
}

impl FromStr for Color {
    type Err = SegueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        all_consuming(alt((
            parse_color::<nom::error::Error<&str>>,
            map_opt(alpha1, parse_named_color),
        )))(input)
        .finish()
        .map(|(_, color)| color)
        .map_err(|_| SegueError::Parse(format!("invalid color: {input}")))
    }
}

// ============================================================================
// Parsers
// ============================================================================

fn ws<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
    let (input, _) = multispace0(input)?;
    Ok((input, ()))
}

/// Parse a functional or hex color (`#rgb`, `#rrggbb`, `rgb()`, `rgba()`)
///
/// Named colors are deliberately not recognized here: inside multi-part
/// values an identifier is literal text.
pub fn parse_color<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Color, E> {
    alt((parse_hex_color, parse_rgb_function))(input)
}

fn parse_hex_color<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Color, E> {
    let (rest, _) = char('#')(input)?;
    let (rest, hex) = take_while1(|c: char| c.is_ascii_hexdigit())(rest)?;

    let digit = |s: &str| u8::from_str_radix(s, 16).ok();
    let expanded = |s: &str| digit(&s.repeat(2));

    let channels = match hex.len() {
        3 => (
            expanded(&hex[0..1]),
            expanded(&hex[1..2]),
            expanded(&hex[2..3]),
            Some(255),
        ),
        4 => (
            expanded(&hex[0..1]),
            expanded(&hex[1..2]),
            expanded(&hex[2..3]),
            expanded(&hex[3..4]),
        ),
        6 => (
            digit(&hex[0..2]),
            digit(&hex[2..4]),
            digit(&hex[4..6]),
            Some(255),
        ),
        8 => (
            digit(&hex[0..2]),
            digit(&hex[2..4]),
            digit(&hex[4..6]),
            digit(&hex[6..8]),
        ),
        _ => (None, None, None, None),
    };

    match channels {
        (Some(r), Some(g), Some(b), Some(a)) => Ok((rest, Color::from_rgba8(r, g, b, a))),
        _ => Err(nom::Err::Error(E::from_error_kind(
            input,
            nom::error::ErrorKind::HexDigit,
        ))),
    }
}

/// `rgb(r, g, b)` / `rgba(r, g, b, a)` with 0-255 color channels
fn parse_rgb_function<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Color, E> {
    let (input, _) = alt((tag_no_case("rgba"), tag_no_case("rgb")))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('(')(input)?;
    let (input, _) = ws(input)?;
    let (input, r) = double(input)?;
    let (input, _) = separator(input)?;
    let (input, g) = double(input)?;
    let (input, _) = separator(input)?;
    let (input, b) = double(input)?;
    let (input, a) = opt(preceded(separator, double))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(')')(input)?;

    Ok((
        input,
        Color::rgba(r / 255.0, g / 255.0, b / 255.0, a.unwrap_or(1.0)),
    ))
}

fn separator<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
    let (input, _) = ws(input)?;
    let (input, _) = char(',')(input)?;
    ws(input)
}

/// Parse named colors
pub fn parse_named_color(name: &str) -> Option<Color> {
    let color = match name.to_ascii_lowercase().as_str() {
        "transparent" => Color::TRANSPARENT,
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::RED,
        "green" => Color::GREEN,
        "blue" => Color::BLUE,
        "lime" => Color::rgb(0.0, 1.0, 0.0),
        "yellow" => Color::rgb(1.0, 1.0, 0.0),
        "cyan" | "aqua" => Color::rgb(0.0, 1.0, 1.0),
        "magenta" | "fuchsia" => Color::rgb(1.0, 0.0, 1.0),
        "gray" | "grey" => Color::from_rgba8(128, 128, 128, 255),
        "silver" => Color::from_rgba8(192, 192, 192, 255),
        "orange" => Color::from_rgba8(255, 165, 0, 255),
        "purple" => Color::from_rgba8(128, 0, 128, 255),
        "navy" => Color::from_rgba8(0, 0, 128, 255),
        "teal" => Color::from_rgba8(0, 128, 128, 255),
        "maroon" => Color::from_rgba8(128, 0, 0, 255),
        "olive" => Color::from_rgba8(128, 128, 0, 255),
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!("#f00".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("#0000ff".parse::<Color>().unwrap(), Color::BLUE);
        let translucent: Color = "#ffffff80".parse().unwrap();
        assert!((translucent.a - 128.0 / 255.0).abs() < 1e-9);
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn test_parse_rgb_functions() {
        assert_eq!("rgb(255, 0, 0)".parse::<Color>().unwrap(), Color::RED);
        let c: Color = "rgba(0, 0, 255, 0.5)".parse().unwrap();
        assert_eq!(c, Color::rgba(0.0, 0.0, 1.0, 0.5));
        assert!("rgb(1, 2)".parse::<Color>().is_err());
    }

    #[test]
    fn test_parse_named() {
        assert_eq!("Transparent".parse::<Color>().unwrap(), Color::TRANSPARENT);
        assert!("notacolor".parse::<Color>().is_err());
    }

    #[test]
    fn test_display_is_rgba() {
        assert_eq!(Color::RED.to_string(), "rgba(255, 0, 0, 1)");
        assert_eq!(
            Color::rgba(0.0, 0.0, 1.0, 0.25).to_string(),
            "rgba(0, 0, 255, 0.25)"
        );
    }

    #[test]
    fn test_lerp_midpoint() {
        let mid = Color::lerp(&Color::BLACK, &Color::WHITE, 0.5);
        assert_eq!(mid.to_string(), "rgba(128, 128, 128, 1)");
    }
}
