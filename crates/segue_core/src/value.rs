//! Animatable style values
//!
//! Computed styles arrive as text. [`Value`] classifies that text into the
//! shapes the frame generator knows how to interpolate:
//!
//! - plain numbers (`0.5`)
//! - dimensions (`12px`, `50%`, `45deg`)
//! - colors (`#fff`, `rgb(0, 0, 0)`, `rgba(0, 0, 0, 0.5)`, named colors)
//! - multi-part values such as transforms or shadows
//!   (`translateX(10px) scale(1.5)`), kept as a template of literal text
//!   around numeric and color parts
//! - anything else as an opaque keyword
//!
//! Every shape serializes back to CSS text through `Display`.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, char, digit0, digit1},
    combinator::{all_consuming, opt, recognize},
    sequence::pair,
    Finish, IResult,
};
use smallvec::SmallVec;

use crate::color::{parse_color, Color};
use crate::error::SegueError;

/// A parsed style value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Unitless number
    Number(f64),
    /// Number with a unit, e.g. `px`, `%`, `deg`
    Dimension { value: f64, unit: String },
    Color(Color),
    /// Multi-part value with numeric/color parts embedded in literal text
    Complex(ComplexValue),
    /// Anything that cannot be interpolated
    Keyword(String),
}

impl Value {
    /// Shorthand for a pixel dimension
    pub fn px(value: f64) -> Self {
        Value::Dimension {
            value,
            unit: "px".to_string(),
        }
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Value::Keyword(text.into())
    }

    /// Numeric magnitude of a number or dimension
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Dimension { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Unit of a dimension
    pub fn unit(&self) -> Option<&str> {
        match self {
            Value::Dimension { unit, .. } => Some(unit),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(color) => Some(*color),
            _ => None,
        }
    }

    /// Parse `text`, falling back to a keyword for anything unrecognized
    pub fn parse_lossy(text: &str) -> Self {
        text.parse()
            .unwrap_or_else(|_| Value::Keyword(text.trim().to_string()))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<Color> for Value {
    fn from(color: Color) -> Self {
        Value::Color(color)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Dimension { value, unit } => write!(f, "{value}{unit}"),
            Value::Color(color) => write!(f, "{color}"),
            Value::Complex(complex) => write!(f, "{complex}"),
            Value::Keyword(keyword) => f.write_str(keyword),
        }
    }
}

impl FromStr for Value {
    type Err = SegueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(SegueError::Parse("empty style value".to_string()));
        }

        if let Ok(color) = input.parse::<Color>() {
            return Ok(Value::Color(color));
        }

        if let Ok((_, (value, unit))) = all_consuming(dimension::<nom::error::Error<&str>>)(input).finish()
        {
            return Ok(match unit {
                Some(unit) => Value::Dimension {
                    value,
                    unit: unit.to_string(),
                },
                None => Value::Number(value),
            });
        }

        let complex = ComplexValue::scan(input);
        if complex.has_animatable_parts() {
            return Ok(Value::Complex(complex));
        }

        Ok(Value::Keyword(input.to_string()))
    }
}

// ============================================================================
// Complex values
// ============================================================================

/// One piece of a [`ComplexValue`]
#[derive(Clone, Debug, PartialEq)]
pub enum ComplexPart {
    Literal(String),
    Number(f64),
    Color(Color),
}

/// A template of literal text interleaved with numeric and color parts
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComplexValue {
    parts: SmallVec<[ComplexPart; 8]>,
}

impl ComplexValue {
    pub fn new(parts: impl IntoIterator<Item = ComplexPart>) -> Self {
        Self {
            parts: parts.into_iter().collect(),
        }
    }

    pub fn parts(&self) -> &[ComplexPart] {
        &self.parts
    }

    /// Numeric and color parts, in order
    pub fn animatable_parts(&self) -> impl Iterator<Item = &ComplexPart> {
        self.parts
            .iter()
            .filter(|part| !matches!(part, ComplexPart::Literal(_)))
    }

    pub fn has_animatable_parts(&self) -> bool {
        self.animatable_parts().next().is_some()
    }

    /// Whether `other` has the same literal skeleton and part kinds
    pub fn is_compatible(&self, other: &ComplexValue) -> bool {
        self.parts.len() == other.parts.len()
            && self
                .parts
                .iter()
                .zip(other.parts.iter())
                .all(|(a, b)| match (a, b) {
                    (ComplexPart::Literal(a), ComplexPart::Literal(b)) => a == b,
                    (ComplexPart::Number(_), ComplexPart::Number(_)) => true,
                    (ComplexPart::Color(_), ComplexPart::Color(_)) => true,
                    _ => false,
                })
    }

    /// Refill this template with new animatable parts
    ///
    /// Returns `None` when the number or kinds of parts do not match.
    pub fn with_parts(&self, values: &[ComplexPart]) -> Option<ComplexValue> {
        let mut values = values.iter();
        let mut parts = SmallVec::with_capacity(self.parts.len());
        for part in &self.parts {
            let next = match part {
                ComplexPart::Literal(text) => ComplexPart::Literal(text.clone()),
                ComplexPart::Number(_) => match values.next()? {
                    n @ ComplexPart::Number(_) => n.clone(),
                    _ => return None,
                },
                ComplexPart::Color(_) => match values.next()? {
                    c @ ComplexPart::Color(_) => c.clone(),
                    _ => return None,
                },
            };
            parts.push(next);
        }
        if values.next().is_some() {
            return None;
        }
        Some(ComplexValue { parts })
    }

    /// Split text into literal, numeric and color parts
    fn scan(input: &str) -> ComplexValue {
        let mut parts: SmallVec<[ComplexPart; 8]> = SmallVec::new();
        let mut literal = String::new();
        let mut rest = input;
        let mut previous: Option<char> = None;

        while let Some(c) = rest.chars().next() {
            if let Ok((next, color)) = parse_color::<nom::error::Error<&str>>(rest) {
                flush_literal(&mut parts, &mut literal);
                parts.push(ComplexPart::Color(color));
                rest = next;
                previous = None;
                continue;
            }

            // Digits glued to identifiers (scale3d, h1) are literal text
            let at_boundary = previous.map_or(true, |p| !(p.is_alphanumeric() || p == '.'));
            if at_boundary {
                if let Ok((next, number)) = number::<nom::error::Error<&str>>(rest) {
                    flush_literal(&mut parts, &mut literal);
                    parts.push(ComplexPart::Number(number));
                    rest = next;
                    previous = Some('0');
                    continue;
                }
            }

            literal.push(c);
            previous = Some(c);
            rest = &rest[c.len_utf8()..];
        }
        flush_literal(&mut parts, &mut literal);

        ComplexValue { parts }
    }
}

fn flush_literal(parts: &mut SmallVec<[ComplexPart; 8]>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(ComplexPart::Literal(std::mem::take(literal)));
    }
}

impl fmt::Display for ComplexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                ComplexPart::Literal(text) => f.write_str(text)?,
                ComplexPart::Number(n) => write!(f, "{n}")?,
                ComplexPart::Color(color) => write!(f, "{color}")?,
            }
        }
        Ok(())
    }
}

// ============================================================================
// Parsers
// ============================================================================

fn number<'a, E: nom::error::ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, f64, E> {
    let (rest, text) = recognize(pair(
        opt(char('-')),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    ))(input)?;

    match text.parse::<f64>() {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(nom::Err::Error(E::from_error_kind(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

fn dimension<'a, E: nom::error::ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, (f64, Option<&'a str>), E> {
    let (input, value) = number(input)?;
    let (input, unit) = opt(alt((tag("%"), alpha1)))(input)?;
    Ok((input, (value, unit)))
}
