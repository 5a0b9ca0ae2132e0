//! Keyframe construction
//!
//! The orchestration matrix emits one [`Keyframe`] per column by folding the
//! column's frames into the previous keyframe. Playback wants transform
//! functions as a single `transform` property, which [`compose_transform`]
//! produces.

use segue_core::{ComplexPart, ComplexValue, Keyframe, Value};

use crate::frame::PropertyFrame;

/// Properties folded into `transform`, in application order
pub const TRANSFORM_PROPERTIES: [&str; 7] = [
    "translateX",
    "translateY",
    "translateZ",
    "scale",
    "scaleX",
    "scaleY",
    "rotate",
];

/// Copy `previous` and overwrite each frame's property
pub fn construct_keyframe(previous: &Keyframe, frames: &[PropertyFrame]) -> Keyframe {
    let mut keyframe = previous.clone();
    for frame in frames {
        keyframe.insert(frame.property.clone(), frame.value.clone());
    }
    keyframe
}

/// Fold transform-function properties into one `transform` entry
///
/// Functions are applied in [`TRANSFORM_PROPERTIES`] order after any
/// `transform` already present. Unitless translations get `px` and unitless
/// rotations get `deg`.
pub fn compose_transform(keyframe: &Keyframe) -> Keyframe {
    if !TRANSFORM_PROPERTIES
        .iter()
        .any(|property| keyframe.contains_key(*property))
    {
        return keyframe.clone();
    }

    let mut parts: Vec<ComplexPart> = Vec::new();
    match keyframe.get("transform") {
        Some(Value::Complex(existing)) => parts.extend(existing.parts().iter().cloned()),
        Some(Value::Keyword(keyword)) if keyword == "none" => {}
        Some(other) => push_literal(&mut parts, &other.to_string()),
        None => {}
    }

    for property in TRANSFORM_PROPERTIES {
        let Some(value) = keyframe.get(property) else {
            continue;
        };
        if !parts.is_empty() {
            push_literal(&mut parts, " ");
        }
        push_literal(&mut parts, property);
        push_literal(&mut parts, "(");
        match value {
            Value::Number(n) => {
                parts.push(ComplexPart::Number(*n));
                push_literal(&mut parts, default_unit(property));
            }
            Value::Dimension { value, unit } => {
                parts.push(ComplexPart::Number(*value));
                push_literal(&mut parts, unit);
            }
            other => push_literal(&mut parts, &other.to_string()),
        }
        push_literal(&mut parts, ")");
    }

    let mut composed = Keyframe::with_capacity(keyframe.len());
    for (property, value) in keyframe {
        if property == "transform" || TRANSFORM_PROPERTIES.contains(&property.as_str()) {
            continue;
        }
        composed.insert(property.clone(), value.clone());
    }
    composed.insert(
        "transform".to_string(),
        Value::Complex(ComplexValue::new(parts)),
    );
    composed
}

fn default_unit(property: &str) -> &'static str {
    match property {
        "translateX" | "translateY" | "translateZ" => "px",
        "rotate" => "deg",
        _ => "",
    }
}

fn push_literal(parts: &mut Vec<ComplexPart>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(ComplexPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(ComplexPart::Literal(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyframe(entries: &[(&str, Value)]) -> Keyframe {
        entries
            .iter()
            .map(|(property, value)| (property.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_construct_overwrites_previous() {
        let previous = keyframe(&[("opacity", 0.0.into()), ("zIndex", 4.0.into())]);
        let next = construct_keyframe(
            &previous,
            &[PropertyFrame::new("opacity", Value::Number(0.5))],
        );
        assert_eq!(next, keyframe(&[("opacity", 0.5.into()), ("zIndex", 4.0.into())]));
        assert_eq!(construct_keyframe(&Keyframe::new(), &[]), Keyframe::new());
    }

    #[test]
    fn test_compose_transform() {
        let composed = compose_transform(&keyframe(&[
            ("opacity", 1.0.into()),
            ("scale", 1.5.into()),
            ("translateX", Value::px(-20.0)),
            ("translateY", 4.0.into()),
        ]));

        assert_eq!(composed.len(), 2);
        assert_eq!(composed["opacity"], Value::Number(1.0));
        assert_eq!(
            composed["transform"].to_string(),
            "translateX(-20px) translateY(4px) scale(1.5)"
        );
    }

    #[test]
    fn test_compose_appends_to_existing_transform() {
        let composed = compose_transform(&keyframe(&[
            ("transform", Value::parse_lossy("rotate(45deg)")),
            ("translateX", Value::px(5.0)),
        ]));
        assert_eq!(
            composed["transform"].to_string(),
            "rotate(45deg) translateX(5px)"
        );
    }

    #[test]
    fn test_compose_without_transform_parts_is_identity() {
        let original = keyframe(&[("width", Value::px(10.0))]);
        assert_eq!(compose_transform(&original), original);
    }
}
