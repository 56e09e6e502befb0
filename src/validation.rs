//! Slot value coercion
//!
//! Raw captured strings are converted to typed values according to the slot's
//! declared kind. A value that fails its rules is treated as absent; required
//! slots then fall back to their declared default.

use crate::error::ValidationError;
use crate::pattern::SlotCaptures;
use crate::types::{ExtractedParameters, SlotKind, SlotSpec, SlotValue, Transform};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use tracing::debug;

const TRUE_TOKENS: &[&str] = &["true", "verdadero", "sí", "si", "yes", "1", "on"];
const FALSE_TOKENS: &[&str] = &["false", "falso", "no", "0", "off"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Coerce one raw value to the slot's declared type
pub fn coerce(raw: &str, spec: &SlotSpec) -> Result<SlotValue, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty);
    }

    match &spec.kind {
        SlotKind::String {
            min_length,
            max_length,
            transform,
        } => coerce_string(value, *min_length, *max_length, *transform),
        SlotKind::Number { min, max } => coerce_number(value, *min, *max),
        SlotKind::Boolean => coerce_boolean(value),
        SlotKind::Date { min_date, max_date } => {
            coerce_date(value, min_date.as_deref(), max_date.as_deref())
        }
    }
}

/// Coerce a value, mapping any validation failure to `None`
pub fn validate(raw: &str, spec: &SlotSpec) -> Option<SlotValue> {
    match coerce(raw, spec) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(value = raw, error = %e, "slot value rejected");
            None
        }
    }
}

/// Build the typed parameter map for an intent.
///
/// Each declared slot is coerced if captured, defaulted if required and
/// absent (or rejected), and omitted otherwise. Captured slots with no
/// declaration pass through as trimmed text.
pub fn resolve_parameters(
    captures: &SlotCaptures,
    schema: &BTreeMap<String, SlotSpec>,
) -> ExtractedParameters {
    let mut params = ExtractedParameters::new();

    for (slot, spec) in schema {
        let value = captures.get(slot).and_then(|raw| validate(raw, spec));
        match value {
            Some(v) => {
                params.insert(slot.clone(), v);
            }
            None if spec.required => {
                if let Some(default) = &spec.default {
                    params.insert(slot.clone(), default.clone());
                }
            }
            None => {}
        }
    }

    for (slot, raw) in captures {
        if !schema.contains_key(slot) {
            params.insert(slot.clone(), SlotValue::Text(raw.trim().to_string()));
        }
    }

    params
}

fn coerce_string(
    value: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
    transform: Option<Transform>,
) -> Result<SlotValue, ValidationError> {
    let mut text = match transform {
        Some(Transform::Lowercase) => value.to_lowercase(),
        Some(Transform::Uppercase) => value.to_uppercase(),
        Some(Transform::Capitalize) => capitalize(value),
        None => value.to_string(),
    };

    let length = text.chars().count();
    if let Some(min_length) = min_length {
        if length < min_length {
            return Err(ValidationError::TooShort {
                value: text,
                min_length,
            });
        }
    }
    if let Some(max_length) = max_length {
        if length > max_length {
            text = text.chars().take(max_length).collect();
        }
    }

    Ok(SlotValue::Text(text))
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}

fn coerce_number(
    value: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<SlotValue, ValidationError> {
    let number: f64 = value
        .parse()
        .ok()
        .filter(|n: &f64| n.is_finite())
        .ok_or_else(|| ValidationError::NotANumber(value.to_string()))?;

    let below = min.is_some_and(|m| number < m);
    let above = max.is_some_and(|m| number > m);
    if below || above {
        return Err(ValidationError::OutOfRange {
            value: number,
            min,
            max,
        });
    }

    Ok(SlotValue::Number(number))
}

fn coerce_boolean(value: &str) -> Result<SlotValue, ValidationError> {
    let token = value.to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Ok(SlotValue::Boolean(true))
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Ok(SlotValue::Boolean(false))
    } else {
        Err(ValidationError::NotABoolean(value.to_string()))
    }
}

fn coerce_date(
    value: &str,
    min_date: Option<&str>,
    max_date: Option<&str>,
) -> Result<SlotValue, ValidationError> {
    let date = parse_date(value).ok_or_else(|| ValidationError::NotADate(value.to_string()))?;

    let before = min_date.and_then(parse_date).is_some_and(|min| date < min);
    let after = max_date.and_then(parse_date).is_some_and(|max| date > max);
    if before || after {
        return Err(ValidationError::DateOutOfRange {
            value: value.to_string(),
        });
    }

    Ok(SlotValue::Text(format_date(&date)))
}

/// Parse an RFC 3339 timestamp or one of the common calendar layouts.
///
/// Values without an offset are taken as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Canonical `YYYY-MM-DDTHH:MM:SS.mmmZ` form
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coercion() {
        assert_eq!(validate("5", &SlotSpec::number()), Some(SlotValue::Number(5.0)));
        assert_eq!(validate(" 2.5 ", &SlotSpec::number()), Some(SlotValue::Number(2.5)));
        assert_eq!(validate("no-number", &SlotSpec::number()), None);
        assert_eq!(validate("NaN", &SlotSpec::number()), None);
    }

    #[test]
    fn test_number_range() {
        let spec = SlotSpec::new(SlotKind::Number {
            min: Some(1.0),
            max: Some(10.0),
        });
        assert!(matches!(
            coerce("0", &spec),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(validate("10", &spec), Some(SlotValue::Number(10.0)));
        assert_eq!(validate("11", &spec), None);
    }

    #[test]
    fn test_string_transforms_and_lengths() {
        let spec = SlotSpec::new(SlotKind::String {
            min_length: Some(3),
            max_length: Some(5),
            transform: Some(Transform::Capitalize),
        });
        assert_eq!(validate("  lAPTOP gaming ", &spec), Some("Lapto".into()));
        assert_eq!(validate("ab", &spec), None);

        let upper = SlotSpec::new(SlotKind::String {
            min_length: None,
            max_length: None,
            transform: Some(Transform::Uppercase),
        });
        assert_eq!(validate("ñandú", &upper), Some("ÑANDÚ".into()));
    }

    #[test]
    fn test_boolean_tokens() {
        let spec = SlotSpec::boolean();
        for token in ["true", "Sí", "si", "YES", "1", "on", "verdadero"] {
            assert_eq!(validate(token, &spec), Some(SlotValue::Boolean(true)), "{}", token);
        }
        for token in ["false", "No", "0", "off", "falso"] {
            assert_eq!(validate(token, &spec), Some(SlotValue::Boolean(false)), "{}", token);
        }
        assert_eq!(validate("quizás", &spec), None);
    }

    #[test]
    fn test_date_normalisation() {
        let spec = SlotSpec::date();
        assert_eq!(
            validate("2024-01-15", &spec),
            Some("2024-01-15T00:00:00.000Z".into())
        );
        assert_eq!(
            validate("2024-01-15T10:30:00+02:00", &spec),
            Some("2024-01-15T08:30:00.000Z".into())
        );
        assert_eq!(
            validate("15/01/2024", &spec),
            Some("2024-01-15T00:00:00.000Z".into())
        );
        assert_eq!(validate("mañana", &spec), None);
    }

    #[test]
    fn test_date_bounds() {
        let spec = SlotSpec::new(SlotKind::Date {
            min_date: Some("2024-01-01".to_string()),
            max_date: Some("2024-12-31".to_string()),
        });
        assert!(validate("2024-06-01", &spec).is_some());
        assert!(matches!(
            coerce("2023-12-31", &spec),
            Err(ValidationError::DateOutOfRange { .. })
        ));
        assert!(validate("2025-01-01", &spec).is_none());
    }

    #[test]
    fn test_resolve_applies_defaults_only_to_required() {
        let mut schema = BTreeMap::new();
        schema.insert(
            "cantidad".to_string(),
            SlotSpec::number().required().with_default(1.0.into()),
        );
        schema.insert(
            "precio".to_string(),
            SlotSpec::number().with_default(9.0.into()),
        );

        let mut captures = SlotCaptures::new();
        captures.insert("cantidad".to_string(), "muchos".to_string());

        let params = resolve_parameters(&captures, &schema);
        assert_eq!(params.get("cantidad"), Some(&SlotValue::Number(1.0)));
        assert!(!params.contains_key("precio"));
    }

    #[test]
    fn test_resolve_passes_through_undeclared_slots() {
        let mut captures = SlotCaptures::new();
        captures.insert("color".to_string(), "rojo".to_string());

        let params = resolve_parameters(&captures, &BTreeMap::new());
        assert_eq!(params.get("color"), Some(&SlotValue::Text("rojo".to_string())));
    }

    #[test]
    fn test_required_without_default_is_omitted() {
        let mut schema = BTreeMap::new();
        schema.insert("tema".to_string(), SlotSpec::string().required());

        let params = resolve_parameters(&SlotCaptures::new(), &schema);
        assert!(params.is_empty());
    }
}
