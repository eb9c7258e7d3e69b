//! Boundary validation — SPEC_FULL.md §6. Runs before any engine call so
//! the engine never has to reason about malformed input.

use crate::api_types::FieldError;

pub const DURATION_MIN: i64 = 60;
pub const DURATION_MAX: i64 = 1800;
pub const DURATION_DEFAULT: i64 = 60;

/// Trim, reject empties/duplicates. Returns the normalized list or the
/// field errors describing why it was rejected.
pub fn validate_seat_ids(raw: &[String]) -> Result<Vec<String>, Vec<FieldError>> {
    let trimmed: Vec<String> = raw.iter().map(|s| s.trim().to_string()).collect();

    if trimmed.is_empty() {
        return Err(vec![FieldError {
            field: "seat_ids".to_string(),
            reason: "must be a non-empty array".to_string(),
        }]);
    }

    let mut errors = Vec::new();
    for (index, seat_id) in trimmed.iter().enumerate() {
        if seat_id.is_empty() {
            errors.push(FieldError {
                field: format!("seat_ids[{index}]"),
                reason: "must not be empty or whitespace-only".to_string(),
            });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut seen = std::collections::HashSet::with_capacity(trimmed.len());
    for (index, seat_id) in trimmed.iter().enumerate() {
        if !seen.insert(seat_id.as_str()) {
            errors.push(FieldError {
                field: format!("seat_ids[{index}]"),
                reason: format!("duplicate seat_id {seat_id:?}"),
            });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(trimmed)
}

/// Coerce and clamp `hold_duration_seconds`. Accepts ints or digit-only
/// strings, clamps out-of-range values into `[DURATION_MIN, DURATION_MAX]`
/// silently (an explicit Open Question call — see DESIGN.md), defaults to
/// `DURATION_DEFAULT` when absent, and rejects booleans or non-numeric
/// strings outright.
pub fn clamp_duration(raw: Option<&serde_json::Value>) -> Result<i64, FieldError> {
    let value = match raw {
        None => return Ok(DURATION_DEFAULT),
        Some(serde_json::Value::Null) => return Ok(DURATION_DEFAULT),
        Some(v) => v,
    };

    let parsed: i64 = match value {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| FieldError {
            field: "hold_duration_seconds".to_string(),
            reason: "must be an integer".to_string(),
        })?,
        serde_json::Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse().map_err(|_| FieldError {
                field: "hold_duration_seconds".to_string(),
                reason: "must be an integer".to_string(),
            })?
        }
        _ => {
            return Err(FieldError {
                field: "hold_duration_seconds".to_string(),
                reason: "must be an integer or digit-only string".to_string(),
            })
        }
    };

    Ok(parsed.clamp(DURATION_MIN, DURATION_MAX))
}

pub fn validate_hold_id(raw: &str) -> Result<&str, FieldError> {
    if raw.trim().is_empty() {
        return Err(FieldError {
            field: "hold_id".to_string(),
            reason: "must be a non-empty string".to_string(),
        });
    }
    Ok(raw.trim())
}

pub fn validate_show_id(raw: &str) -> Result<&str, FieldError> {
    if raw.trim().is_empty() {
        return Err(FieldError {
            field: "show_id".to_string(),
            reason: "must be a non-empty string".to_string(),
        });
    }
    Ok(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_duration_defaults_when_absent() {
        assert_eq!(clamp_duration(None).unwrap(), DURATION_DEFAULT);
    }

    #[test]
    fn clamp_duration_clamps_low_value_silently() {
        let v = serde_json::json!(0);
        assert_eq!(clamp_duration(Some(&v)).unwrap(), DURATION_MIN);
    }

    #[test]
    fn clamp_duration_clamps_high_value_silently() {
        let v = serde_json::json!(10_000);
        assert_eq!(clamp_duration(Some(&v)).unwrap(), DURATION_MAX);
    }

    #[test]
    fn clamp_duration_accepts_digit_only_string() {
        let v = serde_json::json!("120");
        assert_eq!(clamp_duration(Some(&v)).unwrap(), 120);
    }

    #[test]
    fn clamp_duration_rejects_boolean() {
        let v = serde_json::json!(true);
        assert!(clamp_duration(Some(&v)).is_err());
    }

    #[test]
    fn clamp_duration_rejects_non_numeric_string() {
        let v = serde_json::json!("soon");
        assert!(clamp_duration(Some(&v)).is_err());
    }

    #[test]
    fn validate_seat_ids_trims_whitespace() {
        let raw = vec![" A1 ".to_string(), "A2".to_string()];
        let out = validate_seat_ids(&raw).unwrap();
        assert_eq!(out, vec!["A1".to_string(), "A2".to_string()]);
    }

    #[test]
    fn validate_seat_ids_rejects_duplicates_after_trim() {
        let raw = vec!["A1".to_string(), " A1".to_string()];
        assert!(validate_seat_ids(&raw).is_err());
    }

    #[test]
    fn validate_seat_ids_rejects_empty_list() {
        assert!(validate_seat_ids(&[]).is_err());
    }
}
