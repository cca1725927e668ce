//! Mapping from a vendor scanner's raw result to the internal verdict.
//!
//! Scanning vendors disagree on the field carrying the boolean outcome.
//! Every known spelling is handled here, in one place, so the rest of the
//! pipeline only ever sees a [`ScanVerdict`].

use anyhow::{bail, Result};
use serde_json::Value;

use cvgate_core::ScanVerdict;

/// Field names observed to carry the boolean safety outcome.
const VERDICT_FIELDS: &[&str] = &["isSafe", "is_safe", "safe"];

/// Field names observed to carry diagnostic detail.
const DETAIL_FIELDS: &[&str] = &["details", "message"];

/// Convert a raw vendor result into a [`ScanVerdict`].
///
/// Returns an error if no recognizable verdict field is present; the caller
/// treats that as a scanner fault, never as a safe result.
pub fn verdict_from_raw(raw: &Value) -> Result<ScanVerdict> {
    // A bare boolean body is the simplest vendor shape.
    if let Value::Bool(is_safe) = raw {
        return Ok(ScanVerdict {
            is_safe: *is_safe,
            details: None,
        });
    }

    let Some(obj) = raw.as_object() else {
        bail!("scanner result is neither a boolean nor an object: {raw}");
    };

    let is_safe = VERDICT_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_bool));

    let Some(is_safe) = is_safe else {
        bail!("scanner result has no recognizable verdict field");
    };

    let details = DETAIL_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_str))
        .map(str::to_string);

    Ok(ScanVerdict { is_safe, details })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_camel_case_field() {
        let v = verdict_from_raw(&json!({"isSafe": true})).unwrap();
        assert!(v.is_safe);
    }

    #[test]
    fn accepts_snake_case_field_with_details() {
        let v = verdict_from_raw(&json!({"is_safe": false, "details": "macro found"})).unwrap();
        assert!(!v.is_safe);
        assert_eq!(v.details.as_deref(), Some("macro found"));
    }

    #[test]
    fn accepts_bare_boolean_body() {
        let v = verdict_from_raw(&json!(false)).unwrap();
        assert!(!v.is_safe);
    }

    #[test]
    fn message_field_maps_to_details() {
        let v = verdict_from_raw(&json!({"safe": true, "message": "clean"})).unwrap();
        assert_eq!(v.details.as_deref(), Some("clean"));
    }

    #[test]
    fn rejects_unrecognizable_shape() {
        assert!(verdict_from_raw(&json!({"verdict": "ok"})).is_err());
        assert!(verdict_from_raw(&json!("safe")).is_err());
        // A non-boolean value under a known field is not a verdict.
        assert!(verdict_from_raw(&json!({"isSafe": "yes"})).is_err());
    }
}
