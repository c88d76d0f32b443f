//! Field-level validation of manual create requests.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::database_ops::countries::NewCountry;

/// Field name to message, serialized as the `details` object of a 400.
pub type FieldErrors = BTreeMap<String, String>;

pub const NAME_MAX: usize = 100;
pub const CAPITAL_MAX: usize = 100;
pub const REGION_MAX: usize = 100;
pub const CURRENCY_CODE_MAX: usize = 10;

const REQUIRED: &str = "is required";
const NOT_A_STRING: &str = "must be a string";
const NOT_A_COUNT: &str = "must be a non-negative integer";
const NOT_A_URL: &str = "must be a valid URL";

/// Validate a create body. Unknown keys and the server-owned fields (`id`,
/// `exchange_rate`, `estimated_gdp`, `last_refreshed_at`) are ignored.
pub fn validate_new_country(body: &Value) -> Result<NewCountry, FieldErrors> {
    let mut errors = FieldErrors::new();
    let Some(obj) = body.as_object() else {
        errors.insert(
            "non_field_errors".into(),
            "expected a JSON object".into(),
        );
        return Err(errors);
    };

    let name = required_text(obj, "name", NAME_MAX, &mut errors);
    let population = required_population(obj, &mut errors);
    let currency_code = required_text(obj, "currency_code", CURRENCY_CODE_MAX, &mut errors);
    let capital = optional_text(obj, "capital", CAPITAL_MAX, &mut errors);
    let region = optional_text(obj, "region", REGION_MAX, &mut errors);
    let flag_url = optional_url(obj, "flag_url", &mut errors);

    match (name, population, currency_code) {
        (Some(name), Some(population), Some(currency_code)) if errors.is_empty() => {
            Ok(NewCountry {
                name,
                capital,
                region,
                population,
                currency_code,
                flag_url,
            })
        }
        _ => Err(errors),
    }
}

fn present<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn text(
    value: &Value,
    field: &str,
    max: usize,
    errors: &mut FieldErrors,
) -> Option<Option<String>> {
    let Some(raw) = value.as_str() else {
        errors.insert(field.into(), NOT_A_STRING.into());
        return None;
    };
    let trimmed = raw.trim();
    if trimmed.chars().count() > max {
        errors.insert(field.into(), format!("must be at most {max} characters"));
        return None;
    }
    Some((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn required_text(
    obj: &Map<String, Value>,
    field: &str,
    max: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    let Some(value) = present(obj, field) else {
        errors.insert(field.into(), REQUIRED.into());
        return None;
    };
    match text(value, field, max, errors)? {
        Some(s) => Some(s),
        None => {
            errors.insert(field.into(), REQUIRED.into());
            None
        }
    }
}

fn optional_text(
    obj: &Map<String, Value>,
    field: &str,
    max: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    present(obj, field).and_then(|v| text(v, field, max, errors).flatten())
}

fn required_population(obj: &Map<String, Value>, errors: &mut FieldErrors) -> Option<i64> {
    let Some(value) = present(obj, "population") else {
        errors.insert("population".into(), REQUIRED.into());
        return None;
    };
    match value.as_u64().and_then(|n| i64::try_from(n).ok()) {
        Some(n) => Some(n),
        None => {
            errors.insert("population".into(), NOT_A_COUNT.into());
            None
        }
    }
}

fn optional_url(obj: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    let raw = present(obj, field).and_then(|v| text(v, field, usize::MAX, errors).flatten())?;
    match url::Url::parse(&raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => Some(raw),
        _ => {
            errors.insert(field.into(), NOT_A_URL.into());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors_of(body: Value) -> FieldErrors {
        validate_new_country(&body).unwrap_err()
    }

    #[test]
    fn accepts_minimal_body() {
        let c = validate_new_country(&json!({
            "name": "Wakanda", "population": 6000000, "currency_code": "WKD"
        }))
        .unwrap();
        assert_eq!(c.name, "Wakanda");
        assert_eq!(c.population, 6_000_000);
        assert_eq!(c.currency_code, "WKD");
        assert_eq!(c.capital, None);
        assert_eq!(c.flag_url, None);
    }

    #[test]
    fn missing_name_is_the_only_error() {
        let errs = errors_of(json!({"population": 1, "currency_code": "NGN"}));
        assert_eq!(errs, FieldErrors::from([("name".into(), "is required".into())]));
    }

    #[test]
    fn null_and_blank_count_as_missing() {
        let errs = errors_of(json!({"name": "   ", "population": null, "currency_code": ""}));
        assert_eq!(errs.len(), 3);
        assert!(errs.values().all(|m| m == "is required"));
    }

    #[test]
    fn type_errors_are_reported_per_field() {
        let errs = errors_of(json!({
            "name": 42,
            "population": -3,
            "currency_code": "NGN",
            "capital": ["Abuja"],
            "flag_url": "not a url"
        }));
        assert_eq!(errs["name"], "must be a string");
        assert_eq!(errs["population"], "must be a non-negative integer");
        assert_eq!(errs["capital"], "must be a string");
        assert_eq!(errs["flag_url"], "must be a valid URL");
        assert!(!errs.contains_key("currency_code"));
    }

    #[test]
    fn population_rejects_fractions_and_strings() {
        for bad in [json!(1.5), json!("100"), json!(true)] {
            let errs = errors_of(json!({"name": "X", "population": bad, "currency_code": "XXX"}));
            assert_eq!(errs["population"], "must be a non-negative integer");
        }
    }

    #[test]
    fn zero_population_is_valid() {
        let c = validate_new_country(&json!({"name": "Empty", "population": 0, "currency_code": "E"}))
            .unwrap();
        assert_eq!(c.population, 0);
    }

    #[test]
    fn enforces_length_limits() {
        let errs = errors_of(json!({
            "name": "n".repeat(NAME_MAX + 1),
            "population": 1,
            "currency_code": "TOOLONGCODE",
            "region": "r".repeat(REGION_MAX + 1)
        }));
        assert_eq!(errs["name"], "must be at most 100 characters");
        assert_eq!(errs["currency_code"], "must be at most 10 characters");
        assert_eq!(errs["region"], "must be at most 100 characters");
    }

    #[test]
    fn read_only_fields_are_ignored() {
        let c = validate_new_country(&json!({
            "id": 99,
            "name": "Atlantis",
            "population": 10,
            "currency_code": "ATL",
            "exchange_rate": 2.0,
            "estimated_gdp": 1e12,
            "last_refreshed_at": "2020-01-01T00:00:00Z",
            "flag_url": "https://flags.example/atl.svg"
        }))
        .unwrap();
        assert_eq!(c.flag_url.as_deref(), Some("https://flags.example/atl.svg"));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let errs = errors_of(json!(["name", "population"]));
        assert!(errs.contains_key("non_field_errors"));
    }
}
