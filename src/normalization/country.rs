use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One entry of the upstream countries catalog.
///
/// Only `name` is load-bearing; every other field may be absent, null or of
/// an unexpected type, and such values decode as absent instead of failing the
/// whole catalog. The `flags` and `currencies` shapes vary between catalog
/// versions, so they stay as raw JSON and are picked apart by [`normalize`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCountry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub capital: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub population: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub flag: Option<String>,
    #[serde(default)]
    pub flags: Option<Value>,
    #[serde(default)]
    pub currencies: Option<Value>,
}

/// Strings pass through; any other JSON value reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Non-negative integers pass through and non-negative floats truncate.
/// Negative, non-numeric or non-finite values read as absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    }))
}

/// Catalog record reduced to the columns we store, before any derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCountry {
    /// `None` only for malformed upstream records; such a record fails the write.
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub flag_url: Option<String>,
    pub currency_code: Option<String>,
}

impl NormalizedCountry {
    /// Case-insensitive natural key for this record.
    pub fn key(&self) -> Option<String> {
        self.name.as_deref().map(name_key)
    }
}

/// Case-insensitive lookup key for a country name.
///
/// Unicode-aware lowercase over the trimmed name, so "ÅLAND ISLANDS" and
/// "Åland Islands" collapse to one row.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Reduce a raw catalog entry to the stored shape.
pub fn normalize(raw: &RawCountry) -> NormalizedCountry {
    NormalizedCountry {
        name: raw.name.clone(),
        capital: non_empty(raw.capital.as_deref()),
        region: non_empty(raw.region.as_deref()),
        population: raw
            .population
            .map(|p| i64::try_from(p).unwrap_or(i64::MAX))
            .unwrap_or(0),
        flag_url: flag_url(raw),
        currency_code: first_currency_code(raw),
    }
}

/// Direct `flag` field first, then the vector variant under `flags.svg`.
fn flag_url(raw: &RawCountry) -> Option<String> {
    non_empty(raw.flag.as_deref()).or_else(|| {
        raw.flags
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|flags| flags.get("svg"))
            .and_then(Value::as_str)
            .and_then(|svg| non_empty(Some(svg)))
    })
}

fn first_currency_code(raw: &RawCountry) -> Option<String> {
    let first = raw.currencies.as_ref()?.as_array()?.first()?;
    let code = first.as_object()?.get("code")?.as_str()?;
    non_empty(Some(code))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}
