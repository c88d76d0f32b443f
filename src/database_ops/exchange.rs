use serde_json::Value;
use std::collections::HashMap;

use crate::database_ops::source::{UpstreamApi, UpstreamError};

/// Currency code → units per 1 USD, as published by the exchange-rate API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Decode a raw exchange-rate response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, UpstreamError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| UpstreamError::decode(UpstreamApi::Exchange, e))?;
        Self::from_payload(&payload)
    }

    /// Build the table from a decoded payload.
    ///
    /// Providers disagree on the key: open.er-api uses `rates`, exchangerate-api
    /// v6 uses `conversion_rates`. The first non-empty object wins; a payload with
    /// neither yields an empty table rather than an error.
    pub fn from_payload(payload: &Value) -> Result<Self, UpstreamError> {
        let obj = payload.as_object().ok_or_else(|| {
            UpstreamError::decode(UpstreamApi::Exchange, "expected a JSON object")
        })?;

        let table = ["rates", "conversion_rates"]
            .iter()
            .filter_map(|key| obj.get(*key).and_then(Value::as_object))
            .find(|m| !m.is_empty());

        let rates = table
            .map(|m| {
                m.iter()
                    .filter_map(|(code, raw)| parse_rate(raw).map(|r| (code.to_uppercase(), r)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { rates })
    }

    /// Usable USD rate for `code`: present, finite and strictly positive.
    pub fn usd_rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(&code.to_uppercase())
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            rates: iter
                .into_iter()
                .map(|(code, rate)| {
                    let code: String = code.into();
                    (code.to_uppercase(), rate)
                })
                .collect(),
        }
    }
}

/// Numbers pass through; numeric strings are parsed; anything else is dropped.
fn parse_rate(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_rates_key() {
        let t = RateTable::from_payload(&json!({
            "result": "success",
            "base_code": "USD",
            "rates": {"USD": 1, "NGN": 1600.23, "EUR": 0.92}
        }))
        .unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.usd_rate("NGN"), Some(1600.23));
        assert_eq!(t.usd_rate("usd"), Some(1.0));
    }

    #[test]
    fn falls_back_to_conversion_rates() {
        let t = RateTable::from_payload(&json!({
            "rates": {},
            "conversion_rates": {"GHS": 15.3}
        }))
        .unwrap();
        assert_eq!(t.usd_rate("GHS"), Some(15.3));
    }

    #[test]
    fn missing_rate_keys_yield_empty_table() {
        let t = RateTable::from_payload(&json!({"result": "error"})).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn numeric_strings_parse_and_junk_is_dropped() {
        let t = RateTable::from_payload(&json!({
            "rates": {"JPY": "151.2", "XXX": "n/a", "YYY": null, "ZZZ": [1]}
        }))
        .unwrap();
        assert_eq!(t.usd_rate("JPY"), Some(151.2));
        assert_eq!(t.usd_rate("XXX"), None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn non_positive_rates_are_unusable() {
        let t: RateTable = [("AAA", 0.0), ("BBB", -2.0), ("CCC", f64::INFINITY)]
            .into_iter()
            .collect();
        assert_eq!(t.usd_rate("AAA"), None);
        assert_eq!(t.usd_rate("BBB"), None);
        assert_eq!(t.usd_rate("CCC"), None);
    }

    #[test]
    fn rejects_non_object_bodies() {
        assert!(matches!(
            RateTable::from_slice(b"[1, 2, 3]"),
            Err(UpstreamError::Decode { .. })
        ));
        assert!(matches!(
            RateTable::from_slice(b"<html>502</html>"),
            Err(UpstreamError::Decode { .. })
        ));
    }
}
