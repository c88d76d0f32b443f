//! Derived-field computation and the transactional upsert of a refreshed batch.

use anyhow::{Context, Result};
use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::ops::Range;
use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::database_ops::exchange::RateTable;
use crate::normalization::{name_key, normalize, NormalizedCountry, RawCountry};

/// Bounds of the uniform multiplier in `population * U / rate`.
pub const GDP_MULTIPLIER_RANGE: Range<f64> = 1000.0..2000.0;

/// Source of the per-record GDP multiplier.
pub trait GdpMultiplier: Send {
    fn sample(&mut self) -> f64;
}

/// Fresh uniform draw from [`GDP_MULTIPLIER_RANGE`] for every record.
pub struct RandomMultiplier {
    rng: StdRng,
}

impl RandomMultiplier {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl GdpMultiplier for RandomMultiplier {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(GDP_MULTIPLIER_RANGE)
    }
}

/// Constant multiplier, for deterministic estimates.
#[derive(Debug, Clone, Copy)]
pub struct FixedMultiplier(pub f64);

impl GdpMultiplier for FixedMultiplier {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// One row as it will be written by the refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryUpsert {
    pub country: NormalizedCountry,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
}

/// Attach exchange rate and estimated GDP. Both stay unset unless the
/// currency resolves to a usable rate and the estimate is finite.
pub fn derive_upsert(
    country: NormalizedCountry,
    rates: &RateTable,
    multiplier: &mut dyn GdpMultiplier,
) -> CountryUpsert {
    let rate = country
        .currency_code
        .as_deref()
        .and_then(|code| rates.usd_rate(code));

    let (exchange_rate, estimated_gdp) = match rate {
        Some(rate) => {
            let gdp = country.population as f64 * multiplier.sample() / rate;
            if gdp.is_finite() {
                (Some(rate), Some(gdp))
            } else {
                (None, None)
            }
        }
        None => (None, None),
    };

    CountryUpsert {
        country,
        exchange_rate,
        estimated_gdp,
    }
}

pub fn derive_batch(
    raw: &[RawCountry],
    rates: &RateTable,
    multiplier: &mut dyn GdpMultiplier,
) -> Vec<CountryUpsert> {
    raw.iter()
        .map(|r| derive_upsert(normalize(r), rates, multiplier))
        .collect()
}

impl Db {
    /// Upsert the whole batch by case-insensitive name inside one transaction.
    ///
    /// Existing rows keep their id and stored name; every other column is
    /// replaced. Any failing record rolls the entire batch back.
    #[instrument(skip(self, batch), fields(records = batch.len()))]
    pub async fn reconcile_batch(&self, batch: &[CountryUpsert]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let stamped_at = Utc::now();

        for (idx, item) in batch.iter().enumerate() {
            let c = &item.country;
            sqlx::query(
                "INSERT INTO countries \
                 (name, name_key, capital, region, region_key, population, currency_code, \
                  currency_key, exchange_rate, estimated_gdp, flag_url, last_refreshed_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(name_key) DO UPDATE SET \
                   capital = excluded.capital, \
                   region = excluded.region, \
                   region_key = excluded.region_key, \
                   population = excluded.population, \
                   currency_code = excluded.currency_code, \
                   currency_key = excluded.currency_key, \
                   exchange_rate = excluded.exchange_rate, \
                   estimated_gdp = excluded.estimated_gdp, \
                   flag_url = excluded.flag_url, \
                   last_refreshed_at = excluded.last_refreshed_at",
            )
            .bind(&c.name)
            .bind(c.key())
            .bind(&c.capital)
            .bind(&c.region)
            .bind(c.region.as_deref().map(name_key))
            .bind(c.population)
            .bind(&c.currency_code)
            .bind(c.currency_code.as_deref().map(name_key))
            .bind(item.exchange_rate)
            .bind(item.estimated_gdp)
            .bind(&c.flag_url)
            .bind(stamped_at)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "upsert failed for record #{idx} ({})",
                    c.name.as_deref().unwrap_or("<unnamed>")
                )
            })?;
        }

        tx.commit().await.context("commit of refreshed batch failed")?;
        info!(records = batch.len(), "country batch reconciled");
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::countries::{CountryFilter, CountryRow};
    use crate::database_ops::db::test_db;
    use crate::database_ops::source::fixtures::{sample_catalog, sample_rates};
    use serde_json::json;

    fn raw_batch(value: serde_json::Value) -> Vec<RawCountry> {
        serde_json::from_value(value).unwrap()
    }

    async fn all_rows(db: &Db) -> Vec<CountryRow> {
        db.list_countries(&CountryFilter::default()).await.unwrap()
    }

    #[test]
    fn gdp_uses_population_multiplier_and_rate() {
        let rates: RateTable = [("NGN", 1600.0)].into_iter().collect();
        let raw = raw_batch(json!([
            {"name": "Nigeria", "population": 1600000, "currencies": [{"code": "NGN"}]}
        ]));
        let batch = derive_batch(&raw, &rates, &mut FixedMultiplier(1500.0));
        assert_eq!(batch[0].exchange_rate, Some(1600.0));
        assert_eq!(batch[0].estimated_gdp, Some(1_500_000.0));
    }

    #[test]
    fn gdp_present_iff_positive_rate_resolves() {
        let rates: RateTable = [("EUR", 0.92), ("ZZZ", 0.0), ("NEG", -1.0)]
            .into_iter()
            .collect();
        let raw = raw_batch(json!([
            {"name": "Germany", "population": 10, "currencies": [{"code": "EUR"}]},
            {"name": "Narnia", "population": 10, "currencies": [{"code": "NRN"}]},
            {"name": "Zero", "population": 10, "currencies": [{"code": "ZZZ"}]},
            {"name": "Negative", "population": 10, "currencies": [{"code": "NEG"}]},
            {"name": "Antarctica", "population": 10}
        ]));
        let batch = derive_batch(&raw, &rates, &mut RandomMultiplier::seeded(7));
        for item in &batch {
            assert_eq!(
                item.exchange_rate.is_some(),
                item.estimated_gdp.is_some(),
                "{:?}",
                item.country.name
            );
        }
        assert!(batch[0].estimated_gdp.is_some());
        assert!(batch[1..].iter().all(|i| i.estimated_gdp.is_none()));
    }

    #[test]
    fn non_finite_estimate_leaves_both_unset() {
        let rates: RateTable = [("TNY", f64::MIN_POSITIVE)].into_iter().collect();
        let raw = raw_batch(json!([
            {"name": "Tiny", "population": 9223372036854775807u64, "currencies": [{"code": "TNY"}]}
        ]));
        let batch = derive_batch(&raw, &rates, &mut FixedMultiplier(1999.0));
        assert_eq!(batch[0].exchange_rate, None);
        assert_eq!(batch[0].estimated_gdp, None);
    }

    #[test]
    fn random_multiplier_stays_in_range() {
        let mut m = RandomMultiplier::seeded(42);
        for _ in 0..1_000 {
            let u = m.sample();
            assert!(GDP_MULTIPLIER_RANGE.contains(&u), "{u}");
        }
    }

    #[tokio::test]
    async fn case_variants_collapse_to_one_row() {
        let db = test_db().await;
        let raw = raw_batch(json!([
            {"name": "Côte d'Ivoire", "region": "Africa", "population": 1},
            {"name": "CÔTE D'IVOIRE", "region": "Africa", "population": 2},
            {"name": "côte d'ivoire", "region": "Africa", "population": 3}
        ]));
        let batch = derive_batch(&raw, &RateTable::default(), &mut FixedMultiplier(1000.0));
        db.reconcile_batch(&batch).await.unwrap();

        let rows = all_rows(&db).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Côte d'Ivoire");
        assert_eq!(rows[0].population, 3);
    }

    #[tokio::test]
    async fn second_refresh_overwrites_in_place() {
        let db = test_db().await;
        let first = raw_batch(json!([
            {"name": "Ghana", "capital": "Accra", "region": "Africa", "population": 100,
             "flag": "https://flagcdn.com/gh.svg", "currencies": [{"code": "GHS"}]}
        ]));
        let rates: RateTable = [("GHS", 10.0)].into_iter().collect();
        db.reconcile_batch(&derive_batch(&first, &rates, &mut FixedMultiplier(1000.0)))
            .await
            .unwrap();
        let before = all_rows(&db).await;

        // Currency vanished upstream: derived fields must be cleared, not kept.
        let second = raw_batch(json!([
            {"name": "GHANA", "region": "West Africa", "population": 200}
        ]));
        db.reconcile_batch(&derive_batch(&second, &rates, &mut FixedMultiplier(1000.0)))
            .await
            .unwrap();
        let after = all_rows(&db).await;

        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].name, "Ghana");
        assert_eq!(after[0].region.as_deref(), Some("West Africa"));
        assert_eq!(after[0].population, 200);
        assert_eq!(after[0].capital, None);
        assert_eq!(after[0].flag_url, None);
        assert_eq!(after[0].currency_code, None);
        assert_eq!(after[0].exchange_rate, None);
        assert_eq!(after[0].estimated_gdp, None);
        assert!(after[0].last_refreshed_at >= before[0].last_refreshed_at);
    }

    #[tokio::test]
    async fn failing_record_rolls_back_whole_batch() {
        let db = test_db().await;
        let seed = derive_batch(
            &serde_json::from_value::<Vec<RawCountry>>(sample_catalog()).unwrap(),
            &sample_rates(),
            &mut FixedMultiplier(1000.0),
        );
        db.reconcile_batch(&seed).await.unwrap();
        let before = all_rows(&db).await;

        // The nameless record in the middle violates NOT NULL on insert.
        let poisoned = raw_batch(json!([
            {"name": "Nigeria", "population": 1, "currencies": [{"code": "NGN"}]},
            {"name": "Atlantis", "population": 5},
            {"population": 7},
            {"name": "Germany", "population": 2}
        ]));
        let batch = derive_batch(&poisoned, &sample_rates(), &mut FixedMultiplier(1000.0));
        assert!(db.reconcile_batch(&batch).await.is_err());

        assert_eq!(all_rows(&db).await, before);
    }

    #[tokio::test]
    async fn every_input_name_maps_to_exactly_one_row() {
        let db = test_db().await;
        let raw: Vec<RawCountry> = serde_json::from_value(sample_catalog()).unwrap();
        let batch = derive_batch(&raw, &sample_rates(), &mut RandomMultiplier::seeded(1));
        db.reconcile_batch(&batch).await.unwrap();

        let rows = all_rows(&db).await;
        for input in &raw {
            let name = input.name.as_deref().unwrap();
            let hits = rows
                .iter()
                .filter(|r| r.name.to_lowercase() == name.to_lowercase())
                .count();
            assert_eq!(hits, 1, "{name}");
        }
        for row in &rows {
            assert_eq!(row.exchange_rate.is_some(), row.estimated_gdp.is_some());
        }
    }
}
