//! Country table access: listing, lookup, manual insert, delete.
//!
//! Every name-based operation goes through `name_key`, so callers never have to
//! care about the casing a row was stored with.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, instrument};

use crate::database_ops::db::Db;
use crate::normalization::name_key;

pub(crate) const COUNTRY_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CountryRow {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    GdpDesc,
    GdpAsc,
}

impl SortOrder {
    /// `gdp_desc` / `gdp_asc`; anything else means "no explicit order".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "gdp_desc" => Some(SortOrder::GdpDesc),
            "gdp_asc" => Some(SortOrder::GdpAsc),
            _ => None,
        }
    }
}

/// Listing filter. Region and currency match exactly after the same Unicode
/// case folding as names.
#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<SortOrder>,
}

/// A validated manual-create request. Derived fields are never part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCountry {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: String,
    pub flag_url: Option<String>,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(CountryRow),
    DuplicateName,
}

impl Db {
    /// Unpaginated listing. Rows without an estimated GDP trail in both sort
    /// directions; ties and the unsorted case fall back to ascending id.
    #[instrument(skip(self))]
    pub async fn list_countries(&self, filter: &CountryFilter) -> Result<Vec<CountryRow>> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE 1 = 1"));

        if let Some(region) = filter.region.as_deref().filter(|r| !r.trim().is_empty()) {
            qb.push(" AND region_key = ").push_bind(name_key(region));
        }
        if let Some(currency) = filter.currency.as_deref().filter(|c| !c.trim().is_empty()) {
            qb.push(" AND currency_key = ").push_bind(name_key(currency));
        }

        match filter.sort {
            Some(SortOrder::GdpDesc) => {
                qb.push(" ORDER BY estimated_gdp IS NULL, estimated_gdp DESC, id ASC")
            }
            Some(SortOrder::GdpAsc) => {
                qb.push(" ORDER BY estimated_gdp IS NULL, estimated_gdp ASC, id ASC")
            }
            None => qb.push(" ORDER BY id ASC"),
        };

        let rows = qb
            .build_query_as::<CountryRow>()
            .fetch_all(&self.pool)
            .await?;
        debug!(rows = rows.len(), "listed countries");
        Ok(rows)
    }

    pub async fn find_country(&self, name: &str) -> Result<Option<CountryRow>> {
        let row = sqlx::query_as::<_, CountryRow>(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries WHERE name_key = ?"
        ))
        .bind(name_key(name))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Returns `false` when no row matched.
    #[instrument(skip(self))]
    pub async fn delete_country(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM countries WHERE name_key = ?")
            .bind(name_key(name))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a manually supplied country. Exchange rate and GDP stay null.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn insert_country(&self, new: &NewCountry) -> Result<InsertOutcome> {
        let inserted = sqlx::query_as::<_, CountryRow>(&format!(
            "INSERT INTO countries \
             (name, name_key, capital, region, region_key, population, currency_code, \
              currency_key, flag_url, last_refreshed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {COUNTRY_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(name_key(&new.name))
        .bind(&new.capital)
        .bind(&new.region)
        .bind(new.region.as_deref().map(name_key))
        .bind(new.population)
        .bind(&new.currency_code)
        .bind(name_key(&new.currency_code))
        .bind(&new.flag_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(InsertOutcome::Created(row)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(InsertOutcome::DuplicateName)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn count_countries(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM countries")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Highest estimated GDP first, nulls excluded, ties by ascending id.
    pub async fn top_countries_by_gdp(&self, limit: i64) -> Result<Vec<CountryRow>> {
        let rows = sqlx::query_as::<_, CountryRow>(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries \
             WHERE estimated_gdp IS NOT NULL \
             ORDER BY estimated_gdp DESC, id ASC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
