//! Built-in taggers.
//!
//! [`AlwaysTagger`] is the geometry baseline and runs on every request. The
//! others each summarise how the footprint overlaps one family of reference
//! tables in the spatial database:
//!
//! | Tagger | Content key | Default tables |
//! |--------|-------------|----------------|
//! | [`LandCoverTagger`] | `landCover` | `datasources.landcover` |
//! | [`PoliticalTagger`] | `political` | `datasources.countries`, `datasources.cities` |
//! | [`PopulationTagger`] | `population` | `datasources.population` |
//! | [`HydrologyTagger`] | `hydrology` | `datasources.rivers`, `datasources.lakes` |
//! | [`GeologyTagger`] | `geology` | `datasources.plates`, `datasources.faults`, `datasources.volcanoes` |
//! | [`GenericTagger`] | option `category` | option `table` |
//!
//! Table and column names can be overridden through the tagger's options;
//! they are validated as plain SQL identifiers before being spliced into a
//! query. The footprint itself is always bound as a parameter.

mod always;
mod generic;
mod geology;
mod hydrology;
mod landcover;
mod political;
mod population;

pub use always::{AlwaysTagger, Baseline};
pub use generic::GenericTagger;
pub use geology::GeologyTagger;
pub use hydrology::HydrologyTagger;
pub use landcover::LandCoverTagger;
pub use political::PoliticalTagger;
pub use population::PopulationTagger;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::db::DatabaseHandle;
use crate::models::{FootprintMetadata, TaggerOptions};

/// Footprint geometry expression; `$1` is always the WKT.
const FOOTPRINT: &str = "ST_GeomFromText($1, 4326)";

/// Area share of one class inside the footprint.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Coverage {
    pub name: String,
    /// km²
    pub area: f64,
    /// Percent of the footprint.
    pub pcover: f64,
}

/// Length of one linear feature inside the footprint.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Length {
    pub name: String,
    /// km
    pub length: f64,
}

/// The footprint WKT and the area the baseline computed.
pub(crate) fn footprint_of(metadata: &FootprintMetadata) -> Result<(&str, f64)> {
    let wkt = metadata
        .footprint
        .as_deref()
        .context("metadata has no footprint")?;
    let area = metadata
        .area
        .context("footprint area has not been computed")?;
    Ok((wkt, area))
}

/// Rejects anything that is not `name` or `schema.name` made of
/// `[A-Za-z0-9_]`, not starting with a digit.
pub(crate) fn checked_identifier(value: &str) -> Result<&str> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && !part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        bail!("invalid SQL identifier: '{}'", value);
    }
    Ok(value)
}

/// String option, validated as an identifier, with a default.
pub(crate) fn identifier_option<'a>(
    options: &'a TaggerOptions,
    key: &str,
    default: &'a str,
) -> Result<&'a str> {
    match options.get(key) {
        None => Ok(default),
        Some(v) => {
            let s = v
                .as_str()
                .with_context(|| format!("option '{}' must be a string", key))?;
            checked_identifier(s)
        }
    }
}

pub(crate) fn bool_option(options: &TaggerOptions, key: &str, default: bool) -> bool {
    options.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

pub(crate) fn limit_option(options: &TaggerOptions, key: &str, default: i64) -> i64 {
    options
        .get(key)
        .and_then(|v| v.as_i64())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percent of `total` covered by `part`, two decimals, capped at 100.
pub(crate) fn percent(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    round2((part / total * 100.0).min(100.0))
}

/// Area (km²) of each `class_column` value inside the footprint, largest first.
pub(crate) async fn coverage_by_class(
    db: &DatabaseHandle,
    table: &str,
    class_column: &str,
    wkt: &str,
    footprint_area: f64,
) -> Result<Vec<Coverage>> {
    let sql = format!(
        "SELECT COALESCE({col}::text, 'unknown') AS name, \
         SUM(ST_Area(ST_Intersection(geom, {fp})::geography)) / 1000000.0 AS area \
         FROM {table} WHERE ST_Intersects(geom, {fp}) \
         GROUP BY 1 ORDER BY area DESC",
        col = class_column,
        fp = FOOTPRINT,
        table = table,
    );
    let rows: Vec<(String, f64)> = sqlx::query_as(&sql)
        .bind(wkt)
        .fetch_all(db.pool())
        .await
        .with_context(|| format!("coverage query on {} failed", table))?;

    Ok(rows
        .into_iter()
        .map(|(name, area)| Coverage {
            name,
            area: round2(area),
            pcover: percent(area, footprint_area),
        })
        .collect())
}

/// Length (km) of each named linear feature inside the footprint, longest first.
pub(crate) async fn length_by_name(
    db: &DatabaseHandle,
    table: &str,
    name_column: &str,
    wkt: &str,
    limit: i64,
) -> Result<Vec<Length>> {
    let sql = format!(
        "SELECT COALESCE({col}::text, 'unknown') AS name, \
         SUM(ST_Length(ST_Intersection(geom, {fp})::geography)) / 1000.0 AS length \
         FROM {table} WHERE ST_Intersects(geom, {fp}) \
         GROUP BY 1 ORDER BY length DESC LIMIT $2",
        col = name_column,
        fp = FOOTPRINT,
        table = table,
    );
    let rows: Vec<(String, f64)> = sqlx::query_as(&sql)
        .bind(wkt)
        .bind(limit)
        .fetch_all(db.pool())
        .await
        .with_context(|| format!("length query on {} failed", table))?;

    Ok(rows
        .into_iter()
        .map(|(name, length)| Length {
            name,
            length: round2(length),
        })
        .collect())
}

/// Distinct names of features intersecting the footprint.
pub(crate) async fn names_within(
    db: &DatabaseHandle,
    table: &str,
    name_column: &str,
    wkt: &str,
    limit: i64,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT {col}::text AS name FROM {table} \
         WHERE {col} IS NOT NULL AND ST_Intersects(geom, {fp}) \
         ORDER BY 1 LIMIT $2",
        col = name_column,
        fp = FOOTPRINT,
        table = table,
    );
    let names: Vec<String> = sqlx::query_scalar(&sql)
        .bind(wkt)
        .bind(limit)
        .fetch_all(db.pool())
        .await
        .with_context(|| format!("feature query on {} failed", table))?;
    Ok(names)
}
