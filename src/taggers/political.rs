use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{bool_option, footprint_of, identifier_option, limit_option, names_within, percent};
use crate::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
use crate::traits::{Tagger, TaggerContext};

/// Continents and countries the footprint falls in, plus place names for
/// small footprints.
///
/// Options: `table` (default `datasources.countries`, columns `name` and
/// `continent`), `toponyms` (default `true`), `cities_table` (default
/// `datasources.cities`), `max_toponyms` (default 50).
///
/// Toponyms are only looked up when the footprint area does not exceed the
/// engine's `area_limit`.
pub struct PoliticalTagger {
    ctx: TaggerContext,
}

#[derive(Debug, Serialize)]
struct Country {
    name: String,
    pcover: f64,
}

#[derive(Debug, Serialize)]
struct Continent {
    name: String,
    countries: Vec<Country>,
}

impl PoliticalTagger {
    pub fn new(ctx: TaggerContext) -> Self {
        Self { ctx }
    }

    async fn continents(&self, table: &str, wkt: &str, area: f64) -> Result<Vec<Continent>> {
        let sql = format!(
            "SELECT name::text, COALESCE(continent::text, 'unknown'), \
             SUM(ST_Area(ST_Intersection(geom, ST_GeomFromText($1, 4326))::geography)) / 1000000.0 AS area \
             FROM {table} WHERE ST_Intersects(geom, ST_GeomFromText($1, 4326)) \
             GROUP BY 1, 2 ORDER BY area DESC",
            table = table,
        );
        let rows: Vec<(String, String, f64)> = sqlx::query_as(&sql)
            .bind(wkt)
            .fetch_all(self.ctx.db.pool())
            .await
            .with_context(|| format!("country query on {} failed", table))?;

        // Rows arrive largest first; keep that order inside each continent.
        let mut grouped: BTreeMap<String, Vec<Country>> = BTreeMap::new();
        for (country, continent, covered) in rows {
            grouped.entry(continent).or_default().push(Country {
                name: country,
                pcover: percent(covered, area),
            });
        }
        Ok(grouped
            .into_iter()
            .map(|(name, countries)| Continent { name, countries })
            .collect())
    }
}

/// Place names are looked up only when asked for and only for footprints no
/// larger than `area_limit` km².
fn wants_toponyms(options: &TaggerOptions, area: f64, area_limit: f64) -> bool {
    bool_option(options, "toponyms", true) && area <= area_limit
}

#[async_trait]
impl Tagger for PoliticalTagger {
    fn name(&self) -> &str {
        "Political"
    }

    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput> {
        let (wkt, area) = footprint_of(metadata)?;
        let table = identifier_option(options, "table", "datasources.countries")?;

        let mut political = json!({
            "continents": self.continents(table, wkt, area).await?,
        });
        let mut output = TaggerOutput::new().with_reference(
            "countries",
            Reference::new("Natural Earth Admin 0 - Countries")
                .version("4.1.0")
                .attribution("Natural Earth")
                .url("https://www.naturalearthdata.com"),
        );

        let area_limit = self.ctx.config.area_limit;
        if wants_toponyms(options, area, area_limit) {
            let cities = identifier_option(options, "cities_table", "datasources.cities")?;
            let limit = limit_option(options, "max_toponyms", 50);
            let toponyms = names_within(&self.ctx.db, cities, "name", wkt, limit).await?;
            political["toponyms"] = json!(toponyms);
            output = output.with_reference(
                "cities",
                Reference::new("GeoNames")
                    .attribution("GeoNames (CC BY 4.0)")
                    .url("https://www.geonames.org"),
            );
        } else if area > area_limit {
            debug!(area, limit = area_limit, "footprint too large for toponyms");
        }

        Ok(output.with_content("political", political))
    }
}
