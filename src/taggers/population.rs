use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{footprint_of, identifier_option, round2};
use crate::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
use crate::traits::{Tagger, TaggerContext};

/// Estimated head count inside the footprint.
///
/// Each grid cell's count is weighted by the fraction of the cell the
/// footprint covers. Options: `table` (default `datasources.population`),
/// `column` (default `pcount`).
pub struct PopulationTagger {
    ctx: TaggerContext,
}

impl PopulationTagger {
    pub fn new(ctx: TaggerContext) -> Self {
        Self { ctx }
    }
}

/// `{count, density}` with the count rounded to whole people and density in
/// people per km².
fn summary(count: f64, area: f64) -> Value {
    let count = count.round();
    let density = if area > 0.0 { round2(count / area) } else { 0.0 };
    json!({ "count": count as i64, "density": density })
}

#[async_trait]
impl Tagger for PopulationTagger {
    fn name(&self) -> &str {
        "Population"
    }

    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput> {
        let (wkt, area) = footprint_of(metadata)?;
        let table = identifier_option(options, "table", "datasources.population")?;
        let column = identifier_option(options, "column", "pcount")?;

        let sql = format!(
            "SELECT COALESCE(SUM({col} * ST_Area(ST_Intersection(geom, ST_GeomFromText($1, 4326))) \
             / NULLIF(ST_Area(geom), 0)), 0)::float8 \
             FROM {table} WHERE ST_Intersects(geom, ST_GeomFromText($1, 4326))",
            col = column,
            table = table,
        );
        let count: f64 = sqlx::query_scalar(&sql)
            .bind(wkt)
            .fetch_one(self.ctx.db.pool())
            .await
            .with_context(|| format!("population query on {} failed", table))?;

        Ok(TaggerOutput::new()
            .with_content("population", summary(count, area))
            .with_reference(
                "population",
                Reference::new("Gridded Population of the World")
                    .version("4")
                    .attribution("CIESIN, Columbia University")
                    .url("https://sedac.ciesin.columbia.edu/data/collection/gpw-v4"),
            ))
    }
}
