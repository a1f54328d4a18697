use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{coverage_by_class, footprint_of, identifier_option, length_by_name, limit_option};
use crate::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
use crate::traits::{Tagger, TaggerContext};

/// Rivers crossing the footprint (by length) and lakes inside it (by area).
///
/// Options: `rivers_table` (default `datasources.rivers`), `lakes_table`
/// (default `datasources.lakes`), `max_rivers` (default 20).
pub struct HydrologyTagger {
    ctx: TaggerContext,
}

impl HydrologyTagger {
    pub fn new(ctx: TaggerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tagger for HydrologyTagger {
    fn name(&self) -> &str {
        "Hydrology"
    }

    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput> {
        let (wkt, area) = footprint_of(metadata)?;
        let rivers_table = identifier_option(options, "rivers_table", "datasources.rivers")?;
        let lakes_table = identifier_option(options, "lakes_table", "datasources.lakes")?;
        let max_rivers = limit_option(options, "max_rivers", 20);

        let rivers = length_by_name(&self.ctx.db, rivers_table, "name", wkt, max_rivers).await?;
        let lakes = coverage_by_class(&self.ctx.db, lakes_table, "name", wkt, area).await?;

        Ok(TaggerOutput::new()
            .with_content("hydrology", json!({ "rivers": rivers, "lakes": lakes }))
            .with_reference(
                "hydrology",
                Reference::new("Natural Earth Rivers and Lake Centerlines / Lakes")
                    .version("4.1.0")
                    .attribution("Natural Earth")
                    .url("https://www.naturalearthdata.com"),
            ))
    }
}
