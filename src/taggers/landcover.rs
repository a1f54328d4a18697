use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{coverage_by_class, footprint_of, identifier_option};
use crate::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
use crate::traits::{Tagger, TaggerContext};

/// Land-cover classes under the footprint, by share of its area.
///
/// Options: `table` (default `datasources.landcover`), `column` (default
/// `class`).
pub struct LandCoverTagger {
    ctx: TaggerContext,
}

impl LandCoverTagger {
    pub fn new(ctx: TaggerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tagger for LandCoverTagger {
    fn name(&self) -> &str {
        "LandCover"
    }

    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput> {
        let (wkt, area) = footprint_of(metadata)?;
        let table = identifier_option(options, "table", "datasources.landcover")?;
        let column = identifier_option(options, "column", "class")?;

        let classes = coverage_by_class(&self.ctx.db, table, column, wkt, area).await?;

        Ok(TaggerOutput::new()
            .with_content("landCover", json!({ "classes": classes }))
            .with_reference(
                "landcover",
                Reference::new("GlobCover")
                    .version("2009")
                    .attribution("ESA / Université catholique de Louvain")
                    .url("http://due.esrin.esa.int/page_globcover.php"),
            ))
    }
}
