use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;

use super::{checked_identifier, coverage_by_class, footprint_of};
use crate::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
use crate::traits::{Tagger, TaggerContext};

/// Area coverage against any polygon table, configured entirely by options.
///
/// Required options: `table`, `column`. Optional: `category` (content key,
/// default the table name without schema) and `source` (reference name,
/// default the table name).
pub struct GenericTagger {
    ctx: TaggerContext,
}

impl GenericTagger {
    pub fn new(ctx: TaggerContext) -> Self {
        Self { ctx }
    }
}

fn required<'a>(options: &'a TaggerOptions, key: &str) -> Result<&'a str> {
    options
        .get(key)
        .and_then(|v| v.as_str())
        .with_context(|| format!("Generic tagger requires a '{}' option", key))
}

#[async_trait]
impl Tagger for GenericTagger {
    fn name(&self) -> &str {
        "Generic"
    }

    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput> {
        let (wkt, area) = footprint_of(metadata)?;
        let table = checked_identifier(required(options, "table")?)?;
        let column = checked_identifier(required(options, "column")?)?;

        let short = table.rsplit('.').next().unwrap_or(table);
        let category = options
            .get("category")
            .and_then(|v| v.as_str())
            .unwrap_or(short);
        let source = options
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or(table);

        let classes = coverage_by_class(&self.ctx.db, table, column, wkt, area).await?;

        Ok(TaggerOutput::new()
            .with_content(category, json!(classes))
            .with_reference(table, Reference::new(source)))
    }
}
