use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::error::TagError;
use crate::geometry::Footprint;
use crate::models::{FootprintMetadata, TaggerOptions, TaggerOutput};
use crate::traits::Tagger;

/// Geometry-only baseline: facts that need nothing but the footprint.
///
/// Unlike the other taggers it has no database dependency and its failure
/// is fatal to the request, so the engine calls [`evaluate`](Self::evaluate)
/// directly rather than going through the registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysTagger;

/// Baseline facts plus the tagger-shaped output that seeds the result.
#[derive(Debug, Clone)]
pub struct Baseline {
    /// Footprint area, km².
    pub area: f64,
    pub output: TaggerOutput,
}

impl AlwaysTagger {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, metadata: &FootprintMetadata) -> Result<Baseline, TagError> {
        let wkt = metadata
            .footprint
            .as_deref()
            .ok_or(TagError::MissingFootprint)?;
        let footprint =
            Footprint::parse(wkt).map_err(|e| TagError::InvalidGeometry(e.to_string()))?;

        let area = footprint.area_km2();
        Ok(Baseline {
            area,
            output: TaggerOutput::new().with_content("area", json!(area)),
        })
    }
}

#[async_trait]
impl Tagger for AlwaysTagger {
    fn name(&self) -> &str {
        "Always"
    }

    async fn tag(&self, metadata: &FootprintMetadata, _options: &TaggerOptions) -> Result<TaggerOutput> {
        Ok(self.evaluate(metadata)?.output)
    }
}
