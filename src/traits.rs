//! The tagger extension point.
//!
//! Every enrichment provider, built-in or custom, implements [`Tagger`] and
//! is made available to the engine through a factory registered in the
//! [`TaggerRegistry`](crate::registry::TaggerRegistry).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                TaggerRegistry                │
//! │  ┌────────────┐ ┌────────────┐ ┌───────────┐ │
//! │  │ LandCover  │ │ Political  │ │  Custom   │ │
//! │  │ Hydrology… │ │ Population │ │  (Rust)   │ │
//! │  └────────────┘ └────────────┘ └───────────┘ │
//! └──────────────┬───────────────────────────────┘
//!                ▼  factory(&TaggerContext)
//!          Box<dyn Tagger> ──▶ Engine::tag()
//! ```
//!
//! # Example
//!
//! ```rust
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use geotagger::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
//! use geotagger::traits::{Tagger, TaggerContext};
//! use serde_json::json;
//!
//! pub struct SoilTagger {
//!     ctx: TaggerContext,
//! }
//!
//! #[async_trait]
//! impl Tagger for SoilTagger {
//!     fn name(&self) -> &str { "Soil" }
//!
//!     async fn tag(&self, metadata: &FootprintMetadata, _options: &TaggerOptions) -> Result<TaggerOutput> {
//!         // ... query self.ctx.db.pool() ...
//!         Ok(TaggerOutput::new()
//!             .with_content("soil", json!({ "area": metadata.area }))
//!             .with_reference("soilgrids", Reference::new("SoilGrids")))
//!     }
//! }
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::db::DatabaseHandle;
use crate::models::{FootprintMetadata, TaggerOptions, TaggerOutput};

/// An enrichment provider that derives tags for a footprint from one
/// reference dataset.
///
/// # Lifecycle
///
/// 1. A factory builds the tagger from a [`TaggerContext`]. Construction must
///    be cheap and must not perform I/O.
/// 2. [`tag`](Tagger::tag) is called once, with the working metadata (area
///    already filled in) and the effective options for this tagger.
/// 3. The instance is dropped at the end of the request.
///
/// Any error returned from `tag` is logged by the engine and the tagger's
/// contribution is dropped; it never fails the request.
#[async_trait]
pub trait Tagger: Send + Sync {
    /// Canonical tagger name (e.g. `"LandCover"`).
    fn name(&self) -> &str;

    /// Analyse the footprint and return content plus provenance.
    ///
    /// `options` already include the configured defaults for this tagger,
    /// overlaid by whatever the caller passed in the request.
    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput>;
}

/// What every tagger receives at construction: the shared database handle
/// and the engine configuration. Both are shared, never owned.
#[derive(Clone, Debug)]
pub struct TaggerContext {
    pub db: DatabaseHandle,
    pub config: Arc<EngineConfig>,
}

impl TaggerContext {
    pub fn new(db: DatabaseHandle, config: Arc<EngineConfig>) -> Self {
        Self { db, config }
    }
}
