//! The tagging engine.
//!
//! [`Engine::tag`] runs one enrichment request:
//!
//! ```text
//! metadata ──▶ AlwaysTagger (area) ──▶ for each requested name, in order:
//!                                        resolve ─▶ tag ─▶ merge
//!                                                    │
//!                          unknown / failed / timed out / panicked: skipped
//! ```
//!
//! Taggers run one after another; the request order is the merge order.
//! Only a missing or malformed footprint fails the request. Whatever goes
//! wrong inside a single tagger is logged and that tagger contributes
//! nothing.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::config::{DatabaseConfig, EngineConfig};
use crate::db::{self, DatabaseHandle};
use crate::error::{Result, TagError};
use crate::merge::Accumulator;
use crate::models::{FootprintMetadata, ProviderRequest, TagResult, TaggerOptions, TaggerOutput};
use crate::registry::TaggerRegistry;
use crate::taggers::AlwaysTagger;
use crate::traits::{Tagger, TaggerContext};

/// A tag result together with the taggers that contributed nothing because
/// they failed at run time.
#[derive(Debug, Clone)]
pub struct TagReport {
    pub result: TagResult,
    pub failed: Vec<String>,
}

impl TagReport {
    /// Every resolved tagger contributed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the database handle, the configuration and the tagger registry.
///
/// One engine can serve any number of concurrent requests: the handle is a
/// connection pool and the configuration is immutable.
pub struct Engine {
    db: DatabaseHandle,
    config: Arc<EngineConfig>,
    registry: TaggerRegistry,
    baseline: AlwaysTagger,
}

impl Engine {
    /// Engine over an existing database handle, with the built-in taggers.
    pub fn new(db: DatabaseHandle, config: EngineConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            registry: TaggerRegistry::with_builtins(),
            baseline: AlwaysTagger::new(),
        }
    }

    /// Connects to the database, then builds the engine.
    ///
    /// Fails with [`TagError::DatabaseConnection`] if no connection can be made.
    pub async fn connect(database: &DatabaseConfig, config: EngineConfig) -> Result<Self> {
        let db = db::connect(database).await?;
        Ok(Self::new(db, config))
    }

    /// Replaces the tagger registry.
    pub fn with_registry(mut self, registry: TaggerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &TaggerRegistry {
        &self.registry
    }

    pub fn database(&self) -> &DatabaseHandle {
        &self.db
    }

    /// Tags a footprint with the baseline plus every requested tagger.
    ///
    /// The caller's metadata is not modified; taggers see a copy with
    /// `area` filled in. The returned footprint and timestamp are the
    /// caller's, untouched.
    pub async fn tag(
        &self,
        metadata: &FootprintMetadata,
        request: &ProviderRequest,
    ) -> Result<TagResult> {
        Ok(self.tag_with_report(metadata, request).await?.result)
    }

    /// Like [`Engine::tag`], but also names the taggers that were resolved
    /// and then failed, timed out or panicked.
    pub async fn tag_with_report(
        &self,
        metadata: &FootprintMetadata,
        request: &ProviderRequest,
    ) -> Result<TagReport> {
        let footprint = metadata
            .footprint
            .clone()
            .ok_or(TagError::MissingFootprint)?;

        let baseline = self.baseline.evaluate(metadata)?;
        let mut working = metadata.clone();
        working.area = Some(baseline.area);

        let mut acc = Accumulator::seeded(baseline.output);
        let mut failed = Vec::new();
        let ctx = TaggerContext::new(self.db.clone(), self.config.clone());

        for (name, request_options) in request.iter() {
            let Some(tagger) = self.registry.resolve(name, &ctx) else {
                debug!(tagger = name, "tagger not available, skipping");
                continue;
            };
            let options = self.config.options_for(tagger.name(), request_options);
            match self.invoke(tagger.as_ref(), &working, &options).await {
                Some(output) => acc.absorb(output),
                None => failed.push(tagger.name().to_string()),
            }
        }

        Ok(TagReport {
            result: TagResult {
                footprint,
                timestamp: metadata.timestamp.clone(),
                content: acc.content,
                references: acc.references,
            },
            failed,
        })
    }

    /// Runs one tagger, turning every kind of failure into `None`.
    async fn invoke(
        &self,
        tagger: &dyn Tagger,
        metadata: &FootprintMetadata,
        options: &TaggerOptions,
    ) -> Option<TaggerOutput> {
        let call = AssertUnwindSafe(tagger.tag(metadata, options)).catch_unwind();

        let outcome = match self.config.provider_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(tagger = tagger.name(), timeout = ?limit, "tagger timed out, skipping");
                    return None;
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(output)) => Some(output),
            Ok(Err(e)) => {
                warn!(tagger = tagger.name(), error = %format!("{:#}", e), "tagger failed, skipping");
                None
            }
            Err(_) => {
                warn!(tagger = tagger.name(), "tagger panicked, skipping");
                None
            }
        }
    }
}
