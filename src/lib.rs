//! # geotagger
//!
//! Semantic enrichment of geographic footprints.
//!
//! Given a footprint polygon (WKT) and an optional acquisition timestamp,
//! the engine computes baseline geometry facts and then asks any number of
//! named taggers to describe the footprint from reference spatial datasets
//! (land cover, hydrology, political divisions, population, geology). Their
//! outputs are merged in request order and returned together with
//! provenance for every dataset consulted.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ metadata │──▶│ AlwaysTagger │──▶│ TaggerRegistry   │──▶│  merge   │──▶ TagResult
//! │ + request│   │   (area)     │   │ resolve → tag    │   │ (LWW)    │
//! └──────────┘   └──────────────┘   └────────┬─────────┘   └──────────┘
//!                                            │
//!                                     ┌──────▼──────┐
//!                                     │  PostGIS    │
//!                                     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use geotagger::config::{DatabaseConfig, EngineConfig};
//! use geotagger::engine::Engine;
//! use geotagger::models::{FootprintMetadata, ProviderRequest};
//!
//! # async fn example(database: DatabaseConfig) -> anyhow::Result<()> {
//! let engine = Engine::connect(&database, EngineConfig::default()).await?;
//! let metadata = FootprintMetadata::new("POLYGON((1 43,2 43,2 44,1 44,1 43))")
//!     .with_timestamp("2020-01-01T00:00:00Z");
//! let request: ProviderRequest = ["LandCover", "Political"].into_iter().collect();
//! let result = engine.tag(&metadata, &request).await?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Request orchestration |
//! | [`traits`] | The [`Tagger`](traits::Tagger) extension point |
//! | [`registry`] | Name → tagger factory lookup |
//! | [`taggers`] | Baseline and built-in taggers |
//! | [`merge`] | Last-writer-wins merge policy |
//! | [`geometry`] | WKT parsing and area |
//! | [`models`] | Core data types |
//! | [`config`] | TOML configuration |
//! | [`db`] | Database handle |
//! | [`cache`] | On-disk result cache |
//! | [`server`] | HTTP API |
//! | [`error`] | Fatal error types |

pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod merge;
pub mod models;
pub mod registry;
pub mod server;
pub mod taggers;
pub mod traits;
