#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use geotagger::config::{DatabaseConfig, EngineConfig};
use geotagger::db::DatabaseHandle;
use geotagger::engine::Engine;
use geotagger::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
use geotagger::registry::TaggerRegistry;
use geotagger::traits::Tagger;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SQUARE: &str = "POLYGON((1 43,2 43,2 44,1 44,1 43))";

/// Handle to a database that is never contacted: connections are only
/// opened on first use and none of the test taggers touch the pool.
pub fn unused_database() -> DatabaseHandle {
    DatabaseHandle::lazy(&DatabaseConfig {
        dbname: "geotagger_test".into(),
        user: "nobody".into(),
        password: String::new(),
        host: Some("127.0.0.1".into()),
        port: Some(1),
        socket_dir: PathBuf::from("/tmp"),
        max_connections: 1,
        connect_timeout_secs: 1,
    })
}

pub fn engine_with(registry: TaggerRegistry, config: EngineConfig) -> Engine {
    Engine::new(unused_database(), config).with_registry(registry)
}

// ─── Test taggers ───────────────────────────────────────────────────

/// Returns a fixed output.
pub struct StaticTagger {
    pub name: &'static str,
    pub output: TaggerOutput,
}

#[async_trait]
impl Tagger for StaticTagger {
    fn name(&self) -> &str {
        self.name
    }

    async fn tag(&self, _: &FootprintMetadata, _: &TaggerOptions) -> Result<TaggerOutput> {
        Ok(self.output.clone())
    }
}

pub fn register_static(registry: &mut TaggerRegistry, name: &'static str, output: TaggerOutput) {
    registry.register(name, move |_| {
        Ok(Box::new(StaticTagger {
            name,
            output: output.clone(),
        }))
    });
}

/// Emits `{key: value}` plus a reference under `source`.
pub fn emits(key: &str, value: Value, source: &str, reference_name: &str) -> TaggerOutput {
    TaggerOutput::new()
        .with_content(key, value)
        .with_reference(source, Reference::new(reference_name))
}

pub struct FailingTagger;

#[async_trait]
impl Tagger for FailingTagger {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn tag(&self, _: &FootprintMetadata, _: &TaggerOptions) -> Result<TaggerOutput> {
        anyhow::bail!("relation \"datasources.nothing\" does not exist")
    }
}

pub struct PanickingTagger;

#[async_trait]
impl Tagger for PanickingTagger {
    fn name(&self) -> &str {
        "Panicking"
    }

    async fn tag(&self, _: &FootprintMetadata, _: &TaggerOptions) -> Result<TaggerOutput> {
        panic!("tagger bug")
    }
}

pub struct SlowTagger;

#[async_trait]
impl Tagger for SlowTagger {
    fn name(&self) -> &str {
        "Slow"
    }

    async fn tag(&self, _: &FootprintMetadata, _: &TaggerOptions) -> Result<TaggerOutput> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(TaggerOutput::new().with_content("slow", Value::Bool(true)))
    }
}

/// What a recording tagger observed when it was called.
#[derive(Default, Debug, Clone)]
pub struct Observed {
    pub area: Option<f64>,
    pub options: Option<TaggerOptions>,
    pub area_limit: Option<f64>,
}

/// Records the metadata area, options and config it was called with.
pub struct RecordingTagger {
    pub seen: Arc<Mutex<Observed>>,
    pub area_limit: f64,
}

#[async_trait]
impl Tagger for RecordingTagger {
    fn name(&self) -> &str {
        "Recorder"
    }

    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput> {
        let mut seen = self.seen.lock().unwrap();
        seen.area = metadata.area;
        seen.options = Some(options.clone());
        seen.area_limit = Some(self.area_limit);
        Ok(TaggerOutput::new())
    }
}
