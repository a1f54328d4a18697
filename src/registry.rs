//! Name → tagger factory registry.
//!
//! Taggers are looked up by the name the caller used in the request. A name
//! that is unknown, empty, or whose factory fails resolves to `None`: the
//! engine treats all three the same way and simply skips the tagger.
//!
//! Lookup is ASCII case-insensitive, so `"landcover"` and `"LandCover"`
//! resolve to the same tagger.

use anyhow::Result;
use tracing::{debug, warn};

use crate::taggers::{
    GenericTagger, GeologyTagger, HydrologyTagger, LandCoverTagger, PoliticalTagger,
    PopulationTagger,
};
use crate::traits::{Tagger, TaggerContext};

/// Builds a fresh tagger instance for one request.
pub type TaggerFactory = Box<dyn Fn(&TaggerContext) -> Result<Box<dyn Tagger>> + Send + Sync>;

/// Registry of tagger factories keyed by name.
///
/// Use [`TaggerRegistry::with_builtins`] for the six built-in taggers and
/// [`register`](TaggerRegistry::register) to add custom ones.
///
/// # Example
///
/// ```rust
/// use geotagger::registry::TaggerRegistry;
///
/// let registry = TaggerRegistry::with_builtins();
/// assert!(registry.contains("hydrology"));
/// assert!(!registry.contains("Weather"));
/// ```
pub struct TaggerRegistry {
    factories: Vec<(String, TaggerFactory)>,
}

impl TaggerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Create a registry with Generic, Geology, Hydrology, LandCover,
    /// Political and Population.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("Generic", |ctx| Ok(Box::new(GenericTagger::new(ctx.clone()))));
        registry.register("Geology", |ctx| Ok(Box::new(GeologyTagger::new(ctx.clone()))));
        registry.register("Hydrology", |ctx| {
            Ok(Box::new(HydrologyTagger::new(ctx.clone())))
        });
        registry.register("LandCover", |ctx| {
            Ok(Box::new(LandCoverTagger::new(ctx.clone())))
        });
        registry.register("Political", |ctx| {
            Ok(Box::new(PoliticalTagger::new(ctx.clone())))
        });
        registry.register("Population", |ctx| {
            Ok(Box::new(PopulationTagger::new(ctx.clone())))
        });
        registry
    }

    /// Register a factory under `name`, replacing any factory already
    /// registered under the same (case-insensitive) name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&TaggerContext) -> Result<Box<dyn Tagger>> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: TaggerFactory = Box::new(factory);
        match self
            .factories
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, factory),
            None => self.factories.push((name, factory)),
        }
    }

    /// Build a tagger for `name`, or `None` if it is not available.
    pub fn resolve(&self, name: &str, ctx: &TaggerContext) -> Option<Box<dyn Tagger>> {
        if name.trim().is_empty() {
            return None;
        }

        let Some((registered, factory)) = self
            .factories
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        else {
            debug!(tagger = name, "no tagger registered under this name");
            return None;
        };

        match factory(ctx) {
            Ok(tagger) => Some(tagger),
            Err(e) => {
                warn!(tagger = %registered, error = %e, "tagger could not be constructed");
                None
            }
        }
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

impl Default for TaggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
