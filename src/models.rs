//! Core data models that flow through the tagging pipeline.
//!
//! A request starts as [`FootprintMetadata`] plus a [`ProviderRequest`] and
//! leaves the engine as a [`TagResult`]. In between, every tagger produces a
//! [`TaggerOutput`] that the merge policy folds into the accumulator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category name → tag value. Shapes are owned by the tagger that emits them.
pub type TagContent = BTreeMap<String, Value>;

/// Data-source identifier → provenance.
pub type ReferenceSet = BTreeMap<String, Reference>;

/// Opaque per-tagger options record.
pub type TaggerOptions = serde_json::Map<String, Value>;

/// The footprint being tagged, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintMetadata {
    /// Polygon or multipolygon in WKT (EPSG:4326, lon/lat order).
    #[serde(default)]
    pub footprint: Option<String>,
    /// Acquisition instant, ISO-8601. Passed through untouched.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Footprint area in km². Filled in by the baseline evaluator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
}

impl FootprintMetadata {
    pub fn new(footprint: impl Into<String>) -> Self {
        Self {
            footprint: Some(footprint.into()),
            timestamp: None,
            area: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Provenance for one data source a tagger consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            attribution: None,
            url: None,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// What a single tagger hands back to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggerOutput {
    pub content: TagContent,
    pub references: ReferenceSet,
}

impl TaggerOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a content category, replacing any previous value.
    pub fn with_content(mut self, category: impl Into<String>, value: Value) -> Self {
        self.content.insert(category.into(), value);
        self
    }

    /// Records provenance for a data source, replacing any previous entry.
    pub fn with_reference(mut self, key: impl Into<String>, reference: Reference) -> Self {
        self.references.insert(key.into(), reference);
        self
    }
}

/// Final result of a tagging request.
///
/// `footprint` and `timestamp` are echoed from the caller's input; a missing
/// timestamp serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagResult {
    pub footprint: String,
    pub timestamp: Option<String>,
    pub content: TagContent,
    pub references: ReferenceSet,
}

/// A single `name → options` entry of a [`ProviderRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    #[serde(default)]
    pub options: TaggerOptions,
}

/// Ordered mapping from tagger name to its options.
///
/// Order is significant: it is the merge precedence. Inserting a name that is
/// already present replaces its options in place, keeping the original
/// position. Serializes as a list of `{name, options}` entries so the order
/// survives JSON round trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ProviderEntry>", into = "Vec<ProviderEntry>")]
pub struct ProviderRequest {
    entries: Vec<ProviderEntry>,
}

impl ProviderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, options: TaggerOptions) -> Self {
        self.insert(name, options);
        self
    }

    /// Adds a tagger, or replaces the options of one already requested.
    pub fn insert(&mut self, name: impl Into<String>, options: TaggerOptions) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.options = options,
            None => self.entries.push(ProviderEntry { name, options }),
        }
    }

    /// Mutable access to the options of a requested tagger.
    pub fn options_mut(&mut self, name: &str) -> Option<&mut TaggerOptions> {
        self.entries
            .iter_mut()
            .find(|e| e.name == name)
            .map(|e| &mut e.options)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaggerOptions)> {
        self.entries.iter().map(|e| (e.name.as_str(), &e.options))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ProviderEntry>> for ProviderRequest {
    fn from(entries: Vec<ProviderEntry>) -> Self {
        let mut request = Self::new();
        for entry in entries {
            request.insert(entry.name, entry.options);
        }
        request
    }
}

impl From<ProviderRequest> for Vec<ProviderEntry> {
    fn from(request: ProviderRequest) -> Self {
        request.entries
    }
}

impl<S: Into<String>> FromIterator<S> for ProviderRequest {
    /// Requests each named tagger with empty options.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut request = Self::new();
        for name in iter {
            request.insert(name, TaggerOptions::new());
        }
        request
    }
}
