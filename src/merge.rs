//! Merge policy for tagger outputs.
//!
//! Outputs are folded into the accumulator in request order. For both
//! content categories and references the rule is the same: a key that is
//! already present is replaced wholesale by the later value, a new key is
//! added. Nested values are never merged, so a later tagger owning a
//! category owns all of it.

use crate::models::{ReferenceSet, TagContent, TaggerOutput};

/// Last-writer-wins merge of `incoming` content into `acc`.
pub fn merge_content(acc: &mut TagContent, incoming: TagContent) {
    for (category, value) in incoming {
        acc.insert(category, value);
    }
}

/// Last-writer-wins merge of `incoming` references into `acc`.
pub fn merge_references(acc: &mut ReferenceSet, incoming: ReferenceSet) {
    for (source, reference) in incoming {
        acc.insert(source, reference);
    }
}

/// Running result of a tagging request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub content: TagContent,
    pub references: ReferenceSet,
}

impl Accumulator {
    /// Starts from the baseline output.
    pub fn seeded(baseline: TaggerOutput) -> Self {
        Self {
            content: baseline.content,
            references: baseline.references,
        }
    }

    pub fn absorb(&mut self, output: TaggerOutput) {
        merge_content(&mut self.content, output.content);
        merge_references(&mut self.references, output.references);
    }
}
