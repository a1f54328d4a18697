use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{
    bool_option, coverage_by_class, footprint_of, identifier_option, length_by_name, limit_option,
    names_within,
};
use crate::models::{FootprintMetadata, Reference, TaggerOptions, TaggerOutput};
use crate::traits::{Tagger, TaggerContext};

/// Tectonic plates, faults and volcanoes under the footprint.
///
/// Options: `plates_table`, `faults_table`, `volcanoes_table` (defaults under
/// `datasources.`), `faults` and `volcanoes` (default `true`) to switch the
/// secondary lookups off, `max_features` (default 20).
pub struct GeologyTagger {
    ctx: TaggerContext,
}

/// Which of the secondary lookups a request asked for.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sections {
    faults: bool,
    volcanoes: bool,
}

impl Sections {
    fn from_options(options: &TaggerOptions) -> Self {
        Self {
            faults: bool_option(options, "faults", true),
            volcanoes: bool_option(options, "volcanoes", true),
        }
    }
}

impl GeologyTagger {
    pub fn new(ctx: TaggerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tagger for GeologyTagger {
    fn name(&self) -> &str {
        "Geology"
    }

    async fn tag(&self, metadata: &FootprintMetadata, options: &TaggerOptions) -> Result<TaggerOutput> {
        let (wkt, area) = footprint_of(metadata)?;
        let max = limit_option(options, "max_features", 20);
        let db = &self.ctx.db;

        let plates_table = identifier_option(options, "plates_table", "datasources.plates")?;
        let mut geology = json!({
            "plates": coverage_by_class(db, plates_table, "name", wkt, area).await?,
        });

        let sections = Sections::from_options(options);
        if sections.faults {
            let table = identifier_option(options, "faults_table", "datasources.faults")?;
            geology["faults"] = json!(length_by_name(db, table, "type", wkt, max).await?);
        }
        if sections.volcanoes {
            let table = identifier_option(options, "volcanoes_table", "datasources.volcanoes")?;
            geology["volcanoes"] = json!(names_within(db, table, "name", wkt, max).await?);
        }

        Ok(TaggerOutput::new()
            .with_content("geology", geology)
            .with_reference(
                "geology",
                Reference::new("Tectonic plates, faults and Holocene volcanoes")
                    .attribution("USGS / Smithsonian Global Volcanism Program")
                    .url("https://www.usgs.gov"),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(v: serde_json::Value) -> Sections {
        Sections::from_options(v.as_object().unwrap())
    }

    #[test]
    fn test_all_sections_by_default() {
        assert_eq!(
            sections(json!({})),
            Sections { faults: true, volcanoes: true }
        );
    }

    #[test]
    fn test_sections_switch_off_independently() {
        assert_eq!(
            sections(json!({"faults": false})),
            Sections { faults: false, volcanoes: true }
        );
        assert_eq!(
            sections(json!({"volcanoes": false})),
            Sections { faults: true, volcanoes: false }
        );
    }

    #[test]
    fn test_non_boolean_switch_keeps_default() {
        assert_eq!(
            sections(json!({"faults": "no"})),
            Sections { faults: true, volcanoes: true }
        );
    }
}
