//! Per schema type, per section scoring weights normalized against the
//! largest weight of the type.

use crate::error::{Error, Result};
use crate::hit::{SchemaTypeId, SectionId};
use crate::schema::{SchemaStore, SectionMetadata};
use crate::search_spec::ScoringSpec;
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_SECTION_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
struct NormalizedSectionWeights {
    section_weights: HashMap<SectionId, f64>,
    default_weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SectionWeights {
    schema_type_weights: HashMap<SchemaTypeId, NormalizedSectionWeights>,
}

impl SectionWeights {
    pub fn create(schema_store: Option<&dyn SchemaStore>, scoring_spec: &ScoringSpec) -> Result<Self> {
        let schema_store = schema_store
            .ok_or_else(|| Error::FailedPrecondition("schema store must not be null".to_string()))?;

        let mut schema_type_weights = HashMap::new();
        for type_property_weights in &scoring_spec.type_property_weights {
            let schema_type = type_property_weights.schema_type.as_str();
            let schema_type_id = match schema_store.get_schema_type_id(schema_type) {
                Ok(id) => id,
                Err(e) => {
                    warn!(schema_type, error = %e, "no schema type id found, skipping its property weights");
                    continue;
                }
            };
            let metadata = match schema_store.get_section_metadata(schema_type) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(schema_type, error = %e, "no section metadata found, skipping its property weights");
                    continue;
                }
            };

            let mut property_path_weights: HashMap<&str, f64> = HashMap::new();
            for property_weight in &type_property_weights.property_weights {
                if !(property_weight.weight >= 0.0 && property_weight.weight.is_finite()) {
                    return Err(Error::InvalidArgument(format!(
                        "property weight for '{}' of '{schema_type}' must be finite and non-negative: {}",
                        property_weight.path, property_weight.weight
                    )));
                }
                property_path_weights.insert(property_weight.path.as_str(), property_weight.weight);
            }
            schema_type_weights.insert(
                schema_type_id,
                normalize_section_weights(metadata, &property_path_weights),
            );
        }
        Ok(SectionWeights { schema_type_weights })
    }

    pub fn get_normalized_section_weight(&self, schema_type_id: SchemaTypeId, section_id: SectionId) -> f64 {
        match self.schema_type_weights.get(&schema_type_id) {
            Some(weights) => weights
                .section_weights
                .get(&section_id)
                .copied()
                .unwrap_or(weights.default_weight),
            None => DEFAULT_SECTION_WEIGHT,
        }
    }
}

// Paths in `property_path_weights` that name no section are ignored.
fn normalize_section_weights(
    metadata: &[SectionMetadata],
    property_path_weights: &HashMap<&str, f64>,
) -> NormalizedSectionWeights {
    let mut section_weights = HashMap::with_capacity(metadata.len());
    let mut max_weight: Option<f64> = None;
    for section in metadata {
        let weight = property_path_weights
            .get(section.path.as_str())
            .copied()
            .unwrap_or(DEFAULT_SECTION_WEIGHT);
        section_weights.insert(section.id, weight);
        max_weight = Some(max_weight.map_or(weight, |max| max.max(weight)));
    }

    let default_weight = match max_weight {
        None => DEFAULT_SECTION_WEIGHT,
        Some(max) if max == 0.0 => 0.0,
        Some(max) => {
            for weight in section_weights.values_mut() {
                *weight /= max;
            }
            DEFAULT_SECTION_WEIGHT / max
        }
    };
    NormalizedSectionWeights {
        section_weights,
        default_weight,
    }
}
