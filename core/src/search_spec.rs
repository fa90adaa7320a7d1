//! Request objects handed to the query side.

use crate::hit::TermMatchType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyWeight {
    pub path: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePropertyWeights {
    pub schema_type: String,
    #[serde(default)]
    pub property_weights: Vec<PropertyWeight>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringSpec {
    #[serde(default)]
    pub scoring_match_type: TermMatchType,
    #[serde(default)]
    pub type_property_weights: Vec<TypePropertyWeights>,
}

impl ScoringSpec {
    pub fn with_match_type(scoring_match_type: TermMatchType) -> Self {
        ScoringSpec {
            scoring_match_type,
            type_property_weights: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSpec {
    pub prefix: String,
    pub num_to_return: i32,
    #[serde(default)]
    pub scoring_spec: ScoringSpec,
}

impl SuggestionSpec {
    pub fn new(prefix: impl Into<String>, num_to_return: i32, scoring_match_type: TermMatchType) -> Self {
        SuggestionSpec {
            prefix: prefix.into(),
            num_to_return,
            scoring_spec: ScoringSpec::with_match_type(scoring_match_type),
        }
    }
}
