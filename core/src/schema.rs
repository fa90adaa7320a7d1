//! Schema types and their indexed sections.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::hit::{SchemaTypeId, SectionId, TermMatchType, TOTAL_NUM_SECTIONS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub path: String,
    pub term_match_type: TermMatchType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaTypeConfig {
    pub schema_type: String,
    #[serde(default)]
    pub properties: Vec<PropertyConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub types: Vec<SchemaTypeConfig>,
}

impl SchemaConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMetadata {
    pub id: SectionId,
    pub path: String,
    pub term_match_type: TermMatchType,
}

/// One indexable section of a concrete document.
#[derive(Debug, Clone, Copy)]
pub struct Section<'d> {
    pub id: SectionId,
    pub term_match_type: TermMatchType,
    pub content: &'d str,
}

/// Read access to schema types, as consumed by scoring.
pub trait SchemaStore {
    fn get_schema_type_id(&self, schema_type: &str) -> Result<SchemaTypeId>;
    fn get_section_metadata(&self, schema_type: &str) -> Result<&[SectionMetadata]>;
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    type_ids: HashMap<String, SchemaTypeId>,
    sections: Vec<Vec<SectionMetadata>>,
}

impl SchemaRegistry {
    /// Section ids are handed out per type in property-path order.
    pub fn new(config: &SchemaConfig) -> Result<Self> {
        let mut registry = SchemaRegistry::default();
        for type_config in &config.types {
            if registry.type_ids.contains_key(&type_config.schema_type) {
                return Err(Error::InvalidArgument(format!(
                    "schema type '{}' is defined twice",
                    type_config.schema_type
                )));
            }
            if type_config.properties.len() > TOTAL_NUM_SECTIONS {
                return Err(Error::InvalidArgument(format!(
                    "schema type '{}' has {} indexed properties, at most {TOTAL_NUM_SECTIONS} are allowed",
                    type_config.schema_type,
                    type_config.properties.len()
                )));
            }
            let mut properties: Vec<&PropertyConfig> = type_config.properties.iter().collect();
            properties.sort_by(|a, b| a.path.cmp(&b.path));
            let mut sections = Vec::with_capacity(properties.len());
            for (id, property) in properties.into_iter().enumerate() {
                if property.term_match_type == TermMatchType::Unknown {
                    return Err(Error::InvalidArgument(format!(
                        "property '{}' of '{}' needs a term match type",
                        property.path, type_config.schema_type
                    )));
                }
                if sections.iter().any(|s: &SectionMetadata| s.path == property.path) {
                    return Err(Error::InvalidArgument(format!(
                        "property '{}' of '{}' is defined twice",
                        property.path, type_config.schema_type
                    )));
                }
                sections.push(SectionMetadata {
                    id: id as SectionId,
                    path: property.path.clone(),
                    term_match_type: property.term_match_type,
                });
            }
            let type_id = SchemaTypeId::try_from(registry.sections.len())
                .map_err(|_| Error::InvalidArgument("too many schema types".to_string()))?;
            registry.type_ids.insert(type_config.schema_type.clone(), type_id);
            registry.sections.push(sections);
        }
        Ok(registry)
    }

    pub fn section_metadata_by_id(&self, schema_type_id: SchemaTypeId) -> Option<&[SectionMetadata]> {
        self.sections.get(schema_type_id as usize).map(Vec::as_slice)
    }

    /// The indexable sections `document` has content for.
    pub fn extract_sections<'d>(&self, document: &'d Document) -> Result<(SchemaTypeId, Vec<Section<'d>>)> {
        let schema_type_id = self.get_schema_type_id(&document.schema_type)?;
        let metadata = self.get_section_metadata(&document.schema_type)?;
        let sections = metadata
            .iter()
            .filter_map(|meta| {
                document.properties.get(&meta.path).map(|content| Section {
                    id: meta.id,
                    term_match_type: meta.term_match_type,
                    content: content.as_str(),
                })
            })
            .collect();
        Ok((schema_type_id, sections))
    }
}

impl SchemaStore for SchemaRegistry {
    fn get_schema_type_id(&self, schema_type: &str) -> Result<SchemaTypeId> {
        self.type_ids
            .get(schema_type)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("unknown schema type '{schema_type}'")))
    }

    fn get_section_metadata(&self, schema_type: &str) -> Result<&[SectionMetadata]> {
        let id = self.get_schema_type_id(schema_type)?;
        self.section_metadata_by_id(id)
            .ok_or_else(|| Error::Internal(format!("schema type '{schema_type}' has no section table")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn email_config() -> SchemaConfig {
        serde_json::from_str(
            r#"{"types": [{"schema_type": "Email", "properties": [
                {"path": "subject", "term_match_type": "PREFIX"},
                {"path": "body", "term_match_type": "EXACT_ONLY"}
            ]}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn sections_are_numbered_in_path_order() {
        let registry = SchemaRegistry::new(&email_config()).unwrap();
        let sections = registry.get_section_metadata("Email").unwrap();
        assert_eq!(sections[0].path, "body");
        assert_eq!(sections[0].id, 0);
        assert_eq!(sections[1].path, "subject");
        assert_eq!(sections[1].term_match_type, TermMatchType::Prefix);
    }

    #[test]
    fn unknown_type_is_not_found() {
        let registry = SchemaRegistry::new(&email_config()).unwrap();
        assert!(registry.get_schema_type_id("Message").unwrap_err().is_not_found());
    }

    #[test]
    fn rejects_duplicate_types() {
        let mut config = email_config();
        config.types.push(config.types[0].clone());
        assert!(SchemaRegistry::new(&config).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn extract_sections_skips_missing_properties() {
        let registry = SchemaRegistry::new(&email_config()).unwrap();
        let mut properties = BTreeMap::new();
        properties.insert("subject".to_string(), "hello".to_string());
        let document = Document {
            namespace: "ns".into(),
            uri: "u1".into(),
            schema_type: "Email".into(),
            properties,
        };
        let (type_id, sections) = registry.extract_sections(&document).unwrap();
        assert_eq!(type_id, 0);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, 1);
        assert_eq!(sections[0].content, "hello");
    }
}
