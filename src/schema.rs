//! Schema-related types for the object mapper
//!
//! Includes RecordSchema, the SchemaProvider seam, and an in-memory SchemaRegistry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result};
use crate::types::{AttributeKind, AttributeMeta};

/// Ordered attribute metadata describing one logical record type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordSchema {
    /// Logical type name of records using this schema
    pub name: String,
    /// Attribute metadata, ordered by declaration
    pub attributes: Vec<AttributeMeta>,
}

impl RecordSchema {
    /// Create a new schema with the given attributes
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeMeta>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Create a schema without explicit metadata; every kind is inferred
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Append an attribute
    pub fn with_attribute(mut self, attribute: AttributeMeta) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Append an attribute by index and kind
    pub fn with(self, index: u32, kind: AttributeKind) -> Self {
        self.with_attribute(AttributeMeta::new(index, kind))
    }

    /// Append a nested attribute whose child records use `related`
    pub fn with_related(
        self,
        index: u32,
        kind: AttributeKind,
        related: impl Into<Arc<RecordSchema>>,
    ) -> Self {
        self.with_attribute(AttributeMeta::new(index, kind).related(related))
    }

    /// Metadata for an index, if declared
    pub fn attribute(&self, index: u32) -> Option<&AttributeMeta> {
        self.attributes.iter().find(|a| a.index == index)
    }

    /// Schema for child records stored at `index`
    ///
    /// Falls back to an empty schema named after the parent and index, so
    /// nested conversions infer every kind.
    pub fn child_schema(&self, index: u32) -> Arc<RecordSchema> {
        self.attribute(index)
            .and_then(|a| a.related.clone())
            .unwrap_or_else(|| {
                Arc::new(RecordSchema::empty(format!("{}.{}", self.name, index)))
            })
    }

    /// Check that every index is declared at most once, recursively
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for attribute in &self.attributes {
            if !seen.insert(attribute.index) {
                return Err(MappingError::validation(format!(
                    "Schema '{}' declares index {} more than once",
                    self.name, attribute.index
                )));
            }
            if let Some(related) = &attribute.related {
                if !attribute.kind.is_nested() {
                    return Err(MappingError::validation(format!(
                        "Schema '{}' index {} has a related schema but kind {}",
                        self.name, attribute.index, attribute.kind
                    )));
                }
                related.validate()?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Schema Provider
// ============================================================================

/// Supplies attribute schemas by logical record type name
pub trait SchemaProvider {
    fn schema_for(&self, name: &str) -> Option<Arc<RecordSchema>>;
}

/// In-memory schema provider
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<RecordSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a schema under its name
    ///
    /// Registering a name twice is a conflict.
    pub fn register(&mut self, schema: RecordSchema) -> Result<Arc<RecordSchema>> {
        schema.validate()?;
        if self.schemas.contains_key(&schema.name) {
            return Err(MappingError::validation(format!(
                "Schema '{}' already registered",
                schema.name
            )));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.name.clone(), schema.clone());
        Ok(schema)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaProvider for SchemaRegistry {
    fn schema_for(&self, name: &str) -> Option<Arc<RecordSchema>> {
        self.schemas.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_schema() -> RecordSchema {
        RecordSchema::new("Contact", vec![])
            .with(0, AttributeKind::Text)
            .with(1, AttributeKind::Integer)
    }

    // =========================================================================
    // RecordSchema Tests
    // =========================================================================

    #[test]
    fn test_schema_builder() {
        let schema = RecordSchema::empty("Organization")
            .with(0, AttributeKind::Text)
            .with_related(2, AttributeKind::MultiRelation, contact_schema());

        assert_eq!(schema.name, "Organization");
        assert_eq!(schema.attributes.len(), 2);
        assert_eq!(
            schema.attribute(2).map(|a| a.kind),
            Some(AttributeKind::MultiRelation)
        );
        assert!(schema.attribute(7).is_none());
    }

    #[test]
    fn test_child_schema_uses_related() {
        let schema = RecordSchema::empty("Organization")
            .with_related(2, AttributeKind::MultiRelation, contact_schema());
        assert_eq!(schema.child_schema(2).name, "Contact");
    }

    #[test]
    fn test_child_schema_falls_back_to_empty() {
        let schema = RecordSchema::empty("Organization");
        let child = schema.child_schema(5);
        assert_eq!(child.name, "Organization.5");
        assert!(child.attributes.is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_index() {
        let schema = RecordSchema::empty("Broken")
            .with(1, AttributeKind::Text)
            .with(1, AttributeKind::Integer);
        let result = schema.validate();
        assert!(matches!(result, Err(MappingError::Validation(_))));
    }

    #[test]
    fn test_validate_checks_related_schemas() {
        let nested = RecordSchema::empty("Nested")
            .with(0, AttributeKind::Text)
            .with(0, AttributeKind::Text);
        let schema = RecordSchema::empty("Outer")
            .with_related(3, AttributeKind::SingleRelation, nested);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_related_on_scalar() {
        let related = contact_schema();
        let meta = AttributeMeta::new(0, AttributeKind::Text).related(related);
        let schema = RecordSchema::empty("Outer").with_attribute(meta);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_schema_serialization() {
        let json = serde_json::to_string(&contact_schema()).unwrap();
        assert!(json.contains("\"name\":\"Contact\""));
        assert!(json.contains("\"type\":\"integer\""));
    }

    // =========================================================================
    // SchemaRegistry Tests
    // =========================================================================

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = SchemaRegistry::new();
        registry.register(contact_schema()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.schema_for("Contact").is_some());
        assert!(registry.schema_for("Missing").is_none());
    }

    #[test]
    fn test_registry_rejects_duplicate_name() {
        let mut registry = SchemaRegistry::new();
        registry.register(contact_schema()).unwrap();
        assert!(registry.register(contact_schema()).is_err());
    }
}
