//! Core type definitions for the object mapper
//!
//! Includes attribute kinds, attribute metadata, CRUD status, and the
//! canonical value types (location, color, attachment).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::RecordSchema;

// ============================================================================
// Attribute Kinds
// ============================================================================

/// Declared kind of the value stored at a record index
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Free text
    Text,

    /// Whole number, stored as a 64-bit integer
    Integer,

    /// Real number, stored as a 64-bit float
    Real,

    Boolean,

    /// Calendar date, stored as a UTC instant
    Date,

    /// Date with time of day, stored as a UTC instant
    #[serde(rename = "datetime")]
    DateTime,

    /// Value-typed sub-record without identity
    #[serde(rename = "embedded")]
    EmbeddedValue,

    /// One nested identity-bearing item
    #[serde(rename = "relation")]
    SingleRelation,

    /// Ordered list of nested identity-bearing items
    #[serde(rename = "relations")]
    MultiRelation,

    /// One or more (url, mime type, title) attachments
    #[serde(rename = "attachments")]
    AttachmentSet,

    #[serde(rename = "location")]
    Geolocation,

    Color,
}

impl AttributeKind {
    /// Whether values of this kind are nested records
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            AttributeKind::EmbeddedValue
                | AttributeKind::SingleRelation
                | AttributeKind::MultiRelation
        )
    }

    /// Whether values of this kind are plain scalars subject to the nullability policy
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            AttributeKind::Text
                | AttributeKind::Integer
                | AttributeKind::Real
                | AttributeKind::Boolean
                | AttributeKind::Date
                | AttributeKind::DateTime
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Text => "text",
            AttributeKind::Integer => "integer",
            AttributeKind::Real => "real",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Date => "date",
            AttributeKind::DateTime => "datetime",
            AttributeKind::EmbeddedValue => "embedded",
            AttributeKind::SingleRelation => "relation",
            AttributeKind::MultiRelation => "relations",
            AttributeKind::AttachmentSet => "attachments",
            AttributeKind::Geolocation => "location",
            AttributeKind::Color => "color",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Attribute Metadata
// ============================================================================

/// Metadata for one schema position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeMeta {
    /// Schema position, unique within a schema
    pub index: u32,

    /// Declared kind of the stored value
    #[serde(rename = "type")]
    pub kind: AttributeKind,

    /// Optional human-readable attribute name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Schema of child records for nested kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<Arc<RecordSchema>>,
}

impl AttributeMeta {
    /// Create metadata for an index with a kind
    pub fn new(index: u32, kind: AttributeKind) -> Self {
        Self {
            index,
            kind,
            name: None,
            related: None,
        }
    }

    /// Set the attribute name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the schema used for child records of a nested kind
    pub fn related(mut self, schema: impl Into<Arc<RecordSchema>>) -> Self {
        self.related = Some(schema.into());
        self
    }
}

// ============================================================================
// CRUD Status
// ============================================================================

/// Lifecycle status carried by item records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CrudStatus {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

// ============================================================================
// Canonical Value Types
// ============================================================================

/// Geographic position with optional motion data
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub bearing: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// RGBA color
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// File attachment reference
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub title: String,
}

impl Attachment {
    pub fn new(
        url: impl Into<String>,
        mime_type: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
            title: title.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // AttributeKind Tests
    // =========================================================================

    #[test]
    fn test_kind_classification() {
        assert!(AttributeKind::MultiRelation.is_nested());
        assert!(AttributeKind::EmbeddedValue.is_nested());
        assert!(!AttributeKind::Color.is_nested());
        assert!(AttributeKind::DateTime.is_scalar());
        assert!(!AttributeKind::AttachmentSet.is_scalar());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&AttributeKind::Geolocation).unwrap();
        assert_eq!(json, r#""location""#);
        let json = serde_json::to_string(&AttributeKind::DateTime).unwrap();
        assert_eq!(json, r#""datetime""#);
    }

    #[test]
    fn test_kind_display_matches_serialized_name() {
        for kind in [
            AttributeKind::Text,
            AttributeKind::SingleRelation,
            AttributeKind::AttachmentSet,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    // =========================================================================
    // AttributeMeta Tests
    // =========================================================================

    #[test]
    fn test_attribute_meta_serialization() {
        let meta = AttributeMeta::new(4, AttributeKind::Integer).named("count");
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"index\":4"));
        assert!(json.contains("\"type\":\"integer\""));
        assert!(json.contains("\"name\":\"count\""));
        assert!(!json.contains("related"));
    }

    #[test]
    fn test_attribute_meta_deserialization() {
        let json = r#"{"index":2,"type":"relations"}"#;
        let meta: AttributeMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.index, 2);
        assert_eq!(meta.kind, AttributeKind::MultiRelation);
        assert!(meta.name.is_none());
    }

    // =========================================================================
    // Value Type Tests
    // =========================================================================

    #[test]
    fn test_color_display_is_hex() {
        assert_eq!(Color::rgba(255, 0, 16, 128).to_string(), "#ff001080");
        assert_eq!(Color::rgb(1, 2, 3).a, 255);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new(45.5, -122.25).to_string(), "45.5,-122.25");
    }

    #[test]
    fn test_attachment_serialization() {
        let attachment = Attachment::new("https://files/a.png", "image/png", "Logo");
        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("\"mimeType\":\"image/png\""));
    }
}
