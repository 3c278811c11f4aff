//! Value-type adapters
//!
//! [`Location`] and [`Color`] are the canonical geographic and color value
//! types. Application types that can convert to and from one of them
//! implement [`ValueAdapter`] and bind like any other value field.

use crate::field::{BoundValue, FieldShape, FieldType, FieldValue};
use crate::types::{AttributeKind, Color, Location};

/// Canonical value type that adapters convert through
pub trait CanonicalValue: Clone + Send + Sync + 'static {
    const KIND: AttributeKind;

    fn shape(custom: bool) -> FieldShape;

    fn into_field(self) -> FieldValue;

    fn from_field(value: FieldValue) -> Result<Self, String>;
}

impl CanonicalValue for Location {
    const KIND: AttributeKind = AttributeKind::Geolocation;

    fn shape(custom: bool) -> FieldShape {
        FieldShape::Geolocation { custom }
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Location(self)
    }

    fn from_field(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Location(l) => Ok(l),
            other => Err(format!("expected location value, got {:?}", other)),
        }
    }
}

impl CanonicalValue for Color {
    const KIND: AttributeKind = AttributeKind::Color;

    fn shape(custom: bool) -> FieldShape {
        FieldShape::Color { custom }
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Color(self)
    }

    fn from_field(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Color(c) => Ok(c),
            other => Err(format!("expected color value, got {:?}", other)),
        }
    }
}

/// Capability of a type to convert to and from a canonical value type
///
/// ```
/// use runtara_object_mapper::{Location, ValueAdapter};
///
/// #[derive(Default)]
/// struct Pin {
///     lat: f64,
///     lng: f64,
/// }
///
/// impl ValueAdapter for Pin {
///     type Canonical = Location;
///
///     fn to_canonical(&self) -> Location {
///         Location::new(self.lat, self.lng)
///     }
///
///     fn from_canonical(location: Location) -> Self {
///         Pin { lat: location.latitude, lng: location.longitude }
///     }
/// }
/// ```
pub trait ValueAdapter: Sized + Send + Sync + 'static {
    type Canonical: CanonicalValue;

    /// False only for the canonical types themselves
    const CUSTOM: bool = true;

    /// Produce a fresh canonical value; components are copied, never shared
    fn to_canonical(&self) -> Self::Canonical;

    fn from_canonical(value: Self::Canonical) -> Self;
}

impl ValueAdapter for Location {
    type Canonical = Location;
    const CUSTOM: bool = false;

    fn to_canonical(&self) -> Location {
        self.clone()
    }

    fn from_canonical(value: Location) -> Self {
        value
    }
}

impl ValueAdapter for Color {
    type Canonical = Color;
    const CUSTOM: bool = false;

    fn to_canonical(&self) -> Color {
        *self
    }

    fn from_canonical(value: Color) -> Self {
        value
    }
}

impl<V: ValueAdapter> BoundValue for V {
    fn field_type() -> FieldType {
        FieldType::new(
            V::Canonical::shape(V::CUSTOM),
            false,
            std::any::type_name::<V>(),
        )
    }

    fn to_field(&self) -> FieldValue {
        self.to_canonical().into_field()
    }

    fn from_field(value: FieldValue) -> Result<Self, String> {
        V::Canonical::from_field(value).map(V::from_canonical)
    }
}

impl<V: ValueAdapter> BoundValue for Option<V> {
    fn field_type() -> FieldType {
        FieldType::new(
            V::Canonical::shape(V::CUSTOM),
            true,
            std::any::type_name::<Self>(),
        )
    }

    fn to_field(&self) -> FieldValue {
        self.as_ref()
            .map_or(FieldValue::Null, |v| v.to_canonical().into_field())
    }

    fn from_field(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Null => Ok(None),
            other => V::Canonical::from_field(other).map(|c| Some(V::from_canonical(c))),
        }
    }
}
