//! Declared field types and their canonical values
//!
//! Every Rust type that can sit behind a bound scalar or value-type field
//! implements [`BoundValue`]. The impls form the type table used for kind
//! inference and compatibility checks, and convert between the field and the
//! canonical [`FieldValue`] the engines work with.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use uuid::Uuid;

use crate::types::{Attachment, Color, Location};

// ============================================================================
// Field Types
// ============================================================================

/// Shape of a declared field type, ignoring optionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    Text,
    Uuid,
    Integer32,
    Integer64,
    Float32,
    Float64,
    Decimal,
    Boolean,
    /// Date without time of day
    Date,
    /// Date with time of day, naive or zoned
    DateTime,
    /// [`Location`] or a type adapted to it
    Geolocation { custom: bool },
    /// [`Color`] or a type adapted to it
    Color { custom: bool },
    Attachment,
    /// A nested mapped type
    Object,
}

/// Declared type of a bound field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    pub shape: FieldShape,
    /// Field is `Option<_>`; absent values hydrate as `None`
    pub optional: bool,
    /// Field holds a collection of the shape
    pub collection: bool,
    /// Rust type name, for diagnostics
    pub type_name: &'static str,
}

impl FieldType {
    pub fn new(shape: FieldShape, optional: bool, type_name: &'static str) -> Self {
        Self {
            shape,
            optional,
            collection: false,
            type_name,
        }
    }

    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }
}

// ============================================================================
// Field Values
// ============================================================================

/// Canonical value read from or written to a bound field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Instant(DateTime<Utc>),
    Location(Location),
    Color(Color),
    Attachment(Attachment),
    Attachments(Vec<Attachment>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Zero-equivalent written into a required field when no value is stored
    pub fn zero(shape: FieldShape) -> Option<FieldValue> {
        match shape {
            FieldShape::Text => Some(FieldValue::Text(String::new())),
            FieldShape::Uuid => Some(FieldValue::Text(Uuid::nil().to_string())),
            FieldShape::Integer32 | FieldShape::Integer64 => Some(FieldValue::Integer(0)),
            FieldShape::Float32 | FieldShape::Float64 | FieldShape::Decimal => {
                Some(FieldValue::Real(0.0))
            }
            FieldShape::Boolean => Some(FieldValue::Boolean(false)),
            FieldShape::Date | FieldShape::DateTime => {
                Utc.timestamp_opt(0, 0).single().map(FieldValue::Instant)
            }
            FieldShape::Geolocation { .. }
            | FieldShape::Color { .. }
            | FieldShape::Attachment
            | FieldShape::Object => None,
        }
    }

    /// String form written into primary key / display / parent slots
    pub fn to_key_string(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Real(f) => Some(f.to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::Instant(d) => Some(d.to_rfc3339()),
            FieldValue::Location(l) => Some(l.to_string()),
            FieldValue::Color(c) => Some(c.to_string()),
            FieldValue::Attachment(a) => Some(a.url.clone()),
            FieldValue::Attachments(_) => None,
        }
    }

    fn mismatch(&self, expected: &str) -> String {
        format!("expected {} value, got {:?}", expected, self)
    }
}

// ============================================================================
// Bound Values
// ============================================================================

/// A Rust type that can be bound to a scalar or value-type attribute
pub trait BoundValue: Sized + Send + Sync + 'static {
    fn field_type() -> FieldType;

    fn to_field(&self) -> FieldValue;

    /// Convert a canonical value into this type; the error is the write cause
    fn from_field(value: FieldValue) -> Result<Self, String>;
}

/// Non-optional base types; `bound_scalar!` derives both `T` and `Option<T>`
trait Scalar: Sized {
    const SHAPE: FieldShape;

    fn encode(&self) -> FieldValue;

    fn decode(value: FieldValue) -> Result<Self, String>;
}

impl Scalar for String {
    const SHAPE: FieldShape = FieldShape::Text;

    fn encode(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }
}

impl Scalar for Uuid {
    const SHAPE: FieldShape = FieldShape::Uuid;

    fn encode(&self) -> FieldValue {
        FieldValue::Text(self.to_string())
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Text(s) => {
                Uuid::parse_str(&s).map_err(|e| format!("invalid uuid '{}': {}", s, e))
            }
            other => Err(other.mismatch("text")),
        }
    }
}

impl Scalar for i32 {
    const SHAPE: FieldShape = FieldShape::Integer32;

    fn encode(&self) -> FieldValue {
        FieldValue::Integer(i64::from(*self))
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Integer(i) => {
                i32::try_from(i).map_err(|_| format!("{} does not fit in i32", i))
            }
            other => Err(other.mismatch("integer")),
        }
    }
}

impl Scalar for i64 {
    const SHAPE: FieldShape = FieldShape::Integer64;

    fn encode(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Integer(i) => Ok(i),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl Scalar for f32 {
    const SHAPE: FieldShape = FieldShape::Float32;

    fn encode(&self) -> FieldValue {
        FieldValue::Real(f64::from(*self))
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            // narrowing is intentionally lossy
            FieldValue::Real(f) => Ok(f as f32),
            other => Err(other.mismatch("real")),
        }
    }
}

impl Scalar for f64 {
    const SHAPE: FieldShape = FieldShape::Float64;

    fn encode(&self) -> FieldValue {
        FieldValue::Real(*self)
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Real(f) => Ok(f),
            other => Err(other.mismatch("real")),
        }
    }
}

impl Scalar for Decimal {
    const SHAPE: FieldShape = FieldShape::Decimal;

    fn encode(&self) -> FieldValue {
        self.to_f64().map_or(FieldValue::Null, FieldValue::Real)
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Real(f) => {
                Decimal::from_f64(f).ok_or_else(|| format!("{} is not a finite decimal", f))
            }
            other => Err(other.mismatch("real")),
        }
    }
}

impl Scalar for bool {
    const SHAPE: FieldShape = FieldShape::Boolean;

    fn encode(&self) -> FieldValue {
        FieldValue::Boolean(*self)
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Boolean(b) => Ok(b),
            other => Err(other.mismatch("boolean")),
        }
    }
}

fn decode_instant(value: FieldValue) -> Result<DateTime<Utc>, String> {
    match value {
        FieldValue::Instant(d) => Ok(d),
        other => Err(other.mismatch("temporal")),
    }
}

impl Scalar for NaiveDate {
    const SHAPE: FieldShape = FieldShape::Date;

    fn encode(&self) -> FieldValue {
        match self.and_hms_opt(0, 0, 0) {
            Some(midnight) => FieldValue::Instant(Utc.from_utc_datetime(&midnight)),
            None => FieldValue::Null,
        }
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        decode_instant(value).map(|d| d.date_naive())
    }
}

impl Scalar for NaiveDateTime {
    const SHAPE: FieldShape = FieldShape::DateTime;

    fn encode(&self) -> FieldValue {
        FieldValue::Instant(Utc.from_utc_datetime(self))
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        decode_instant(value).map(|d| d.naive_utc())
    }
}

impl Scalar for DateTime<Utc> {
    const SHAPE: FieldShape = FieldShape::DateTime;

    fn encode(&self) -> FieldValue {
        FieldValue::Instant(*self)
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        decode_instant(value)
    }
}

impl Scalar for DateTime<FixedOffset> {
    const SHAPE: FieldShape = FieldShape::DateTime;

    fn encode(&self) -> FieldValue {
        FieldValue::Instant(self.with_timezone(&Utc))
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        decode_instant(value).map(|d| d.with_timezone(&Utc.fix()))
    }
}

impl Scalar for Attachment {
    const SHAPE: FieldShape = FieldShape::Attachment;

    fn encode(&self) -> FieldValue {
        FieldValue::Attachment(self.clone())
    }

    fn decode(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Attachment(a) => Ok(a),
            other => Err(other.mismatch("attachment")),
        }
    }
}

macro_rules! bound_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BoundValue for $ty {
                fn field_type() -> FieldType {
                    FieldType::new(<$ty as Scalar>::SHAPE, false, std::any::type_name::<$ty>())
                }

                fn to_field(&self) -> FieldValue {
                    Scalar::encode(self)
                }

                fn from_field(value: FieldValue) -> Result<Self, String> {
                    <$ty as Scalar>::decode(value)
                }
            }

            impl BoundValue for Option<$ty> {
                fn field_type() -> FieldType {
                    FieldType::new(<$ty as Scalar>::SHAPE, true, std::any::type_name::<Self>())
                }

                fn to_field(&self) -> FieldValue {
                    self.as_ref().map_or(FieldValue::Null, Scalar::encode)
                }

                fn from_field(value: FieldValue) -> Result<Self, String> {
                    match value {
                        FieldValue::Null => Ok(None),
                        other => <$ty as Scalar>::decode(other).map(Some),
                    }
                }
            }
        )*
    };
}

bound_scalar!(
    String,
    Uuid,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    bool,
    NaiveDate,
    NaiveDateTime,
    DateTime<Utc>,
    DateTime<FixedOffset>,
    Attachment,
);

impl BoundValue for Vec<Attachment> {
    fn field_type() -> FieldType {
        FieldType::new(FieldShape::Attachment, true, std::any::type_name::<Self>()).collection()
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Attachments(self.clone())
    }

    fn from_field(value: FieldValue) -> Result<Self, String> {
        match value {
            FieldValue::Null => Ok(Vec::new()),
            FieldValue::Attachments(a) => Ok(a),
            FieldValue::Attachment(a) => Ok(vec![a]),
            other => Err(other.mismatch("attachments")),
        }
    }
}
