//! Field kinds and the values a record slot can hold.
//!
//! `FieldKind` is the closed set of semantic types a schema field may take.
//! `Value` is the matching tagged variant. The two renderings of a value are
//! its `Display` form, used by the key/value payload, and its `Serialize` form,
//! used by the JSON payload.

use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Random v4 UUID carried as its canonical string.
    Identifier,
    /// Unsigned integer in `[0, 65536)`.
    SmallUint,
    /// Structured UUID with binary and text representations.
    Uuid,
}

/// JSON scalar a kind serializes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    String,
    Number,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Identifier, FieldKind::SmallUint, FieldKind::Uuid];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Identifier => "identifier",
            FieldKind::SmallUint => "small_uint",
            FieldKind::Uuid => "uuid",
        }
    }

    /// Value held by a freshly allocated decode slot.
    pub fn zero(&self) -> Value {
        match self {
            FieldKind::Identifier => Value::Identifier(String::new()),
            FieldKind::SmallUint => Value::SmallUint(0),
            FieldKind::Uuid => Value::Uuid(Uuid::nil()),
        }
    }

    pub fn json_shape(&self) -> JsonShape {
        match self {
            FieldKind::Identifier | FieldKind::Uuid => JsonShape::String,
            FieldKind::SmallUint => JsonShape::Number,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Identifier(String),
    SmallUint(u16),
    Uuid(Uuid),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Identifier(_) => FieldKind::Identifier,
            Value::SmallUint(_) => FieldKind::SmallUint,
            Value::Uuid(_) => FieldKind::Uuid,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Identifier(s) => f.write_str(s),
            Value::SmallUint(n) => write!(f, "{n}"),
            Value::Uuid(u) => write!(f, "{}", u.hyphenated()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Identifier(s) => serializer.serialize_str(s),
            Value::SmallUint(n) => serializer.serialize_u16(*n),
            Value::Uuid(u) => u.serialize(serializer),
        }
    }
}
