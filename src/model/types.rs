use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Upper bound for `string`/`vector` sizes
pub const MAX_SIZE: u32 = 65536;

static PRIMITIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(string|integer +long|integer|float|boolean|vector)$")
        .expect("primitive type regex is valid")
});

// "string [10]", "vector[3]", "integer"
static TYPE_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.*?)\s*(?:\[\s*(\d+)\s*\])?\s*$").expect("type spec regex is valid")
});

/// Built-in attribute types
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PrimitiveType {
    String,
    Integer,
    IntegerLong,
    Float,
    Boolean,
    Vector,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 6] = [
        PrimitiveType::String,
        PrimitiveType::Integer,
        PrimitiveType::IntegerLong,
        PrimitiveType::Float,
        PrimitiveType::Boolean,
        PrimitiveType::Vector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::IntegerLong => "integer long",
            PrimitiveType::Float => "float",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Vector => "vector",
        }
    }

    /// `string` and `vector` carry a size
    pub fn requires_size(&self) -> bool {
        matches!(self, PrimitiveType::String | PrimitiveType::Vector)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Integer | PrimitiveType::IntegerLong | PrimitiveType::Float
        )
    }

    /// Parse a primitive keyword, case-insensitively
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !PRIMITIVE_RE.is_match(raw) {
            return None;
        }
        let lowered = raw.to_ascii_lowercase();
        Some(match lowered.as_str() {
            "string" => PrimitiveType::String,
            "integer" => PrimitiveType::Integer,
            "float" => PrimitiveType::Float,
            "boolean" => PrimitiveType::Boolean,
            "vector" => PrimitiveType::Vector,
            _ => PrimitiveType::IntegerLong,
        })
    }

    /// True when `name` collides with a primitive keyword
    pub fn is_reserved(name: &str) -> bool {
        Self::parse(name).is_some()
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a stream attribute or of a field produced by a query node
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum AttributeType {
    Primitive(PrimitiveType),
    Enum(String),
}

impl AttributeType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, AttributeType::Primitive(p) if p.is_numeric())
    }

    pub fn requires_size(&self) -> bool {
        matches!(self, AttributeType::Primitive(p) if p.requires_size())
    }

    pub fn name(&self) -> &str {
        match self {
            AttributeType::Primitive(p) => p.as_str(),
            AttributeType::Enum(name) => name,
        }
    }
}

impl From<PrimitiveType> for AttributeType {
    fn from(value: PrimitiveType) -> Self {
        AttributeType::Primitive(value)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttributeType {
    type Err = std::convert::Infallible;

    /// Anything that is not a primitive keyword is taken as an enum reference;
    /// whether that enum exists is checked by the validators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match PrimitiveType::parse(trimmed) {
            Some(p) => AttributeType::Primitive(p),
            None => AttributeType::Enum(trimmed.trim_matches(|c| c == '[' || c == ']').to_string()),
        })
    }
}

/// Persisted attribute type string, e.g. `"string [10]"`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeSpec {
    pub attr_type: AttributeType,
    pub size: Option<u32>,
}

impl TypeSpec {
    pub fn new(attr_type: AttributeType, size: Option<u32>) -> Self {
        Self { attr_type, size }
    }

    pub fn is_numeric(&self) -> bool {
        self.attr_type.is_numeric()
    }

    /// Split a persisted type string into its type and optional size.
    /// Sizes that do not fit in `u32` are dropped and caught later as a missing size.
    pub fn parse(raw: &str) -> Self {
        let (base, size) = match TYPE_SPEC_RE.captures(raw) {
            Some(caps) => (
                caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
                caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()),
            ),
            None => (raw, None),
        };
        let attr_type = base
            .parse::<AttributeType>()
            .unwrap_or_else(|never| match never {});
        Self { attr_type, size }
    }
}

impl From<AttributeType> for TypeSpec {
    fn from(value: AttributeType) -> Self {
        Self::new(value, None)
    }
}

impl From<PrimitiveType> for TypeSpec {
    fn from(value: PrimitiveType) -> Self {
        Self::new(value.into(), None)
    }
}

impl Serialize for TypeSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TypeSpec::parse(&raw))
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(size) => write!(f, "{} [{}]", self.attr_type, size),
            None => write!(f, "{}", self.attr_type),
        }
    }
}
