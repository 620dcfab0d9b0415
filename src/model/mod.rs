//! Field and type model shared by every editor
//!
//! Attribute types, identifiers, field references and the attribute
//! validation rules used by stream declarations.

pub mod attribute;
pub mod field;
pub mod identifier;
pub mod types;

pub use attribute::{validate_attribute, validate_attributes, Attribute, AttributeDraft};
pub use field::{carry_selection, renumber, FieldRef, FieldSelection};
pub use identifier::{is_identifier, validate_identifier};
pub use types::{AttributeType, PrimitiveType, TypeSpec, MAX_SIZE};
