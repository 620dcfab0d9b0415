use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::identifier::validate_identifier;
use super::types::{AttributeType, PrimitiveType, TypeSpec, MAX_SIZE};
use crate::errors::{IssueLocation, Issues, ValidationIssue};

/// Attribute as typed into a stream editor, before validation
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AttributeDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

impl AttributeDraft {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, size: Option<i64>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            size,
        }
    }
}

impl From<&Attribute> for AttributeDraft {
    fn from(attr: &Attribute) -> Self {
        Self {
            name: attr.name.clone(),
            type_name: attr.spec.attr_type.name().to_string(),
            size: attr.spec.size.map(i64::from),
        }
    }
}

/// A validated stream attribute
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub spec: TypeSpec,
}

impl Attribute {
    pub fn new(name: impl Into<String>, spec: TypeSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// Validate one attribute draft.
///
/// `siblings` are the names of the other attributes of the same stream,
/// `enums` the enum names visible to the stream.
pub fn validate_attribute<'a>(
    draft: &AttributeDraft,
    siblings: impl IntoIterator<Item = &'a str>,
    enums: &BTreeSet<String>,
) -> Result<Attribute, ValidationIssue> {
    validate_identifier(&draft.name, "Attribute")?;
    if siblings.into_iter().any(|name| name == draft.name) {
        return Err(ValidationIssue::DuplicateName(
            "Attribute",
            draft.name.clone(),
        ));
    }

    let type_name = draft.type_name.trim();
    let attr_type = match PrimitiveType::parse(type_name) {
        Some(primitive) => AttributeType::Primitive(primitive),
        None if enums.contains(type_name) => AttributeType::Enum(type_name.to_string()),
        None => return Err(ValidationIssue::UnknownType(type_name.to_string())),
    };

    let size = if attr_type.requires_size() {
        let size = draft.size.ok_or(ValidationIssue::MissingSize)?;
        if !(1..=i64::from(MAX_SIZE)).contains(&size) {
            return Err(ValidationIssue::SizeOutOfRange(size));
        }
        Some(size as u32)
    } else {
        if draft.size.is_some() {
            return Err(ValidationIssue::SizeNotAllowed(attr_type.to_string()));
        }
        None
    };

    Ok(Attribute::new(draft.name.clone(), TypeSpec::new(attr_type, size)))
}

/// Validate every attribute of a stream, collecting one located issue per
/// failing attribute
pub fn validate_attributes(
    drafts: &[AttributeDraft],
    enums: &BTreeSet<String>,
) -> Result<Vec<Attribute>, Issues> {
    let mut attributes = Vec::with_capacity(drafts.len());
    let mut issues = Vec::new();

    for (idx, draft) in drafts.iter().enumerate() {
        let siblings = drafts
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != idx)
            .map(|(_, other)| other.name.as_str());
        match validate_attribute(draft, siblings, enums) {
            Ok(attr) => attributes.push(attr),
            Err(issue) => issues.push(issue.at(IssueLocation::Attribute(idx))),
        }
    }

    if issues.is_empty() {
        Ok(attributes)
    } else {
        Err(issues)
    }
}
