//! Field-level validation issues
//!
//! Issues are values, never panics. Editors return every issue they find so a
//! UI can render each one next to the offending field.

use std::fmt;

use thiserror::Error;

use crate::model::MAX_SIZE;

/// Where in a draft an issue was found
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IssueLocation {
    Attribute(usize),
    EnumValue(usize),
    Condition(usize),
    Having,
    JoinCondition,
}

impl fmt::Display for IssueLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueLocation::Attribute(i) => write!(f, "attribute #{}", i + 1),
            IssueLocation::EnumValue(i) => write!(f, "value #{}", i + 1),
            IssueLocation::Condition(i) => write!(f, "condition #{}", i + 1),
            IssueLocation::Having => write!(f, "having"),
            IssueLocation::JoinCondition => write!(f, "join condition"),
        }
    }
}

/// Validation issues for entity and query node drafts
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum ValidationIssue {
    #[error("Please provide {0} name")]
    EmptyName(&'static str),

    #[error("{0} name can only contain alphabets, digits, and underscores")]
    InvalidCharacters(&'static str),

    #[error("{0} names must be unique ('{1}' is already used)")]
    DuplicateName(&'static str, String),

    #[error("Enum names cannot be named after primitive types ('{0}')")]
    ReservedTypeName(String),

    #[error("Name '{0}' is read-only for an existing entity")]
    ReadOnlyName(String),

    #[error("Type '{0}' is not recognized")]
    UnknownType(String),

    #[error("Size is required")]
    MissingSize,

    #[error("Size must be between 1 and {}, got {0}", MAX_SIZE)]
    SizeOutOfRange(i64),

    #[error("Type '{0}' does not take a size")]
    SizeNotAllowed(String),

    #[error("Enum needs at least one value")]
    NoValues,

    #[error("Value is required")]
    EmptyValue,

    #[error("No stream selected")]
    NoStreamSelected,

    #[error("Stream '{0}' does not exist")]
    UnknownStream(String),

    #[error("Please connect the {0} input first")]
    NotConnected(&'static str),

    #[error("The {0} input has not been set up yet")]
    UpstreamIncomplete(&'static str),

    #[error("Attribute '{0}' is not available from the connected node")]
    UnknownAttribute(String),

    #[error("Conditions must be chained: every condition but the last needs AND/OR/NOT")]
    BrokenChain,

    #[error("The last condition cannot be chained to another one")]
    DanglingChain,

    #[error("Select at least one field")]
    NoFieldsSelected,

    #[error("Field '{field}' is not numeric and cannot be used with {function}")]
    NotNumeric { field: String, function: String },

    #[error("{location}: {issue}")]
    Located {
        location: IssueLocation,
        issue: Box<ValidationIssue>,
    },
}

impl ValidationIssue {
    /// Attach a location to an issue
    pub fn at(self, location: IssueLocation) -> Self {
        ValidationIssue::Located {
            location,
            issue: Box::new(self),
        }
    }

    /// Location of the issue, if any
    pub fn location(&self) -> Option<IssueLocation> {
        match self {
            ValidationIssue::Located { location, .. } => Some(*location),
            _ => None,
        }
    }

    /// The issue without its location wrapper
    pub fn root(&self) -> &ValidationIssue {
        match self {
            ValidationIssue::Located { issue, .. } => issue.root(),
            other => other,
        }
    }
}
