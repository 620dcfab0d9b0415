use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EditorState, ReservedNames};
use crate::errors::{IssueLocation, Issues, ValidationIssue};
use crate::model::{validate_identifier, PrimitiveType};

/// Canonical enum declaration, as persisted in `.enum` files
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDecl {
    pub enum_name: String,
    #[serde(with = "indexed_values")]
    pub values: Vec<String>,
}

impl EnumDecl {
    pub fn new(enum_name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            enum_name: enum_name.into(),
            values,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Values persist as `[["OPEN", 0], ["CLOSED", 1]]`
mod indexed_values {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&str, usize)> = values
            .iter()
            .enumerate()
            .map(|(idx, value)| (value.as_str(), idx))
            .collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let mut pairs = Vec::<(String, usize)>::deserialize(deserializer)?;
        pairs.sort_by_key(|(_, idx)| *idx);
        Ok(pairs.into_iter().map(|(value, _)| value).collect())
    }
}

/// Editor for one enum declaration
#[derive(Clone, Debug)]
pub struct EnumEditor {
    name: String,
    values: Vec<String>,
    read_only_name: bool,
    state: EditorState,
    committed: Option<EnumDecl>,
}

impl Default for EnumEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl EnumEditor {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            values: Vec::new(),
            read_only_name: false,
            state: EditorState::Draft,
            committed: None,
        }
    }

    /// Open an editor on an already persisted enum; its name cannot change
    pub fn open_existing(decl: EnumDecl) -> Self {
        Self {
            name: decl.enum_name.clone(),
            values: decl.values.clone(),
            read_only_name: true,
            state: EditorState::Committed,
            committed: Some(decl),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn has_read_only_name(&self) -> bool {
        self.read_only_name
    }

    pub fn committed(&self) -> Option<&EnumDecl> {
        self.committed.as_ref()
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ValidationIssue> {
        let name = name.into();
        if self.read_only_name && name != self.name {
            return Err(ValidationIssue::ReadOnlyName(self.name.clone()));
        }
        self.name = name;
        self.state = EditorState::Draft;
        Ok(())
    }

    pub fn add_value(&mut self, value: impl Into<String>) -> usize {
        self.values.push(value.into());
        self.state = EditorState::Draft;
        self.values.len() - 1
    }

    pub fn update_value(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                self.state = EditorState::Draft;
                true
            }
            None => false,
        }
    }

    pub fn remove_value(&mut self, index: usize) -> Option<String> {
        if index >= self.values.len() {
            return None;
        }
        self.state = EditorState::Draft;
        Some(self.values.remove(index))
    }

    pub fn validate(&self, reserved: &ReservedNames) -> Result<EnumDecl, Issues> {
        let mut issues = Vec::new();

        if let Err(issue) = validate_identifier(&self.name, "Enum") {
            issues.push(issue);
        } else if PrimitiveType::is_reserved(&self.name) {
            issues.push(ValidationIssue::ReservedTypeName(self.name.clone()));
        } else if !self.read_only_name && reserved.names.contains(&self.name) {
            issues.push(ValidationIssue::DuplicateName("Enum", self.name.clone()));
        }

        if self.values.is_empty() {
            issues.push(ValidationIssue::NoValues);
        }
        for (idx, value) in self.values.iter().enumerate() {
            let issue = if value.trim().is_empty() {
                Some(ValidationIssue::EmptyValue)
            } else if let Err(issue) = validate_identifier(value, "Enum value") {
                Some(issue)
            } else if self
                .values
                .iter()
                .enumerate()
                .any(|(other, v)| other != idx && v.trim() == value.trim())
            {
                Some(ValidationIssue::DuplicateName("Enum value", value.clone()))
            } else {
                None
            };
            if let Some(issue) = issue {
                issues.push(issue.at(IssueLocation::EnumValue(idx)));
            }
        }

        if issues.is_empty() {
            Ok(EnumDecl::new(self.name.clone(), self.values.clone()))
        } else {
            Err(issues)
        }
    }

    pub fn refresh(&mut self, reserved: &ReservedNames) -> EditorState {
        if self.state != EditorState::Committed {
            self.state = match self.validate(reserved) {
                Ok(_) => EditorState::Valid,
                Err(_) => EditorState::Draft,
            };
        }
        self.state
    }

    pub fn finish(&mut self, reserved: &ReservedNames) -> Result<&EnumDecl, Issues> {
        let decl = self.validate(reserved)?;
        debug!(name = %decl.enum_name, values = decl.values.len(), "Enum finished");
        self.state = EditorState::Committed;
        Ok(self.committed.insert(decl))
    }
}
