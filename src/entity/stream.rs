use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EditorState, ReservedNames};
use crate::errors::{Issues, ValidationIssue};
use crate::model::{
    validate_attributes, validate_identifier, Attribute, AttributeDraft, FieldRef, PrimitiveType,
};

/// Canonical stream declaration, as persisted in `.str` files
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDecl {
    pub stream_name: String,
    #[serde(default)]
    pub fields: Vec<FieldRef>,
}

impl StreamDecl {
    pub fn new(stream_name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        let fields = attributes
            .into_iter()
            .enumerate()
            .map(|(idx, attr)| FieldRef::new(idx.to_string(), attr.name, attr.spec))
            .collect();
        Self {
            stream_name: stream_name.into(),
            fields,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Editor for one stream declaration
#[derive(Clone, Debug)]
pub struct StreamEditor {
    name: String,
    attributes: Vec<AttributeDraft>,
    read_only_name: bool,
    state: EditorState,
    committed: Option<StreamDecl>,
}

impl Default for StreamEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamEditor {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            attributes: Vec::new(),
            read_only_name: false,
            state: EditorState::Draft,
            committed: None,
        }
    }

    /// Open an editor on an already persisted stream; its name cannot change
    pub fn open_existing(decl: StreamDecl) -> Self {
        let attributes = decl
            .fields
            .iter()
            .map(|field| AttributeDraft {
                name: field.name.clone(),
                type_name: field.field_type.attr_type.name().to_string(),
                size: field.field_type.size.map(i64::from),
            })
            .collect();
        Self {
            name: decl.stream_name.clone(),
            attributes,
            read_only_name: true,
            state: EditorState::Committed,
            committed: Some(decl),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[AttributeDraft] {
        &self.attributes
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn has_read_only_name(&self) -> bool {
        self.read_only_name
    }

    /// Last finished declaration, kept while later edits are in progress
    pub fn committed(&self) -> Option<&StreamDecl> {
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
        self.touch();
        Ok(())
    }

    /// Append a default `string` attribute and return its index
    pub fn add_attribute(&mut self) -> usize {
        self.attributes
            .push(AttributeDraft::new(String::new(), "string", None));
        self.touch();
        self.attributes.len() - 1
    }

    pub fn push_attribute(&mut self, draft: AttributeDraft) {
        self.attributes.push(draft);
        self.touch();
    }

    /// Replace the attribute at `index`; returns false when out of range
    pub fn update_attribute(&mut self, index: usize, draft: AttributeDraft) -> bool {
        match self.attributes.get_mut(index) {
            Some(slot) => {
                *slot = draft;
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn remove_attribute(&mut self, index: usize) -> Option<AttributeDraft> {
        if index >= self.attributes.len() {
            return None;
        }
        let removed = self.attributes.remove(index);
        self.touch();
        Some(removed)
    }

    /// Validate the whole declaration against a reserved-name snapshot
    pub fn validate(&self, reserved: &ReservedNames) -> Result<StreamDecl, Issues> {
        let mut issues = Vec::new();

        if let Err(issue) = validate_identifier(&self.name, "Stream") {
            issues.push(issue);
        } else if !self.read_only_name && reserved.names.contains(&self.name) {
            issues.push(ValidationIssue::DuplicateName("Stream", self.name.clone()));
        }

        let attributes = match validate_attributes(&self.attributes, &reserved.enums) {
            Ok(attributes) => attributes,
            Err(mut attr_issues) => {
                issues.append(&mut attr_issues);
                Vec::new()
            }
        };

        if issues.is_empty() {
            Ok(StreamDecl::new(self.name.clone(), attributes))
        } else {
            Err(issues)
        }
    }

    /// Move between Draft and Valid according to the current draft
    pub fn refresh(&mut self, reserved: &ReservedNames) -> EditorState {
        if self.state != EditorState::Committed {
            self.state = match self.validate(reserved) {
                Ok(_) => EditorState::Valid,
                Err(_) => EditorState::Draft,
            };
        }
        self.state
    }

    /// Freeze the current draft as the committed declaration
    pub fn finish(&mut self, reserved: &ReservedNames) -> Result<&StreamDecl, Issues> {
        let decl = self.validate(reserved)?;
        debug!(stream = %decl.stream_name, fields = decl.fields.len(), "Stream finished");
        self.state = EditorState::Committed;
        Ok(self.committed.insert(decl))
    }

    /// Enum names referenced by the draft
    pub fn referenced_enums(&self) -> BTreeSet<String> {
        self.attributes
            .iter()
            .map(|attr| attr.type_name.trim())
            .filter(|ty| PrimitiveType::parse(ty).is_none() && !ty.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn touch(&mut self) {
        self.state = EditorState::Draft;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IssueLocation;

    fn reserved(names: &[&str], enums: &[&str]) -> ReservedNames {
        ReservedNames::new(
            names.iter().map(|s| s.to_string()),
            enums.iter().map(|s| s.to_string()),
        )
    }

    fn orders_editor() -> StreamEditor {
        let mut editor = StreamEditor::new();
        editor.set_name("Orders").unwrap();
        editor.push_attribute(AttributeDraft::new("orderId", "integer", None));
        editor.push_attribute(AttributeDraft::new("note", "string", Some(10)));
        editor
    }

    #[test]
    fn test_finish_emits_canonical_json() {
        let mut editor = orders_editor();
        let decl = editor.finish(&ReservedNames::default()).unwrap();
        assert_eq!(
            decl.to_json().unwrap(),
            serde_json::json!({
                "streamName": "Orders",
                "fields": [
                    { "fieldId": "0", "name": "orderId", "type": "integer" },
                    { "fieldId": "1", "name": "note", "type": "string [10]" }
                ]
            })
        );
        assert_eq!(editor.state(), EditorState::Committed);
    }

    #[test]
    fn test_duplicate_stream_name() {
        let editor = orders_editor();
        let issues = editor.validate(&reserved(&["Orders"], &[])).unwrap_err();
        assert_eq!(
            issues,
            vec![ValidationIssue::DuplicateName("Stream", "Orders".to_string())]
        );
    }

    #[test]
    fn test_issues_are_collected() {
        let mut editor = StreamEditor::new();
        editor.push_attribute(AttributeDraft::new("1x", "integer", None));
        let issues = editor.validate(&ReservedNames::default()).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0], ValidationIssue::EmptyName("Stream"));
        assert_eq!(issues[1].location(), Some(IssueLocation::Attribute(0)));
    }

    #[test]
    fn test_state_transitions() {
        let mut editor = orders_editor();
        assert_eq!(editor.state(), EditorState::Draft);
        assert_eq!(editor.refresh(&ReservedNames::default()), EditorState::Valid);

        editor.finish(&ReservedNames::default()).unwrap();
        editor.push_attribute(AttributeDraft::new("bad", "vector", None));
        assert_eq!(editor.state(), EditorState::Draft);
        assert_eq!(editor.refresh(&ReservedNames::default()), EditorState::Draft);

        // last committed declaration survives the broken edit
        let committed = editor.committed().unwrap();
        assert_eq!(committed.fields.len(), 2);
    }

    #[test]
    fn test_read_only_name() {
        let decl = orders_editor()
            .validate(&ReservedNames::default())
            .unwrap();
        let mut editor = StreamEditor::open_existing(decl);
        assert_eq!(
            editor.set_name("Renamed"),
            Err(ValidationIssue::ReadOnlyName("Orders".to_string()))
        );
        // uniqueness is not checked for an existing stream
        assert!(editor.validate(&reserved(&["Orders"], &[])).is_ok());
        assert_eq!(editor.attributes()[1].size, Some(10));
    }

    #[test]
    fn test_enum_attribute_needs_visible_enum() {
        let mut editor = orders_editor();
        editor.push_attribute(AttributeDraft::new("status", "Status", None));
        assert!(editor.validate(&ReservedNames::default()).is_err());
        assert!(editor.validate(&reserved(&[], &["Status"])).is_ok());
        assert_eq!(
            editor.referenced_enums().into_iter().collect::<Vec<_>>(),
            vec!["Status".to_string()]
        );
    }
}
