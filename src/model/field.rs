use serde::{Deserialize, Serialize};

use super::types::TypeSpec;

/// A field published by a node: a stream attribute, a qualified
/// `"stream.attr"` or a synthesized `"FUNC(attr)"`
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub field_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: TypeSpec,
}

impl FieldRef {
    pub fn new(field_id: impl Into<String>, name: impl Into<String>, field_type: TypeSpec) -> Self {
        Self {
            field_id: field_id.into(),
            name: name.into(),
            field_type,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.field_type.is_numeric()
    }
}

/// Editing state of a candidate field inside a node
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldSelection {
    pub field: FieldRef,
    pub checked: bool,
}

impl FieldSelection {
    pub fn new(field: FieldRef, checked: bool) -> Self {
        Self { field, checked }
    }
}

/// Re-derive selections for a new candidate list, keeping the checked state
/// of fields whose name survived. New names start with `default_checked`.
pub fn carry_selection(
    previous: &[FieldSelection],
    candidates: &[FieldRef],
    default_checked: bool,
) -> Vec<FieldSelection> {
    candidates
        .iter()
        .map(|field| {
            let checked = previous
                .iter()
                .find(|sel| sel.field.name == field.name)
                .map(|sel| sel.checked)
                .unwrap_or(default_checked);
            FieldSelection::new(field.clone(), checked)
        })
        .collect()
}

/// Assign sequential ids ("0", "1", ...) to a field list
pub fn renumber(fields: impl IntoIterator<Item = FieldRef>) -> Vec<FieldRef> {
    fields
        .into_iter()
        .enumerate()
        .map(|(idx, mut field)| {
            field.field_id = idx.to_string();
            field
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveType;

    fn field(id: &str, name: &str) -> FieldRef {
        FieldRef::new(id, name, PrimitiveType::Integer.into())
    }

    #[test]
    fn test_field_ref_json_shape() {
        let json = serde_json::to_value(field("0", "orderId")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "fieldId": "0", "name": "orderId", "type": "integer" })
        );
    }

    #[test]
    fn test_carry_selection_by_name() {
        let previous = vec![
            FieldSelection::new(field("0", "a"), true),
            FieldSelection::new(field("1", "b"), false),
        ];
        let candidates = vec![field("0", "b"), field("1", "c")];
        let carried = carry_selection(&previous, &candidates, true);
        assert_eq!(carried.len(), 2);
        assert!(!carried[0].checked);
        assert!(carried[1].checked);
    }

    #[test]
    fn test_renumber() {
        let fields = renumber(vec![field("7", "a"), field("0", "b")]);
        let ids: Vec<_> = fields.iter().map(|f| f.field_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1"]);
    }
}
