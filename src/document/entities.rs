use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a persisted entity
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Stream,
    Enum,
    Query,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Stream => "stream",
            EntityKind::Enum => "enum",
            EntityKind::Query => "query",
        }
    }

    /// File extension the collaborator stores this kind under
    pub fn extension(&self) -> &'static str {
        match self {
            EntityKind::Stream => "str",
            EntityKind::Enum => "enum",
            EntityKind::Query => "qry",
        }
    }

    /// Kind of a stored file, by extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "str" => Some(EntityKind::Stream),
            "enum" => Some(EntityKind::Enum),
            "qry" => Some(EntityKind::Query),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarations of one kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityGroup {
    pub kind: EntityKind,
    #[serde(default)]
    pub children: Vec<Value>,
}

/// Payload of create/update entity calls
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitiesDoc {
    pub groups: Vec<EntityGroup>,
}

impl EntitiesDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration, grouping by kind in order of first appearance
    pub fn push(&mut self, kind: EntityKind, json: Value) {
        match self.groups.iter_mut().find(|g| g.kind == kind) {
            Some(group) => group.children.push(json),
            None => self.groups.push(EntityGroup {
                kind,
                children: vec![json],
            }),
        }
    }

    pub fn single(kind: EntityKind, json: Value) -> Self {
        let mut doc = Self::new();
        doc.push(kind, json);
        doc
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.children.is_empty())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.children.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_groups_in_order_of_first_appearance() {
        let mut doc = EntitiesDoc::new();
        doc.push(EntityKind::Enum, json!({ "enumName": "A" }));
        doc.push(EntityKind::Stream, json!({ "streamName": "S" }));
        doc.push(EntityKind::Enum, json!({ "enumName": "B" }));

        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!([
                { "kind": "enum", "children": [{ "enumName": "A" }, { "enumName": "B" }] },
                { "kind": "stream", "children": [{ "streamName": "S" }] }
            ])
        );
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(EntityKind::from_file_name("orders.qry"), Some(EntityKind::Query));
        assert_eq!(EntityKind::from_file_name("Orders.STR"), Some(EntityKind::Stream));
        assert_eq!(EntityKind::from_file_name("status.enum"), Some(EntityKind::Enum));
        assert_eq!(EntityKind::from_file_name("notes.txt"), None);
        assert_eq!(EntityKind::from_file_name("README"), None);
    }
}
