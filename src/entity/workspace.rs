use indexmap::IndexMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Catalog, EnumDecl, EnumEditor, ReservedNames, StreamDecl, StreamEditor};
use crate::document::{EntitiesDoc, EntityKind};
use crate::errors::{GraphError, GraphResult};

/// A node of the entities workspace
#[derive(Clone, Debug)]
pub enum EntityNode {
    Stream(StreamEditor),
    Enum(EnumEditor),
}

impl EntityNode {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityNode::Stream(_) => EntityKind::Stream,
            EntityNode::Enum(_) => EntityKind::Enum,
        }
    }

    pub fn is_committed(&self) -> bool {
        match self {
            EntityNode::Stream(editor) => editor.is_committed(),
            EntityNode::Enum(editor) => editor.is_committed(),
        }
    }

    fn committed_stream(&self) -> Option<&StreamDecl> {
        match self {
            EntityNode::Stream(editor) => editor.committed(),
            EntityNode::Enum(_) => None,
        }
    }

    fn committed_enum(&self) -> Option<&EnumDecl> {
        match self {
            EntityNode::Enum(editor) => editor.committed(),
            EntityNode::Stream(_) => None,
        }
    }
}

/// Editing session for new or existing stream and enum declarations.
///
/// At most one uncommitted entity per kind is in flight; committing requires
/// every node to be committed.
#[derive(Clone, Debug, Default)]
pub struct EntityWorkspace {
    catalog: Catalog,
    nodes: IndexMap<String, EntityNode>,
    update: bool,
}

impl EntityWorkspace {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            nodes: IndexMap::new(),
            update: false,
        }
    }

    /// Workspace holding one existing stream, read-only named, for update
    pub fn open_existing_stream(catalog: Catalog, decl: StreamDecl) -> (Self, String) {
        let mut workspace = Self::new(catalog);
        workspace.update = true;
        let id = workspace.insert(EntityNode::Stream(StreamEditor::open_existing(decl)));
        (workspace, id)
    }

    /// Workspace holding one existing enum, read-only named, for update
    pub fn open_existing_enum(catalog: Catalog, decl: EnumDecl) -> (Self, String) {
        let mut workspace = Self::new(catalog);
        workspace.update = true;
        let id = workspace.insert(EntityNode::Enum(EnumEditor::open_existing(decl)));
        (workspace, id)
    }

    /// True when the workspace edits an existing entity
    pub fn is_update(&self) -> bool {
        self.update
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &EntityNode)> {
        self.nodes.iter().map(|(id, node)| (id.as_str(), node))
    }

    pub fn node(&self, id: &str) -> Option<&EntityNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn all_committed(&self, kind: EntityKind) -> bool {
        self.nodes
            .values()
            .filter(|n| n.kind() == kind)
            .all(EntityNode::is_committed)
    }

    pub fn can_add_stream(&self) -> bool {
        self.all_committed(EntityKind::Stream)
    }

    pub fn can_add_enum(&self) -> bool {
        self.all_committed(EntityKind::Enum)
    }

    pub fn can_commit(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.values().all(EntityNode::is_committed)
    }

    /// Add an empty stream editor; `None` while another new stream is unfinished
    pub fn add_stream(&mut self) -> Option<String> {
        if !self.can_add_stream() {
            return None;
        }
        Some(self.insert(EntityNode::Stream(StreamEditor::new())))
    }

    /// Add an empty enum editor; `None` while another new enum is unfinished
    pub fn add_enum(&mut self) -> Option<String> {
        if !self.can_add_enum() {
            return None;
        }
        Some(self.insert(EntityNode::Enum(EnumEditor::new())))
    }

    pub fn remove(&mut self, id: &str) -> Option<EntityNode> {
        let removed = self.nodes.shift_remove(id);
        if removed.is_some() {
            debug!(node = id, "Entity node removed");
        }
        removed
    }

    pub fn stream_mut(&mut self, id: &str) -> Option<&mut StreamEditor> {
        match self.nodes.get_mut(id) {
            Some(EntityNode::Stream(editor)) => Some(editor),
            _ => None,
        }
    }

    pub fn enum_mut(&mut self, id: &str) -> Option<&mut EnumEditor> {
        match self.nodes.get_mut(id) {
            Some(EntityNode::Enum(editor)) => Some(editor),
            _ => None,
        }
    }

    /// Names the node `id` must not reuse, plus the enums it may reference
    pub fn reserved_for(&self, id: &str) -> ReservedNames {
        let others = self.nodes.iter().filter(|(other, _)| other.as_str() != id);
        let workspace_enums = self
            .nodes
            .values()
            .filter_map(EntityNode::committed_enum)
            .map(|e| e.enum_name.clone());

        match self.nodes.get(id).map(EntityNode::kind) {
            Some(EntityKind::Enum) => ReservedNames::new(
                others
                    .filter_map(|(_, n)| n.committed_enum())
                    .map(|e| e.enum_name.clone())
                    .chain(self.catalog.enum_names()),
                Vec::new(),
            ),
            _ => ReservedNames::new(
                others
                    .filter_map(|(_, n)| n.committed_stream())
                    .map(|s| s.stream_name.clone())
                    .chain(self.catalog.stream_names()),
                workspace_enums.chain(self.catalog.enum_names()),
            ),
        }
    }

    /// Finish the editor `id` against a fresh reserved-name snapshot
    pub fn finish(&mut self, id: &str) -> GraphResult<serde_json::Value> {
        let reserved = self.reserved_for(id);
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let invalid = |issues| GraphError::NodeInvalid {
            node: id.to_string(),
            issues,
        };
        let json = match node {
            EntityNode::Stream(editor) => editor.finish(&reserved).map_err(invalid)?.to_json()?,
            EntityNode::Enum(editor) => editor.finish(&reserved).map_err(invalid)?.to_json()?,
        };
        debug!(node = id, can_commit = self.can_commit(), "Entity finished");
        Ok(json)
    }

    /// Committed declarations grouped by kind
    pub fn to_entities_doc(&self) -> GraphResult<EntitiesDoc> {
        let mut doc = EntitiesDoc::new();
        for node in self.nodes.values() {
            if let Some(decl) = node.committed_stream() {
                doc.push(EntityKind::Stream, decl.to_json()?);
            } else if let Some(decl) = node.committed_enum() {
                doc.push(EntityKind::Enum, decl.to_json()?);
            }
        }
        info!(entities = doc.len(), "Entities document built");
        Ok(doc)
    }

    fn insert(&mut self, node: EntityNode) -> String {
        let id = Uuid::new_v4().to_string();
        self.nodes.insert(id.clone(), node);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeDraft;

    #[test]
    fn test_one_new_entity_per_kind() {
        let mut ws = EntityWorkspace::new(Catalog::default());
        assert!(ws.can_add_stream());
        let stream = ws.add_stream().unwrap();
        assert!(!ws.can_add_stream());
        assert!(ws.add_stream().is_none());
        // enums are gated separately
        assert!(ws.add_enum().is_some());
        assert!(!ws.can_commit());

        ws.remove(&stream);
        assert!(ws.can_add_stream());
    }

    #[test]
    fn test_finish_enables_commit() {
        let mut ws = EntityWorkspace::new(Catalog::default());
        let id = ws.add_enum().unwrap();
        let editor = ws.enum_mut(&id).unwrap();
        editor.set_name("Status").unwrap();
        editor.add_value("OPEN");
        ws.finish(&id).unwrap();

        assert!(ws.can_commit());
        assert!(ws.can_add_enum());
        let doc = ws.to_entities_doc().unwrap();
        assert_eq!(doc.groups[0].kind, EntityKind::Enum);
    }

    #[test]
    fn test_stream_sees_committed_enums() {
        let mut ws = EntityWorkspace::new(Catalog::default());
        let enum_id = ws.add_enum().unwrap();
        {
            let editor = ws.enum_mut(&enum_id).unwrap();
            editor.set_name("Status").unwrap();
            editor.add_value("OPEN");
        }
        let stream_id = ws.add_stream().unwrap();
        {
            let editor = ws.stream_mut(&stream_id).unwrap();
            editor.set_name("Orders").unwrap();
            editor.push_attribute(AttributeDraft::new("status", "Status", None));
        }
        // enum not committed yet
        assert!(ws.finish(&stream_id).is_err());

        ws.finish(&enum_id).unwrap();
        ws.finish(&stream_id).unwrap();
        assert!(ws.can_commit());
    }

    #[test]
    fn test_finish_unknown_node() {
        let mut ws = EntityWorkspace::new(Catalog::default());
        let err = ws.finish("missing").unwrap_err();
        assert!(err.is_not_found());
    }
}
