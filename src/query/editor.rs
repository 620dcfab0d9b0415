use super::clause::Clause;
use super::kind::NodeKind;
use super::node::NodeEditor;
use super::nodes::{
    AggregateEditor, GroupByEditor, JoinEditor, ProjectEditor, SelectEditor, StreamRefEditor,
};
use crate::entity::Catalog;

/// A query graph node: one editor per kind
#[derive(Clone, Debug)]
pub enum QueryNode {
    Stream(StreamRefEditor),
    Select(SelectEditor),
    Project(ProjectEditor),
    Join(JoinEditor),
    GroupBy(GroupByEditor),
    Aggregate(AggregateEditor),
}

macro_rules! typed_access {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty) => {
        pub fn $get(&self) -> Option<&$ty> {
            match self {
                QueryNode::$variant(editor) => Some(editor),
                _ => None,
            }
        }

        pub fn $get_mut(&mut self) -> Option<&mut $ty> {
            match self {
                QueryNode::$variant(editor) => Some(editor),
                _ => None,
            }
        }
    };
}

impl QueryNode {
    /// Empty editor for `kind`; `None` for kinds that are not query nodes
    pub fn new(kind: NodeKind) -> Option<Self> {
        let node = match kind {
            NodeKind::Stream => QueryNode::Stream(StreamRefEditor::new()),
            NodeKind::Select => QueryNode::Select(SelectEditor::new()),
            NodeKind::Project => QueryNode::Project(ProjectEditor::new()),
            NodeKind::Join => QueryNode::Join(JoinEditor::new()),
            NodeKind::GroupBy => QueryNode::GroupBy(GroupByEditor::new()),
            NodeKind::Aggregate => QueryNode::Aggregate(AggregateEditor::new()),
            NodeKind::Enum => return None,
        };
        Some(node)
    }

    /// Editor seeded from a persisted clause
    pub fn from_clause(clause: Clause, catalog: &Catalog) -> Self {
        match clause {
            Clause::Stream(c) => QueryNode::Stream(StreamRefEditor::from_clause(c, catalog)),
            Clause::Select(c) => QueryNode::Select(SelectEditor::from_clause(c)),
            Clause::Project(c) => QueryNode::Project(ProjectEditor::from_clause(c)),
            Clause::Join(c) => QueryNode::Join(JoinEditor::from_clause(c)),
            Clause::GroupBy(c) => QueryNode::GroupBy(GroupByEditor::from_clause(c)),
            Clause::Aggregate(c) => QueryNode::Aggregate(AggregateEditor::from_clause(c)),
        }
    }

    pub fn editor(&self) -> &dyn NodeEditor {
        match self {
            QueryNode::Stream(e) => e,
            QueryNode::Select(e) => e,
            QueryNode::Project(e) => e,
            QueryNode::Join(e) => e,
            QueryNode::GroupBy(e) => e,
            QueryNode::Aggregate(e) => e,
        }
    }

    pub fn editor_mut(&mut self) -> &mut dyn NodeEditor {
        match self {
            QueryNode::Stream(e) => e,
            QueryNode::Select(e) => e,
            QueryNode::Project(e) => e,
            QueryNode::Join(e) => e,
            QueryNode::GroupBy(e) => e,
            QueryNode::Aggregate(e) => e,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.editor().kind()
    }

    typed_access!(as_stream, as_stream_mut, Stream, StreamRefEditor);
    typed_access!(as_select, as_select_mut, Select, SelectEditor);
    typed_access!(as_project, as_project_mut, Project, ProjectEditor);
    typed_access!(as_join, as_join_mut, Join, JoinEditor);
    typed_access!(as_group_by, as_group_by_mut, GroupBy, GroupByEditor);
    typed_access!(as_aggregate, as_aggregate_mut, Aggregate, AggregateEditor);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_per_kind() {
        for kind in NodeKind::QUERY_KINDS {
            let node = QueryNode::new(kind).unwrap();
            assert_eq!(node.kind(), kind);
            assert!(!node.editor().is_complete());
        }
        assert!(QueryNode::new(NodeKind::Enum).is_none());
    }

    #[test]
    fn test_typed_access() {
        let mut node = QueryNode::new(NodeKind::Join).unwrap();
        assert!(node.as_join_mut().is_some());
        assert!(node.as_select().is_none());
    }
}
