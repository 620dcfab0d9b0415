use crate::entity::{Catalog, StreamDecl};
use crate::errors::{ValidationIssue, ValidationResult};
use crate::query::clause::{Clause, StreamClause};
use crate::query::kind::{NodeKind, Port};
use crate::query::node::{Input, NodeCore, NodeEditor, Published};

/// Source node naming one stream from the catalog
#[derive(Clone, Debug, Default)]
pub struct StreamRefEditor {
    core: NodeCore,
    stream_name: Option<String>,
    stream: Option<StreamDecl>,
}

impl StreamRefEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clause(clause: StreamClause, catalog: &Catalog) -> Self {
        let stream = catalog.stream(&clause.stream).cloned();
        Self {
            stream_name: Some(clause.stream.clone()),
            stream,
            core: NodeCore::seeded(Clause::Stream(clause)),
        }
    }

    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.as_deref()
    }

    pub fn stream(&self) -> Option<&StreamDecl> {
        self.stream.as_ref()
    }

    /// Choose the stream this node reads; must exist in `catalog`
    pub fn choose_stream(&mut self, catalog: &Catalog, name: &str) -> Result<(), ValidationIssue> {
        let decl = catalog
            .stream(name)
            .ok_or_else(|| ValidationIssue::UnknownStream(name.to_string()))?;
        self.stream_name = Some(decl.stream_name.clone());
        self.stream = Some(decl.clone());
        Ok(())
    }
}

impl NodeEditor for StreamRefEditor {
    fn kind(&self) -> NodeKind {
        NodeKind::Stream
    }

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    // source only
    fn set_input(&mut self, _port: Port, _input: Input) {}

    fn compute(&self) -> ValidationResult<(Clause, Published)> {
        let decl = match (&self.stream, &self.stream_name) {
            (Some(decl), _) => decl,
            (None, Some(name)) => return Err(vec![ValidationIssue::UnknownStream(name.clone())]),
            (None, None) => return Err(vec![ValidationIssue::NoStreamSelected]),
        };
        let clause = Clause::Stream(StreamClause {
            stream: decl.stream_name.clone(),
        });
        let published = Published::new(Some(decl.stream_name.clone()), decl.fields.clone());
        Ok((clause, published))
    }
}
