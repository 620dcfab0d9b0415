use crate::errors::{ValidationIssue, ValidationResult};
use crate::model::{carry_selection, FieldSelection};
use crate::query::clause::{Clause, ProjectClause};
use crate::query::kind::{NodeKind, Port};
use crate::query::node::{Input, NodeCore, NodeEditor, Published};

use super::apply_seed;

/// Keeps a checked subset of the upstream fields
#[derive(Clone, Debug, Default)]
pub struct ProjectEditor {
    core: NodeCore,
    input: Input,
    selection: Vec<FieldSelection>,
    pending: Option<Vec<String>>,
}

impl ProjectEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clause(clause: ProjectClause) -> Self {
        Self {
            pending: Some(clause.fields.clone()),
            core: NodeCore::seeded(Clause::Project(clause)),
            ..Self::default()
        }
    }

    pub fn selection(&self) -> &[FieldSelection] {
        &self.selection
    }

    /// Check or uncheck a candidate by name; false when no such field
    pub fn set_checked(&mut self, name: &str, checked: bool) -> bool {
        match self.selection.iter_mut().find(|s| s.field.name == name) {
            Some(selection) => {
                selection.checked = checked;
                true
            }
            None => false,
        }
    }
}

impl NodeEditor for ProjectEditor {
    fn kind(&self) -> NodeKind {
        NodeKind::Project
    }

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn set_input(&mut self, _port: Port, input: Input) {
        let candidates = input
            .published()
            .map(|p| p.fields.clone())
            .unwrap_or_default();
        self.selection = carry_selection(&self.selection, &candidates, false);
        apply_seed(&mut self.pending, &mut self.selection);
        self.input = input;
    }

    fn compute(&self) -> ValidationResult<(Clause, Published)> {
        let upstream = self.input.require(Port::In).map_err(|issue| vec![issue])?;
        let fields: Vec<_> = self
            .selection
            .iter()
            .filter(|s| s.checked)
            .map(|s| s.field.clone())
            .collect();
        if fields.is_empty() {
            return Err(vec![ValidationIssue::NoFieldsSelected]);
        }
        let clause = Clause::Project(ProjectClause {
            fields: fields.iter().map(|f| f.name.clone()).collect(),
        });
        Ok((clause, Published::new(upstream.stream.clone(), fields)))
    }
}
