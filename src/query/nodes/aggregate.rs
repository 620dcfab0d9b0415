use crate::errors::{ValidationIssue, ValidationResult};
use crate::model::{carry_selection, renumber, FieldRef, FieldSelection, PrimitiveType};
use crate::query::clause::{AggregateClause, AggregateFunction, Clause};
use crate::query::kind::{NodeKind, Port};
use crate::query::node::{Input, NodeCore, NodeEditor, Published};

use super::apply_seed;

/// Applies one aggregate function to the checked fields
#[derive(Clone, Debug, Default)]
pub struct AggregateEditor {
    core: NodeCore,
    input: Input,
    function: AggregateFunction,
    selection: Vec<FieldSelection>,
    pending: Option<Vec<String>>,
}

impl AggregateEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clause(clause: AggregateClause) -> Self {
        Self {
            function: clause.function,
            pending: Some(clause.fields.clone()),
            core: NodeCore::seeded(Clause::Aggregate(clause)),
            ..Self::default()
        }
    }

    pub fn function(&self) -> AggregateFunction {
        self.function
    }

    pub fn selection(&self) -> &[FieldSelection] {
        &self.selection
    }

    /// Switch function. Numeric-only functions uncheck non-numeric fields;
    /// switching back to COUNT leaves them unchecked.
    pub fn set_function(&mut self, function: AggregateFunction) {
        self.function = function;
        self.enforce_numeric();
    }

    /// Check or uncheck a candidate by name
    pub fn set_checked(&mut self, name: &str, checked: bool) -> Result<(), ValidationIssue> {
        let function = self.function;
        let selection = self
            .selection
            .iter_mut()
            .find(|s| s.field.name == name)
            .ok_or_else(|| ValidationIssue::UnknownAttribute(name.to_string()))?;
        if checked && function.requires_numeric() && !selection.field.is_numeric() {
            return Err(ValidationIssue::NotNumeric {
                field: name.to_string(),
                function: function.to_string(),
            });
        }
        selection.checked = checked;
        Ok(())
    }

    /// Candidates that may be checked under the current function
    pub fn eligible(&self) -> impl Iterator<Item = &FieldSelection> {
        let function = self.function;
        self.selection
            .iter()
            .filter(move |s| !function.requires_numeric() || s.field.is_numeric())
    }

    fn enforce_numeric(&mut self) {
        if !self.function.requires_numeric() {
            return;
        }
        for selection in self.selection.iter_mut() {
            if !selection.field.is_numeric() {
                selection.checked = false;
            }
        }
    }
}

impl NodeEditor for AggregateEditor {
    fn kind(&self) -> NodeKind {
        NodeKind::Aggregate
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
        self.enforce_numeric();
        self.input = input;
    }

    fn compute(&self) -> ValidationResult<(Clause, Published)> {
        let upstream = self.input.require(Port::In).map_err(|issue| vec![issue])?;
        let checked: Vec<_> = self.selection.iter().filter(|s| s.checked).collect();
        if checked.is_empty() {
            return Err(vec![ValidationIssue::NoFieldsSelected]);
        }

        if self.function.requires_numeric() {
            let issues: Vec<_> = checked
                .iter()
                .filter(|s| !s.field.is_numeric())
                .map(|s| ValidationIssue::NotNumeric {
                    field: s.field.name.clone(),
                    function: self.function.to_string(),
                })
                .collect();
            if !issues.is_empty() {
                return Err(issues);
            }
        }

        let fields = renumber(checked.iter().map(|s| {
            FieldRef::new(
                String::new(),
                format!("{}({})", self.function, s.field.name),
                PrimitiveType::Integer.into(),
            )
        }));
        let clause = Clause::Aggregate(AggregateClause {
            function: self.function,
            fields: checked.iter().map(|s| s.field.name.clone()).collect(),
        });
        Ok((clause, Published::new(upstream.stream.clone(), fields)))
    }
}
