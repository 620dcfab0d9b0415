use crate::errors::{IssueLocation, ValidationIssue, ValidationResult};
use crate::model::{renumber, FieldRef};
use crate::query::clause::{Clause, JoinClause};
use crate::query::kind::{NodeKind, Port};
use crate::query::node::{Input, NodeCore, NodeEditor, Published};
use crate::query::predicate::{JoinCondition, Operator};

/// Combines two inputs under a single comparison predicate
#[derive(Clone, Debug, Default)]
pub struct JoinEditor {
    core: NodeCore,
    left: Input,
    right: Input,
    condition: Option<JoinCondition>,
}

impl JoinEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clause(clause: JoinClause) -> Self {
        let (left_attribute, operator, right_attribute) = clause.condition.clone();
        Self {
            condition: Some(JoinCondition {
                left_attribute,
                operator,
                right_attribute,
            }),
            core: NodeCore::seeded(Clause::Join(clause)),
            ..Self::default()
        }
    }

    pub fn left_fields(&self) -> &[FieldRef] {
        self.left.published().map(|p| p.fields.as_slice()).unwrap_or(&[])
    }

    pub fn right_fields(&self) -> &[FieldRef] {
        self.right.published().map(|p| p.fields.as_slice()).unwrap_or(&[])
    }

    pub fn condition(&self) -> Option<&JoinCondition> {
        self.condition.as_ref()
    }

    /// Set the predicate; each side must name a field of its input
    pub fn set_condition(
        &mut self,
        left_attribute: &str,
        operator: Operator,
        right_attribute: &str,
    ) -> Result<(), ValidationIssue> {
        if !self.left_fields().iter().any(|f| f.name == left_attribute) {
            return Err(ValidationIssue::UnknownAttribute(left_attribute.to_string()));
        }
        if !self.right_fields().iter().any(|f| f.name == right_attribute) {
            return Err(ValidationIssue::UnknownAttribute(right_attribute.to_string()));
        }
        self.condition = Some(JoinCondition {
            left_attribute: left_attribute.to_string(),
            operator,
            right_attribute: right_attribute.to_string(),
        });
        Ok(())
    }

    /// The predicate with each side falling back to the first field of its input
    pub fn effective_condition(&self) -> Option<JoinCondition> {
        let pick = |fields: &[FieldRef], wanted: Option<&String>| -> Option<String> {
            wanted
                .and_then(|name| fields.iter().find(|f| &f.name == name))
                .or_else(|| fields.first())
                .map(|f| f.name.clone())
        };
        let left = pick(
            self.left_fields(),
            self.condition.as_ref().map(|c| &c.left_attribute),
        )?;
        let right = pick(
            self.right_fields(),
            self.condition.as_ref().map(|c| &c.right_attribute),
        )?;
        Some(JoinCondition {
            left_attribute: left,
            operator: self.condition.as_ref().map(|c| c.operator).unwrap_or_default(),
            right_attribute: right,
        })
    }
}

impl NodeEditor for JoinEditor {
    fn kind(&self) -> NodeKind {
        NodeKind::Join
    }

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn set_input(&mut self, port: Port, input: Input) {
        match port {
            Port::Left => self.left = input,
            Port::Right => self.right = input,
            Port::In => {}
        }
    }

    fn compute(&self) -> ValidationResult<(Clause, Published)> {
        let mut issues = Vec::new();
        let left = self.left.require(Port::Left).map_err(|i| issues.push(i)).ok();
        let right = self.right.require(Port::Right).map_err(|i| issues.push(i)).ok();
        let (left, right) = match (left, right) {
            (Some(left), Some(right)) => (left, right),
            _ => return Err(issues),
        };

        let condition = self.effective_condition().ok_or_else(|| {
            vec![ValidationIssue::NoFieldsSelected.at(IssueLocation::JoinCondition)]
        })?;

        let fields = renumber(left.fields.iter().chain(right.fields.iter()).cloned());
        let clause = Clause::Join(JoinClause {
            fields: fields.iter().map(|f| f.name.clone()).collect(),
            condition: (
                condition.left_attribute,
                condition.operator,
                condition.right_attribute,
            ),
        });
        let stream = match (&left.stream, &right.stream) {
            (Some(l), Some(r)) if l == r => Some(l.clone()),
            _ => None,
        };
        Ok((clause, Published::new(stream, fields)))
    }
}
