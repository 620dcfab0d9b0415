use crate::errors::{IssueLocation, ValidationIssue, ValidationResult};
use crate::model::{carry_selection, FieldSelection};
use crate::query::clause::{Clause, GroupByClause};
use crate::query::kind::{NodeKind, Port};
use crate::query::node::{Input, NodeCore, NodeEditor, Published};
use crate::query::predicate::{Having, Operator};

use super::apply_seed;

/// Groups by the checked fields, filtered by one HAVING predicate
#[derive(Clone, Debug, Default)]
pub struct GroupByEditor {
    core: NodeCore,
    input: Input,
    selection: Vec<FieldSelection>,
    having: Option<Having>,
    pending: Option<Vec<String>>,
}

impl GroupByEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clause(clause: GroupByClause) -> Self {
        let (attribute, operator, rhs) = clause.having.clone();
        Self {
            pending: Some(clause.fields.clone()),
            having: Some(Having {
                attribute,
                operator,
                rhs,
            }),
            core: NodeCore::seeded(Clause::GroupBy(clause)),
            ..Self::default()
        }
    }

    pub fn selection(&self) -> &[FieldSelection] {
        &self.selection
    }

    pub fn set_checked(&mut self, name: &str, checked: bool) -> bool {
        match self.selection.iter_mut().find(|s| s.field.name == name) {
            Some(selection) => {
                selection.checked = checked;
                true
            }
            None => false,
        }
    }

    pub fn having(&self) -> Option<&Having> {
        self.having.as_ref()
    }

    pub fn set_having(&mut self, attribute: impl Into<String>, operator: Operator, rhs: impl Into<String>) {
        self.having = Some(Having {
            attribute: attribute.into(),
            operator,
            rhs: rhs.into(),
        });
    }

    /// HAVING with its attribute falling back to the first checked field
    pub fn effective_having(&self) -> Option<Having> {
        let mut checked = self.selection.iter().filter(|s| s.checked);
        let first = checked.clone().next()?;
        let having = self.having.clone().unwrap_or(Having {
            attribute: String::new(),
            operator: Operator::Eq,
            rhs: String::new(),
        });
        let attribute = if checked.any(|s| s.field.name == having.attribute) {
            having.attribute
        } else {
            first.field.name.clone()
        };
        Some(Having {
            attribute,
            ..having
        })
    }
}

impl NodeEditor for GroupByEditor {
    fn kind(&self) -> NodeKind {
        NodeKind::GroupBy
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

        let having = match self.effective_having() {
            Some(having) => having,
            None => return Err(vec![ValidationIssue::NoFieldsSelected]),
        };
        if having.rhs.trim().is_empty() {
            return Err(vec![ValidationIssue::EmptyValue.at(IssueLocation::Having)]);
        }

        let clause = Clause::GroupBy(GroupByClause {
            fields: fields.iter().map(|f| f.name.clone()).collect(),
            having: (having.attribute, having.operator, having.rhs),
        });
        Ok((clause, Published::new(upstream.stream.clone(), fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldRef, PrimitiveType};

    fn upstream() -> Input {
        Input::Ready(Published::new(
            Some("Orders".to_string()),
            vec![
                FieldRef::new("0", "Orders.status", PrimitiveType::String.into()),
                FieldRef::new("1", "Orders.amount", PrimitiveType::Float.into()),
            ],
        ))
    }

    #[test]
    fn test_requires_grouping_field_and_value() {
        let mut editor = GroupByEditor::new();
        editor.reconnect(Port::In, upstream());
        assert_eq!(
            editor.finish().unwrap_err(),
            vec![ValidationIssue::NoFieldsSelected]
        );

        editor.set_checked("Orders.status", true);
        let issues = editor.finish().unwrap_err();
        assert_eq!(issues[0].location(), Some(IssueLocation::Having));
    }

    #[test]
    fn test_having_attribute_defaults_to_first_checked() {
        let mut editor = GroupByEditor::new();
        editor.reconnect(Port::In, upstream());
        editor.set_checked("Orders.amount", true);
        editor.set_having("Orders.status", Operator::Gt, "3");
        let clause = editor.finish().unwrap();
        assert_eq!(
            clause.to_value().unwrap(),
            serde_json::json!({
                "fields": ["Orders.amount"],
                "having": ["Orders.amount", "gt", "3"]
            })
        );
    }

    #[test]
    fn test_seeded_round_trip() {
        let clause = GroupByClause {
            fields: vec!["Orders.status".to_string()],
            having: ("Orders.status".to_string(), Operator::Neq, "CLOSED".to_string()),
        };
        let mut editor = GroupByEditor::from_clause(clause.clone());
        editor.reconnect(Port::In, upstream());
        assert_eq!(editor.state().clause(), Some(&Clause::GroupBy(clause)));
    }
}
