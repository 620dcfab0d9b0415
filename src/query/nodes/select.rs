use crate::errors::{IssueLocation, ValidationIssue, ValidationResult};
use crate::model::FieldRef;
use crate::query::clause::{Clause, SelectClause, WhereTuple};
use crate::query::kind::{NodeKind, Port};
use crate::query::node::{Input, NodeCore, NodeEditor, Published};
use crate::query::predicate::{Chain, Operator, WhereChain, WhereCondition};

/// Reads one stream, qualifies its fields and filters with a where chain
#[derive(Clone, Debug, Default)]
pub struct SelectEditor {
    core: NodeCore,
    input: Input,
    candidates: Vec<FieldRef>,
    conditions: WhereChain,
    // persisted where list, resolved once candidates are known
    pending: Option<Vec<WhereTuple>>,
}

/// `stream.attr` names for every field of the upstream stream
fn qualify(published: &Published) -> Vec<FieldRef> {
    published
        .fields
        .iter()
        .map(|field| {
            let name = match &published.stream {
                Some(stream) => format!("{}.{}", stream, field.name),
                None => field.name.clone(),
            };
            FieldRef::new(field.field_id.clone(), name, field.field_type.clone())
        })
        .collect()
}

impl SelectEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clause(clause: SelectClause) -> Self {
        Self {
            pending: Some(clause.conditions.clone()),
            core: NodeCore::seeded(Clause::Select(clause)),
            ..Self::default()
        }
    }

    /// Qualified fields offered by the connected stream
    pub fn candidates(&self) -> &[FieldRef] {
        &self.candidates
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        self.conditions.conditions()
    }

    /// Append `<first field> eq ""`, linking the previous tail with AND
    pub fn add_condition(&mut self) -> usize {
        let attribute = self
            .candidates
            .first()
            .map(|f| f.field_id.clone())
            .unwrap_or_else(|| "0".to_string());
        self.conditions
            .push(WhereCondition::new(attribute, Operator::Eq, ""))
    }

    pub fn push_condition(&mut self, condition: WhereCondition) -> usize {
        self.conditions.push(condition)
    }

    pub fn remove_condition(&mut self, index: usize) -> Option<WhereCondition> {
        self.conditions.remove(index)
    }

    pub fn condition_mut(&mut self, index: usize) -> Option<&mut WhereCondition> {
        self.conditions.get_mut(index)
    }

    pub fn set_next(&mut self, index: usize, chain: Chain) -> Result<(), ValidationIssue> {
        self.conditions.set_next(index, chain)
    }

    fn field_by_id(&self, id: &str) -> Option<&FieldRef> {
        self.candidates.iter().find(|f| f.field_id == id)
    }

    fn resolve_pending(&mut self, tuples: Vec<WhereTuple>) {
        let conditions = tuples
            .into_iter()
            .map(|(name, operator, rhs, next)| {
                let attribute = self
                    .candidates
                    .iter()
                    .find(|f| f.name == name)
                    .map(|f| f.field_id.clone())
                    .unwrap_or(name);
                WhereCondition {
                    attribute,
                    operator,
                    rhs,
                    next,
                }
            })
            .collect();
        self.conditions = WhereChain::from_conditions(conditions);
    }
}

impl NodeEditor for SelectEditor {
    fn kind(&self) -> NodeKind {
        NodeKind::Select
    }

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn set_input(&mut self, _port: Port, input: Input) {
        let previous = std::mem::take(&mut self.candidates);
        self.candidates = input.published().map(qualify).unwrap_or_default();
        self.input = input;

        if self.candidates.is_empty() {
            return;
        }
        if let Some(tuples) = self.pending.take() {
            self.resolve_pending(tuples);
            return;
        }

        // carry conditions over by field name
        let remapped: Vec<WhereCondition> = self
            .conditions
            .conditions()
            .iter()
            .map(|condition| {
                let mut condition = condition.clone();
                let name = previous
                    .iter()
                    .find(|f| f.field_id == condition.attribute)
                    .map(|f| f.name.as_str());
                if let Some(field) =
                    name.and_then(|name| self.candidates.iter().find(|f| f.name == name))
                {
                    condition.attribute = field.field_id.clone();
                }
                condition
            })
            .collect();
        self.conditions = WhereChain::from_conditions(remapped);
    }

    fn compute(&self) -> ValidationResult<(Clause, Published)> {
        let upstream = self.input.require(Port::In).map_err(|issue| vec![issue])?;
        let stream = upstream
            .stream
            .clone()
            .ok_or_else(|| vec![ValidationIssue::NoStreamSelected])?;

        let mut issues = Vec::new();
        let mut tuples = Vec::with_capacity(self.conditions.len());
        let last = self.conditions.len().saturating_sub(1);

        for (idx, condition) in self.conditions.conditions().iter().enumerate() {
            let location = IssueLocation::Condition(idx);
            let field = self.field_by_id(&condition.attribute);
            if field.is_none() {
                issues.push(
                    ValidationIssue::UnknownAttribute(condition.attribute.clone()).at(location),
                );
            }
            if condition.rhs.trim().is_empty() {
                issues.push(ValidationIssue::EmptyValue.at(location));
            }
            match (idx == last, condition.next) {
                (false, None) => issues.push(ValidationIssue::BrokenChain.at(location)),
                (true, Some(_)) => issues.push(ValidationIssue::DanglingChain.at(location)),
                _ => {}
            }
            if let Some(field) = field {
                tuples.push((
                    field.name.clone(),
                    condition.operator,
                    condition.rhs.clone(),
                    condition.next,
                ));
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        let clause = Clause::Select(SelectClause {
            stream: stream.clone(),
            fields: self.candidates.iter().map(|f| f.name.clone()).collect(),
            conditions: tuples,
        });
        Ok((clause, Published::new(Some(stream), self.candidates.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveType;
    use crate::query::node::NodeState;

    fn orders() -> Input {
        Input::Ready(Published::new(
            Some("Orders".to_string()),
            vec![
                FieldRef::new("0", "orderId", PrimitiveType::Integer.into()),
                FieldRef::new("1", "amount", PrimitiveType::Float.into()),
            ],
        ))
    }

    #[test]
    fn test_qualifies_stream_fields() {
        let mut editor = SelectEditor::new();
        editor.reconnect(Port::In, orders());
        let names: Vec<_> = editor.candidates().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Orders.orderId", "Orders.amount"]);
    }

    #[test]
    fn test_where_clause() {
        let mut editor = SelectEditor::new();
        editor.reconnect(Port::In, orders());
        editor.push_condition(WhereCondition::new("1", Operator::Gt, "100"));
        let clause = editor.finish().unwrap();
        assert_eq!(
            clause.to_value().unwrap(),
            serde_json::json!({
                "stream": "Orders",
                "fields": ["Orders.orderId", "Orders.amount"],
                "where": [["Orders.amount", "gt", "100", null]]
            })
        );
    }

    #[test]
    fn test_empty_rhs_blocks_finish() {
        let mut editor = SelectEditor::new();
        editor.reconnect(Port::In, orders());
        editor.add_condition();
        let issues = editor.finish().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].root(), &ValidationIssue::EmptyValue);
        assert_eq!(editor.state(), &NodeState::Incomplete);
    }

    #[test]
    fn test_requires_connection() {
        let mut editor = SelectEditor::new();
        assert_eq!(
            editor.finish().unwrap_err(),
            vec![ValidationIssue::NotConnected("input")]
        );
        editor.reconnect(Port::In, Input::Pending);
        assert_eq!(
            editor.finish().unwrap_err(),
            vec![ValidationIssue::UpstreamIncomplete("input")]
        );
    }

    #[test]
    fn test_disconnect_empties_output() {
        let mut editor = SelectEditor::new();
        editor.reconnect(Port::In, orders());
        editor.finish().unwrap();
        assert!(editor.published().is_some());

        editor.reconnect(Port::In, Input::Disconnected);
        assert!(editor.published().is_none());
        assert!(!editor.is_complete());
    }

    #[test]
    fn test_seeded_where_resolves_names() {
        let clause = SelectClause {
            stream: "Orders".to_string(),
            fields: vec!["Orders.orderId".to_string(), "Orders.amount".to_string()],
            conditions: vec![
                ("Orders.amount".to_string(), Operator::Gt, "100".to_string(), Some(Chain::Or)),
                ("Orders.orderId".to_string(), Operator::Eq, "7".to_string(), None),
            ],
        };
        let mut editor = SelectEditor::from_clause(clause.clone());
        editor.reconnect(Port::In, orders());
        assert_eq!(editor.conditions()[0].attribute, "1");
        assert_eq!(editor.state(), &NodeState::Complete(Clause::Select(clause)));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let mut editor = SelectEditor::new();
        editor.reconnect(Port::In, orders());
        editor.push_condition(WhereCondition::new("0", Operator::Neq, "3"));
        assert_eq!(editor.compute(), editor.compute());
    }
}
