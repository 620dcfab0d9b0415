//! Shared contract of the query node editors
//!
//! Every editor owns a [`NodeCore`] holding its completion state and the
//! field-set it currently publishes. Upstream field-sets arrive as [`Input`]
//! snapshots handed over by the graph, so editors never hold references to
//! other nodes.

use tracing::debug;

use super::clause::Clause;
use super::kind::{NodeKind, Port};
use crate::errors::{Issues, ValidationIssue, ValidationResult};
use crate::model::FieldRef;

/// Completion state of a query node
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum NodeState {
    #[default]
    Incomplete,
    Complete(Clause),
}

impl NodeState {
    pub fn is_complete(&self) -> bool {
        matches!(self, NodeState::Complete(_))
    }

    pub fn clause(&self) -> Option<&Clause> {
        match self {
            NodeState::Complete(clause) => Some(clause),
            NodeState::Incomplete => None,
        }
    }
}

/// Field-set a complete node exposes to its consumers
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Published {
    /// Stream the fields originate from, when there is exactly one
    pub stream: Option<String>,
    pub fields: Vec<FieldRef>,
}

impl Published {
    pub fn new(stream: Option<String>, fields: Vec<FieldRef>) -> Self {
        Self { stream, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldRef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// What a consumer sees on one of its ports
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Input {
    /// No edge on the port
    #[default]
    Disconnected,
    /// Edge present, upstream not complete
    Pending,
    /// Upstream complete with its published field-set
    Ready(Published),
}

impl Input {
    pub fn published(&self) -> Option<&Published> {
        match self {
            Input::Ready(published) => Some(published),
            _ => None,
        }
    }

    /// Resolve the input for computation, naming the port in the issue
    pub fn require(&self, port: Port) -> Result<&Published, ValidationIssue> {
        match self {
            Input::Ready(published) => Ok(published),
            Input::Pending => Err(ValidationIssue::UpstreamIncomplete(port.label())),
            Input::Disconnected => Err(ValidationIssue::NotConnected(port.label())),
        }
    }
}

/// State every editor carries
#[derive(Clone, Debug, Default)]
pub struct NodeCore {
    state: NodeState,
    output: Option<Published>,
}

impl NodeCore {
    /// Core of a node reconstructed from a persisted clause; the output is
    /// derived once upstream inputs are wired.
    pub fn seeded(clause: Clause) -> Self {
        Self {
            state: NodeState::Complete(clause),
            output: None,
        }
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn output(&self) -> Option<&Published> {
        self.output.as_ref()
    }

    fn complete(&mut self, clause: Clause, output: Published) {
        self.state = NodeState::Complete(clause);
        self.output = Some(output);
    }

    fn invalidate(&mut self) {
        self.state = NodeState::Incomplete;
        self.output = None;
    }
}

/// Common contract of the query node editors
pub trait NodeEditor {
    fn kind(&self) -> NodeKind;

    fn core(&self) -> &NodeCore;

    fn core_mut(&mut self) -> &mut NodeCore;

    /// Replace the input on `port` without recomputing
    fn set_input(&mut self, port: Port, input: Input);

    /// Derive the clause and published field-set from the current editing
    /// state. Pure: calling it twice yields the same result.
    fn compute(&self) -> ValidationResult<(Clause, Published)>;

    fn state(&self) -> &NodeState {
        self.core().state()
    }

    fn is_complete(&self) -> bool {
        self.core().state().is_complete()
    }

    /// Published field-set, present only while complete
    fn published(&self) -> Option<&Published> {
        match self.core().state() {
            NodeState::Complete(_) => self.core().output(),
            NodeState::Incomplete => None,
        }
    }

    /// Issues that currently block `finish`
    fn issues(&self) -> Issues {
        self.compute().err().unwrap_or_default()
    }

    /// Recompute after an upstream change. A complete node stays complete
    /// while its editing state is still valid; an incomplete one stays
    /// incomplete until finished.
    fn refresh(&mut self) {
        if !self.is_complete() {
            self.core_mut().invalidate();
            return;
        }
        match self.compute() {
            Ok((clause, output)) => self.core_mut().complete(clause, output),
            Err(issues) => {
                debug!(kind = %self.kind(), issues = issues.len(), "Node invalidated by upstream change");
                self.core_mut().invalidate();
            }
        }
    }

    fn reconnect(&mut self, port: Port, input: Input) {
        self.set_input(port, input);
        self.refresh();
    }

    /// Validate and store the clause. On failure nothing changes.
    fn finish(&mut self) -> ValidationResult<Clause> {
        let (clause, output) = self.compute()?;
        debug!(kind = %self.kind(), fields = output.fields.len(), "Node finished");
        self.core_mut().complete(clause.clone(), output);
        Ok(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveType;

    #[test]
    fn test_input_require() {
        assert_eq!(
            Input::Disconnected.require(Port::Left),
            Err(ValidationIssue::NotConnected("left"))
        );
        assert_eq!(
            Input::Pending.require(Port::In),
            Err(ValidationIssue::UpstreamIncomplete("input"))
        );
        let published = Published::new(
            None,
            vec![FieldRef::new("0", "a", PrimitiveType::Float.into())],
        );
        let input = Input::Ready(published.clone());
        assert_eq!(input.require(Port::In), Ok(&published));
        assert!(published.field("a").is_some());
    }

    #[test]
    fn test_state_clause() {
        assert!(NodeState::Incomplete.clause().is_none());
        assert!(!NodeState::default().is_complete());
    }
}
