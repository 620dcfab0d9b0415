//! Query node editors
//!
//! Each node kind (stream reference, select, project, join, group-by,
//! aggregate) consumes the field-sets published by its upstream nodes,
//! applies its own transform and republishes a new field-set together with a
//! canonical [`Clause`].

pub mod clause;
pub mod editor;
pub mod kind;
pub mod node;
pub mod nodes;
pub mod predicate;

pub use clause::{AggregateFunction, Clause};
pub use editor::QueryNode;
pub use kind::{NodeKind, Port};
pub use node::{Input, NodeEditor, NodeState, Published};
pub use predicate::{Chain, Having, JoinCondition, Operator, WhereCondition};
