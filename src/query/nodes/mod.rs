pub mod aggregate;
pub mod group_by;
pub mod join;
pub mod project;
pub mod select;
pub mod stream_ref;

pub use aggregate::AggregateEditor;
pub use group_by::GroupByEditor;
pub use join::JoinEditor;
pub use project::ProjectEditor;
pub use select::SelectEditor;
pub use stream_ref::StreamRefEditor;

use crate::model::FieldSelection;

/// Apply a persisted field list once candidates are known
pub(crate) fn apply_seed(pending: &mut Option<Vec<String>>, selection: &mut [FieldSelection]) {
    if selection.is_empty() {
        return;
    }
    if let Some(names) = pending.take() {
        for item in selection.iter_mut() {
            item.checked = names.contains(&item.field.name);
        }
    }
}
