//! Stream and enum declaration editors, and the workspace that gates them

pub mod catalog;
pub mod enumeration;
pub mod stream;
pub mod workspace;

use std::collections::BTreeSet;

pub use catalog::Catalog;
pub use enumeration::{EnumDecl, EnumEditor};
pub use stream::{StreamDecl, StreamEditor};
pub use workspace::{EntityNode, EntityWorkspace};

/// Lifecycle of an entity editor
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum EditorState {
    #[default]
    Draft,
    Valid,
    Committed,
}

/// Read-only snapshot of names an editor validates against
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReservedNames {
    /// Names already taken by entities of the same kind
    pub names: BTreeSet<String>,
    /// Enum names visible to stream attributes
    pub enums: BTreeSet<String>,
}

impl ReservedNames {
    pub fn new(
        names: impl IntoIterator<Item = String>,
        enums: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            names: names.into_iter().collect(),
            enums: enums.into_iter().collect(),
        }
    }
}
