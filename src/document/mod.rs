//! Persisted document formats
//!
//! `.qry` files hold a [`QueryDoc`]; `.str` and `.enum` files hold a single
//! stream or enum declaration. Create/update calls wrap declarations in an
//! [`EntitiesDoc`].

pub mod entities;
pub mod query;

pub use entities::{EntitiesDoc, EntityGroup, EntityKind};
pub use query::{DocEdge, DocNode, Position, QueryDoc};
