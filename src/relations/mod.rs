//! Many-to-many "toggle" relationships between a user and a recipe or
//! another user: favorites, shopping cart entries and subscriptions.
//!
//! Each (user, target) pair is either absent or present. Adding a present
//! pair and removing an absent one are both rejected. The check-and-write is
//! a single statement against a unique index, so the storage layer decides
//! races.

mod repo;
mod services;

pub use repo::RelationStore;
pub use services::{toggle, RelationKind, ToggleAction};

#[cfg(test)]
pub(crate) use repo::memory::MemoryRelations;
