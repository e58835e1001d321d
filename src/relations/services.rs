use tracing::{info, warn};
use uuid::Uuid;

use super::repo::RelationStore;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// user → recipe
    Favorite,
    /// user → recipe
    ShoppingCart,
    /// subscriber → author
    Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Add,
    Remove,
}

impl RelationKind {
    /// (table, actor column, target column)
    pub(crate) fn columns(self) -> (&'static str, &'static str, &'static str) {
        match self {
            RelationKind::Favorite => ("favorites", "user_id", "recipe_id"),
            RelationKind::ShoppingCart => ("shopping_cart", "user_id", "recipe_id"),
            RelationKind::Subscription => ("subscriptions", "subscriber_id", "author_id"),
        }
    }

    pub fn already_present(self) -> &'static str {
        match self {
            RelationKind::Favorite => "This recipe is already in your favorites.",
            RelationKind::ShoppingCart => "This recipe is already in your shopping cart.",
            RelationKind::Subscription => "You are already subscribed to that user.",
        }
    }

    pub fn not_present(self) -> &'static str {
        match self {
            RelationKind::Favorite => "This recipe is not in your favorites.",
            RelationKind::ShoppingCart => "This recipe is not in your shopping cart.",
            RelationKind::Subscription => "Not subscribed to that user.",
        }
    }
}

pub const SELF_SUBSCRIBE: &str = "Cannot subscribe to yourself.";

/// Moves the (actor, target) pair to the state requested by `action`.
///
/// The caller is responsible for checking that `target` exists.
pub async fn toggle<R>(
    store: &R,
    kind: RelationKind,
    actor: Uuid,
    target: Uuid,
    action: ToggleAction,
) -> Result<(), AppError>
where
    R: RelationStore + ?Sized,
{
    if kind == RelationKind::Subscription && actor == target {
        warn!(%actor, "self-subscription rejected");
        return Err(AppError::Conflict(SELF_SUBSCRIBE.into()));
    }

    let changed = match action {
        ToggleAction::Add => store.insert_pair(kind, actor, target).await?,
        ToggleAction::Remove => store.delete_pair(kind, actor, target).await?,
    };

    if !changed {
        let msg = match action {
            ToggleAction::Add => kind.already_present(),
            ToggleAction::Remove => kind.not_present(),
        };
        warn!(?kind, ?action, %actor, %target, "redundant toggle");
        return Err(AppError::Conflict(msg.into()));
    }

    info!(?kind, ?action, %actor, %target, "relation toggled");
    Ok(())
}
