//! Permission checks gating who may run a transition.

use std::fmt;
use std::sync::Arc;

/// An acting principal whose grants can be queried by name.
pub trait Actor {
    /// Check whether the actor holds the named permission grant.
    fn has_permission(&self, permission: &str) -> bool;
}

/// The anonymous actor holds no grants.
impl Actor for () {
    fn has_permission(&self, _permission: &str) -> bool {
        false
    }
}

type PermissionPredicate<E, U> = Arc<dyn Fn(&E, &U) -> bool + Send + Sync>;

/// Permission required to run a transition.
pub enum Permission<E, U> {
    /// A named grant, resolved through [`Actor::has_permission`].
    Named(String),
    /// An arbitrary predicate over the entity and the actor.
    Predicate(PermissionPredicate<E, U>),
}

impl<E, U: Actor> Permission<E, U> {
    pub fn check(&self, entity: &E, actor: &U) -> bool {
        match self {
            Permission::Named(permission) => actor.has_permission(permission),
            Permission::Predicate(predicate) => predicate(entity, actor),
        }
    }
}

impl<E, U> Permission<E, U> {
    /// Label used in rejection diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Permission::Named(permission) => permission.clone(),
            Permission::Predicate(_) => "<predicate>".to_string(),
        }
    }
}

impl<E, U> Clone for Permission<E, U> {
    fn clone(&self) -> Self {
        match self {
            Permission::Named(permission) => Permission::Named(permission.clone()),
            Permission::Predicate(predicate) => Permission::Predicate(Arc::clone(predicate)),
        }
    }
}

impl<E, U> fmt::Debug for Permission<E, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Named(permission) => f.debug_tuple("Named").field(permission).finish(),
            Permission::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
