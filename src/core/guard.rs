//! Guard predicates for controlling state transitions.
//!
//! Guards are pure boolean functions over the entity (and optionally the
//! call arguments) that must all hold before a transition body runs.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type Predicate<E> = Arc<dyn Fn(&E, &Value) -> bool + Send + Sync>;

/// Pure predicate that determines if a transition can execute.
///
/// Every guard carries a name so a rejected transition can report exactly
/// which conditions blocked it.
///
/// # Example
///
/// ```rust
/// use statewarden::core::Guard;
/// use serde_json::Value;
///
/// struct Post {
///     body: String,
/// }
///
/// let has_body = Guard::named("has_body", |post: &Post| !post.body.is_empty());
///
/// assert!(has_body.check(&Post { body: "hello".into() }, &Value::Null));
/// assert!(!has_body.check(&Post { body: String::new() }, &Value::Null));
/// assert_eq!(has_body.name(), "has_body");
/// ```
pub struct Guard<E> {
    name: String,
    predicate: Predicate<E>,
}

impl<E: 'static> Guard<E> {
    /// Create a guard over the entity alone.
    ///
    /// The predicate must be pure (deterministic, no side effects) and
    /// thread-safe (Send + Sync).
    pub fn named<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Guard {
            name: name.into(),
            predicate: Arc::new(move |entity: &E, _: &Value| predicate(entity)),
        }
    }

    /// Create a guard that also inspects the call arguments.
    ///
    /// Arguments are `Value::Null` when the invocation supplied none.
    pub fn with_args<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&E, &Value) -> bool + Send + Sync + 'static,
    {
        Guard {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// The name reported when this guard blocks a transition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the guard allows the transition.
    pub fn check(&self, entity: &E, args: &Value) -> bool {
        (self.predicate)(entity, args)
    }

    pub(crate) fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<E> Clone for Guard<E> {
    fn clone(&self) -> Self {
        Guard {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E> fmt::Debug for Guard<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("name", &self.name).finish()
    }
}
