//! Transition executor.
//!
//! Runs an operation body under the control of the registry:
//!
//! 1. select the first declared transition of the operation whose source
//!    set matches the current state and whose guards all pass
//! 2. check its permission when an actor is supplied
//! 3. send the pre-notification
//! 4. open the protected field, run the body
//! 5. commit the target on success, or the error target on failure
//! 6. close the field (also on panic) and send the post-notification,
//!    only when the body succeeded
//!
//! A refused transition never runs the body and never changes the state.

mod error;
mod signals;

pub use error::{Rejection, TransitionError, TransitionNotAllowed};
pub use signals::{EventKind, TransitionEvent, TransitionListener};

use crate::core::{Actor, FsmField, Outcome, State, TransitionRecord};
use crate::registry::{FieldMut, Fsm, TransitionDescriptor};
use chrono::Utc;
use serde_json::Value;
use std::convert::Infallible;
use stillwater::validation::Validation;

/// A pending call of one operation, with optional arguments and actor.
pub struct Invocation<'f, 'a, E, S: State, U> {
    fsm: &'f Fsm<E, S, U>,
    operation: &'a str,
    args: Value,
    actor: Option<&'a U>,
}

impl<E: 'static, S: State, U: Actor> Fsm<E, S, U> {
    /// Prepare a call of `operation`.
    pub fn call<'f, 'a>(&'f self, operation: &'a str) -> Invocation<'f, 'a, E, S, U> {
        Invocation {
            fsm: self,
            operation,
            args: Value::Null,
            actor: None,
        }
    }

    /// Run `body` as `operation` with no arguments and no actor.
    pub fn invoke<R, B, F>(
        &self,
        entity: &mut E,
        operation: &str,
        body: F,
    ) -> Result<R, TransitionError<B>>
    where
        F: FnOnce(&mut E) -> Result<R, B>,
    {
        self.call(operation).run(entity, body)
    }

    /// Move the state as `operation` without any side effect.
    pub fn apply(&self, entity: &mut E, operation: &str) -> Result<(), TransitionError<Infallible>> {
        self.call(operation).apply(entity)
    }

    fn notify(&self, kind: EventKind, entity: &E, operation: &str, source: &S, target: Option<&S>) {
        if self.listeners.is_empty() {
            return;
        }
        let event = TransitionEvent {
            kind,
            entity,
            owner: self.owner,
            attribute: &self.attribute,
            operation,
            source,
            target,
        };
        for listener in &self.listeners {
            listener.on_transition(&event);
        }
    }
}

impl<'f, 'a, E: 'static, S: State, U: Actor> Invocation<'f, 'a, E, S, U> {
    /// Arguments visible to argument-aware guards and computed targets.
    pub fn args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    /// Check the chosen transition's permission against `actor`.
    pub fn actor(mut self, actor: &'a U) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Move the state without any side effect.
    pub fn apply(self, entity: &mut E) -> Result<(), TransitionError<Infallible>> {
        self.run(entity, |_| Ok(()))
    }

    /// Run `body` as this operation.
    ///
    /// On success the body's value is returned and the state is the
    /// transition's target. On failure the body's error is returned as
    /// [`TransitionError::Failed`] and the state is the error target if one
    /// was declared, unchanged otherwise.
    pub fn run<R, B, F>(self, entity: &mut E, body: F) -> Result<R, TransitionError<B>>
    where
        F: FnOnce(&mut E) -> Result<R, B>,
    {
        let fsm = self.fsm;
        let descriptor = self.select(entity)?;
        let source = fsm.state(entity).clone();

        tracing::debug!(
            owner = fsm.owner,
            attribute = %fsm.attribute,
            operation = self.operation,
            from = %source.name(),
            "transition selected"
        );
        fsm.notify(
            EventKind::Pre,
            entity,
            self.operation,
            &source,
            descriptor.target().fixed(),
        );

        let mut scope = TransitionScope::open(fsm.field_mut, entity);
        match body(scope.entity()) {
            Ok(value) => {
                let target = match descriptor.target().resolve(scope.entity(), &self.args) {
                    Ok(target) => target,
                    Err(resolved) => {
                        // An out-of-range result counts as a failed body.
                        if let Some(error_state) = descriptor.on_error() {
                            scope.commit(error_state);
                            if fsm.record_history {
                                scope.record(self.operation, &source, error_state, Outcome::Redirected);
                            }
                        }
                        drop(scope);
                        tracing::debug!(
                            owner = fsm.owner,
                            attribute = %fsm.attribute,
                            operation = self.operation,
                            resolved = %resolved.name(),
                            redirected = descriptor.on_error().is_some(),
                            "computed target outside allowed states"
                        );
                        return Err(TransitionError::InvalidResultState {
                            operation: self.operation.to_string(),
                            resolved: resolved.name().into_owned(),
                            allowed: descriptor
                                .target()
                                .possible()
                                .iter()
                                .map(|s| s.name().into_owned())
                                .collect(),
                        });
                    }
                };

                scope.commit(&target);
                if fsm.record_history {
                    scope.record(self.operation, &source, &target, Outcome::Completed);
                }
                drop(scope);

                tracing::debug!(
                    owner = fsm.owner,
                    attribute = %fsm.attribute,
                    operation = self.operation,
                    from = %source.name(),
                    to = %target.name(),
                    "transition completed"
                );
                fsm.notify(EventKind::Post, entity, self.operation, &source, Some(&target));
                Ok(value)
            }
            Err(error) => {
                if let Some(error_state) = descriptor.on_error() {
                    scope.commit(error_state);
                    if fsm.record_history {
                        scope.record(self.operation, &source, error_state, Outcome::Redirected);
                    }
                    tracing::debug!(
                        owner = fsm.owner,
                        attribute = %fsm.attribute,
                        operation = self.operation,
                        from = %source.name(),
                        to = %error_state.name(),
                        "transition failed, redirected to error state"
                    );
                } else {
                    tracing::debug!(
                        owner = fsm.owner,
                        attribute = %fsm.attribute,
                        operation = self.operation,
                        from = %source.name(),
                        "transition failed, state unchanged"
                    );
                }
                Err(TransitionError::Failed(error))
            }
        }
    }

    fn select(&self, entity: &E) -> Result<&'f TransitionDescriptor<E, S, U>, TransitionNotAllowed> {
        let fsm = self.fsm;
        let current = fsm.state(entity);

        if !fsm.has_operation(self.operation) {
            return Err(self.reject(current, Rejection::UnknownOperation));
        }

        let mut matched = false;
        let mut blocked = Vec::new();
        let mut chosen = None;
        for descriptor in fsm.transitions_named(self.operation) {
            if !descriptor.matches_source(current) {
                continue;
            }
            matched = true;
            match descriptor.check_conditions(entity, &self.args) {
                Validation::Success(_) => {
                    chosen = Some(descriptor);
                    break;
                }
                Validation::Failure(names) => {
                    tracing::trace!(
                        operation = self.operation,
                        blocked = names.len(),
                        "candidate transition blocked by guards"
                    );
                    blocked.extend(names.iter().cloned());
                }
            }
        }

        let Some(descriptor) = chosen else {
            let reason = if matched {
                Rejection::GuardsFailed { blocked }
            } else {
                Rejection::NoMatchingSource
            };
            return Err(self.reject(current, reason));
        };

        if let (Some(actor), Some(permission)) = (self.actor, descriptor.permission()) {
            if !permission.check(entity, actor) {
                return Err(self.reject(
                    current,
                    Rejection::PermissionDenied {
                        permission: permission.describe(),
                    },
                ));
            }
        }

        Ok(descriptor)
    }

    fn reject(&self, current: &S, reason: Rejection) -> TransitionNotAllowed {
        let rejected = TransitionNotAllowed {
            owner: self.fsm.owner,
            attribute: self.fsm.attribute.clone(),
            operation: self.operation.to_string(),
            state: current.name().into_owned(),
            reason,
        };
        tracing::debug!(
            owner = rejected.owner,
            attribute = %rejected.attribute,
            operation = %rejected.operation,
            state = %rejected.state,
            reason = %rejected.reason,
            "transition rejected"
        );
        rejected
    }
}

/// Open transition on one field. Closing happens on drop, so the field is
/// re-locked even when the body panics.
struct TransitionScope<'e, E, S: State> {
    entity: &'e mut E,
    field_mut: FieldMut<E, S>,
}

impl<'e, E, S: State> TransitionScope<'e, E, S> {
    fn open(field_mut: FieldMut<E, S>, entity: &'e mut E) -> Self {
        field_mut(entity).begin_transition();
        Self { entity, field_mut }
    }

    fn entity(&mut self) -> &mut E {
        &mut *self.entity
    }

    fn field(&mut self) -> &mut FsmField<S> {
        (self.field_mut)(&mut *self.entity)
    }

    fn commit(&mut self, state: &S) {
        self.field().commit_state(state.clone());
    }

    fn record(&mut self, operation: &str, from: &S, to: &S, outcome: Outcome) {
        self.field().record(TransitionRecord {
            operation: operation.to_string(),
            from: from.clone(),
            to: to.clone(),
            outcome,
            timestamp: Utc::now(),
        });
    }
}

impl<E, S: State> Drop for TransitionScope<'_, E, S> {
    fn drop(&mut self) {
        self.field().end_transition();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FsmBuilder;
    use crate::core::FsmField;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Boom;

    struct User {
        grants: Vec<&'static str>,
    }

    impl Actor for User {
        fn has_permission(&self, permission: &str) -> bool {
            self.grants.contains(&permission)
        }
    }

    struct Post {
        state: FsmField<String>,
        words: usize,
        reviewed: bool,
        body_runs: usize,
    }

    fn post() -> Post {
        Post {
            state: FsmField::protected("new"),
            words: 0,
            reviewed: false,
            body_runs: 0,
        }
    }

    fn builder() -> FsmBuilder<Post, String, User> {
        FsmBuilder::for_actor("state", |p: &Post| &p.state, |p: &mut Post| &mut p.state)
    }

    fn fsm() -> Fsm<Post, String, User> {
        builder()
            .transition("publish", |t| {
                t.from("new")
                    .to("published")
                    .when_named("long_enough", |p: &Post| p.words >= 100)
                    .when_named("reviewed", |p: &Post| p.reviewed)
                    .permission("blog.publish")
            })
            .transition("remove", |t| t.from("published").to("removed").on_error("failed"))
            .transition("archive", |t| t.from("published").to("archived"))
            .record_history()
            .build()
            .unwrap()
    }

    fn ready() -> Post {
        Post {
            words: 200,
            reviewed: true,
            ..post()
        }
    }

    #[test]
    fn successful_body_commits_target_and_passes_value_through() {
        let fsm = fsm();
        let mut post = ready();

        let result = fsm.invoke(&mut post, "publish", |p| {
            p.body_runs += 1;
            Ok::<_, Boom>("done")
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(post.state.get(), "published");
        assert_eq!(post.body_runs, 1);
        assert!(!post.state.in_transition());
    }

    #[test]
    fn body_sees_pre_transition_state_with_field_unlocked() {
        let fsm = fsm();
        let mut post = ready();

        fsm.invoke(&mut post, "publish", |p| {
            assert_eq!(p.state.get(), "new");
            assert!(p.state.in_transition());
            Ok::<_, Boom>(())
        })
        .unwrap();
    }

    #[test]
    fn unmatched_source_is_rejected_without_running_body() {
        let fsm = fsm();
        let mut post = ready();

        let err = fsm
            .invoke(&mut post, "remove", |p| {
                p.body_runs += 1;
                Ok::<_, Boom>(())
            })
            .unwrap_err();

        assert_eq!(
            err.rejection().map(|r| r.reason.clone()),
            Some(Rejection::NoMatchingSource)
        );
        assert_eq!(post.body_runs, 0);
        assert_eq!(post.state.get(), "new");
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let fsm = fsm();
        let mut post = ready();

        let err = fsm.apply(&mut post, "teleport").unwrap_err();
        assert_eq!(
            err.rejection().map(|r| r.reason.clone()),
            Some(Rejection::UnknownOperation)
        );
    }

    #[test]
    fn failing_guards_are_enumerated() {
        let fsm = fsm();
        let mut post = post();

        let err = fsm
            .invoke(&mut post, "publish", |p| {
                p.body_runs += 1;
                Ok::<_, Boom>(())
            })
            .unwrap_err();

        let rejected = err.rejection().unwrap();
        assert_eq!(
            rejected.reason,
            Rejection::GuardsFailed {
                blocked: vec!["long_enough".into(), "reviewed".into()]
            }
        );
        assert_eq!(post.body_runs, 0);
    }

    #[test]
    fn permission_is_checked_only_with_an_actor() {
        let fsm = fsm();
        let reader = User { grants: vec![] };
        let editor = User { grants: vec!["blog.publish"] };

        let mut post = ready();
        let err = fsm.call("publish").actor(&reader).apply(&mut post).unwrap_err();
        assert!(err.rejection().unwrap().is_permission_denied());
        assert_eq!(post.state.get(), "new");

        fsm.call("publish").actor(&editor).apply(&mut post).unwrap();
        assert_eq!(post.state.get(), "published");

        let mut anonymous = ready();
        fsm.apply(&mut anonymous, "publish").unwrap();
        assert_eq!(anonymous.state.get(), "published");
    }

    #[test]
    fn failure_redirects_to_error_state() {
        let fsm = fsm();
        let mut post = ready();
        fsm.apply(&mut post, "publish").unwrap();

        let err = fsm
            .invoke(&mut post, "remove", |_| Err::<(), _>(Boom))
            .unwrap_err();

        assert_eq!(err.into_failure(), Some(Boom));
        assert_eq!(post.state.get(), "failed");
        assert!(!post.state.in_transition());
        assert_eq!(
            post.state.history().last().map(|r| r.outcome),
            Some(Outcome::Redirected)
        );
    }

    #[test]
    fn failure_without_error_state_leaves_state_unchanged() {
        let fsm = fsm();
        let mut post = ready();
        fsm.apply(&mut post, "publish").unwrap();

        let err = fsm
            .invoke(&mut post, "archive", |_| Err::<(), _>(Boom))
            .unwrap_err();

        assert_eq!(err.into_failure(), Some(Boom));
        assert_eq!(post.state.get(), "published");
        assert_eq!(post.state.history().len(), 1);
    }

    #[test]
    fn first_declared_matching_transition_wins() {
        let fsm = builder()
            .transition("advance", |t| t.from("new").to("draft"))
            .transition("advance", |t| t.from_any().to("published"))
            .build()
            .unwrap();

        let mut post = post();
        fsm.apply(&mut post, "advance").unwrap();
        assert_eq!(post.state.get(), "draft");

        fsm.apply(&mut post, "advance").unwrap();
        assert_eq!(post.state.get(), "published");
    }

    #[test]
    fn guard_blocked_candidate_falls_through_to_next() {
        let fsm = builder()
            .transition("submit", |t| {
                t.from("new").to("published").when(|p: &Post| p.reviewed)
            })
            .transition("submit", |t| t.from("new").to("pending_review"))
            .build()
            .unwrap();

        let mut post = post();
        fsm.apply(&mut post, "submit").unwrap();
        assert_eq!(post.state.get(), "pending_review");
    }

    #[test]
    fn computed_target_uses_arguments() {
        let fsm = builder()
            .transition("review", |t| {
                t.from("new")
                    .to_computed(["approved", "rejected"], |_, args: &Value| {
                        args["decision"].as_str().unwrap_or("").to_string()
                    })
                    .when_args("has_decision", |_, args: &Value| args.get("decision").is_some())
            })
            .build()
            .unwrap();

        let mut post = post();
        let err = fsm.apply(&mut post, "review").unwrap_err();
        assert!(err.rejection().unwrap().is_guard_failure());

        fsm.call("review")
            .args(json!({"decision": "rejected"}))
            .apply(&mut post)
            .unwrap();
        assert_eq!(post.state.get(), "rejected");

        let mut other = ready();
        let err = fsm
            .call("review")
            .args(json!({"decision": "lost"}))
            .apply(&mut other)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidResultState { ref resolved, .. } if resolved == "lost"
        ));
        assert_eq!(other.state.get(), "new");
        assert!(!other.state.in_transition());
    }

    #[test]
    fn computed_target_outside_allowed_follows_error_state() {
        let fsm = builder()
            .transition("review", |t| {
                t.from("new")
                    .to_computed(["approved", "rejected"], |_, args: &Value| {
                        args["decision"].as_str().unwrap_or("").to_string()
                    })
                    .on_error("failed")
            })
            .record_history()
            .build()
            .unwrap();

        let mut post = post();
        let err = fsm
            .call("review")
            .args(json!({"decision": "lost"}))
            .apply(&mut post)
            .unwrap_err();

        assert!(matches!(err, TransitionError::InvalidResultState { .. }));
        assert_eq!(post.state.get(), "failed");
        assert!(!post.state.in_transition());
        assert_eq!(
            post.state.history().last().map(|r| r.outcome),
            Some(Outcome::Redirected)
        );
    }

    #[test]
    fn notifications_surround_successful_transitions_only() {
        let events: Arc<Mutex<Vec<(EventKind, String, String, Option<String>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let fsm = builder()
            .transition("remove", |t| t.from("new").to("removed").on_error("failed"))
            .transition("publish", |t| t.from("new").to("published"))
            .listener(move |event: &TransitionEvent<'_, Post, String>| {
                sink.lock().push((
                    event.kind,
                    event.operation.to_string(),
                    event.source.clone(),
                    event.target.cloned(),
                ));
            })
            .build()
            .unwrap();

        let mut post = post();
        fsm.invoke(&mut post, "remove", |_| Err::<(), _>(Boom)).unwrap_err();
        assert_eq!(post.state.get(), "failed");

        let mut other = ready();
        fsm.apply(&mut other, "publish").unwrap();

        let expected: Vec<(EventKind, String, String, Option<String>)> = vec![
            (EventKind::Pre, "remove".into(), "new".into(), Some("removed".into())),
            (EventKind::Pre, "publish".into(), "new".into(), Some("published".into())),
            (EventKind::Post, "publish".into(), "new".into(), Some("published".into())),
        ];
        assert_eq!(*events.lock(), expected);
    }

    #[test]
    fn body_writes_to_protected_field_are_allowed() {
        let fsm = fsm();
        let mut post = ready();

        fsm.invoke(&mut post, "publish", |p| p.state.set("scratch").map_err(|_| Boom))
            .unwrap();

        assert_eq!(post.state.get(), "published");
        assert!(post.state.set("new").is_err());
    }

    #[test]
    fn nested_transition_leaves_outer_field_unlocked() {
        let fsm = builder()
            .transition("publish", |t| t.from("new").to("published"))
            .transition("stage", |t| t.from("new").to("staged"))
            .build()
            .unwrap();
        let mut post = post();

        fsm.invoke(&mut post, "publish", |p| {
            fsm.apply(p, "stage").map_err(|_| Boom)?;
            assert_eq!(p.state.get(), "staged");
            assert!(p.state.in_transition());
            p.state.set("scratch").map_err(|_| Boom)
        })
        .unwrap();

        assert_eq!(post.state.get(), "published");
        assert!(!post.state.in_transition());
        assert!(post.state.set("new").is_err());
    }

    #[test]
    fn panicking_body_relocks_field_and_keeps_state() {
        let fsm = fsm();
        let mut post = ready();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = fsm.invoke(&mut post, "publish", |_| -> Result<(), Boom> {
                panic!("body exploded")
            });
        }));

        assert!(result.is_err());
        assert_eq!(post.state.get(), "new");
        assert!(!post.state.in_transition());
    }

    #[test]
    fn history_records_completed_transitions() {
        let fsm = fsm();
        let mut post = ready();
        fsm.apply(&mut post, "publish").unwrap();
        fsm.apply(&mut post, "archive").unwrap();

        let path = post.state.history().get_path();
        assert_eq!(path, vec!["new", "published", "archived"]);
    }
}
