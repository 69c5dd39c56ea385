//! Property-based tests for transition execution.
//!
//! These tests use proptest to verify the executor's laws hold across
//! many randomly generated states, operations and guard outcomes.

use proptest::prelude::*;
use statewarden::core::State;
use statewarden::{
    state_enum, CommitError, ConcurrencyGuard, Fsm, FsmBuilder, FsmField, MemoryStore, Rejection,
    TransitionError,
};
use std::cell::Cell;
use std::sync::OnceLock;

state_enum! {
    enum Phase {
        Draft,
        Review,
        Published,
        Archived,
        Failed,
    }
}

const OPERATIONS: [&str; 6] = ["submit", "approve", "reject", "archive", "reset", "unknown"];

#[derive(Clone)]
struct Doc {
    phase: FsmField<Phase>,
}

fn doc(phase: Phase) -> Doc {
    Doc {
        phase: FsmField::protected(phase),
    }
}

fn phase_fsm() -> &'static Fsm<Doc, Phase> {
    static FSM: OnceLock<Fsm<Doc, Phase>> = OnceLock::new();
    FSM.get_or_init(|| {
        FsmBuilder::new("phase", |d: &Doc| &d.phase, |d: &mut Doc| &mut d.phase)
            .transition("submit", |t| t.from(Phase::Draft).to(Phase::Review))
            .transition("approve", |t| {
                t.from(Phase::Review).to(Phase::Published).on_error(Phase::Failed)
            })
            .transition("reject", |t| t.from(Phase::Review).to(Phase::Draft))
            .transition("archive", |t| t.from_any_except_target().to(Phase::Archived))
            .transition("reset", |t| t.from_any().to(Phase::Draft))
            .record_history()
            .build()
            .expect("valid phase transitions")
    })
}

/// Independent model of the declarations above.
fn model(operation: &str, current: Phase) -> Option<Phase> {
    match (operation, current) {
        ("submit", Phase::Draft) => Some(Phase::Review),
        ("approve", Phase::Review) => Some(Phase::Published),
        ("reject", Phase::Review) => Some(Phase::Draft),
        ("archive", phase) if phase != Phase::Archived => Some(Phase::Archived),
        ("reset", _) => Some(Phase::Draft),
        _ => None,
    }
}

prop_compose! {
    fn arbitrary_phase()(variant in 0..5u8) -> Phase {
        match variant {
            0 => Phase::Draft,
            1 => Phase::Review,
            2 => Phase::Published,
            3 => Phase::Archived,
            _ => Phase::Failed,
        }
    }
}

fn arbitrary_operation() -> impl Strategy<Value = &'static str> {
    prop::sample::select(OPERATIONS.to_vec())
}

proptest! {
    #[test]
    fn executor_agrees_with_model(phase in arbitrary_phase(), operation in arbitrary_operation()) {
        let mut entity = doc(phase);
        let result = phase_fsm().apply(&mut entity, operation);

        match model(operation, phase) {
            Some(target) => {
                prop_assert!(result.is_ok());
                prop_assert_eq!(*entity.phase.get(), target);
            }
            None => {
                let err = result.unwrap_err();
                let rejected = err.rejection().expect("rejected");
                let expected = if operation == "unknown" {
                    Rejection::UnknownOperation
                } else {
                    Rejection::NoMatchingSource
                };
                prop_assert_eq!(&rejected.reason, &expected);
                prop_assert_eq!(*entity.phase.get(), phase);
            }
        }
    }

    #[test]
    fn rejection_is_idempotent(phase in arbitrary_phase(), operation in arbitrary_operation()) {
        prop_assume!(model(operation, phase).is_none());
        let mut entity = doc(phase);

        let first = phase_fsm().apply(&mut entity, operation).unwrap_err();
        let second = phase_fsm().apply(&mut entity, operation).unwrap_err();

        prop_assert_eq!(first.rejection(), second.rejection());
        prop_assert_eq!(*entity.phase.get(), phase);
    }

    #[test]
    fn body_runs_only_when_every_guard_passes(flags in prop::collection::vec(any::<bool>(), 1..6)) {
        let fsm: Fsm<Doc, Phase> = FsmBuilder::new("phase", |d: &Doc| &d.phase, |d: &mut Doc| &mut d.phase)
            .transition("submit", |t| {
                flags.iter().enumerate().fold(t.from(Phase::Draft).to(Phase::Review), |t, (i, &flag)| {
                    t.when_named(format!("guard_{i}"), move |_: &Doc| flag)
                })
            })
            .build()
            .unwrap();

        let runs = Cell::new(0);
        let mut entity = doc(Phase::Draft);
        let result = fsm.invoke(&mut entity, "submit", |_| {
            runs.set(runs.get() + 1);
            Ok::<_, ()>(())
        });

        let blocked: Vec<String> = flags
            .iter()
            .enumerate()
            .filter(|(_, &flag)| !flag)
            .map(|(i, _)| format!("guard_{i}"))
            .collect();

        if blocked.is_empty() {
            prop_assert!(result.is_ok());
            prop_assert_eq!(runs.get(), 1);
            prop_assert_eq!(*entity.phase.get(), Phase::Review);
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(
                err.rejection().map(|r| r.reason.clone()),
                Some(Rejection::GuardsFailed { blocked })
            );
            prop_assert_eq!(runs.get(), 0);
            prop_assert_eq!(*entity.phase.get(), Phase::Draft);
        }
    }

    #[test]
    fn failing_body_follows_error_target(code in any::<i32>(), with_error_target in any::<bool>()) {
        let mut entity = doc(Phase::Review);
        let operation = if with_error_target { "approve" } else { "reject" };

        let result: Result<(), _> = phase_fsm().invoke(&mut entity, operation, |_| Err(code));

        prop_assert!(matches!(result, Err(TransitionError::Failed(c)) if c == code));
        let expected = if with_error_target { Phase::Failed } else { Phase::Review };
        prop_assert_eq!(*entity.phase.get(), expected);
        prop_assert!(!entity.phase.in_transition());
    }

    #[test]
    fn history_path_follows_applied_operations(
        operations in prop::collection::vec(arbitrary_operation(), 0..12)
    ) {
        let mut entity = doc(Phase::Draft);
        let mut expected = vec![Phase::Draft];

        for operation in &operations {
            if phase_fsm().apply(&mut entity, operation).is_ok() {
                expected.push(*entity.phase.get());
            }
        }

        let path: Vec<Phase> = entity.phase.history().get_path().into_iter().copied().collect();
        if entity.phase.history().is_empty() {
            prop_assert!(path.is_empty());
            prop_assert_eq!(expected.len(), 1);
        } else {
            prop_assert_eq!(path, expected);
        }
    }

    #[test]
    fn stale_copy_never_commits(
        start in arbitrary_phase(),
        first in arbitrary_operation(),
        second in arbitrary_operation(),
    ) {
        prop_assume!(model(first, start).is_some_and(|target| target != start));

        let guard = ConcurrencyGuard::new(MemoryStore::new());
        guard.store().insert(1u8, start);

        let mut a = doc(Phase::Draft);
        let mut b = doc(Phase::Draft);
        guard.load(phase_fsm(), &mut a, &1).unwrap();
        guard.load(phase_fsm(), &mut b, &1).unwrap();

        phase_fsm().apply(&mut a, first).unwrap();
        guard.commit(phase_fsm(), &mut a, &1).unwrap();

        let _ = phase_fsm().apply(&mut b, second);
        let err = guard.commit(phase_fsm(), &mut b, &1).unwrap_err();

        prop_assert!(matches!(err, CommitError::Concurrent(_)));
        prop_assert_eq!(guard.store().get(&1), Some(*a.phase.get()));
    }

    #[test]
    fn state_names_match_variants(phase in arbitrary_phase()) {
        prop_assert_eq!(phase.name().into_owned(), format!("{phase:?}"));
    }
}
