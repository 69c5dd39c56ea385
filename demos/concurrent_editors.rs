//! Concurrent Editors
//!
//! This example demonstrates lost-update detection when two editors load
//! the same document and both try to save a transition.
//!
//! Key concepts:
//! - Loading state from a store snapshots it
//! - The second commit from a stale copy is refused
//! - Refresh and retry is up to the caller
//!
//! Run with: cargo run --example concurrent_editors

use statewarden::{CommitError, ConcurrencyGuard, Fsm, FsmBuilder, FsmField, MemoryStore};
use std::sync::{Arc, Barrier, OnceLock};
use std::thread;

#[derive(Clone)]
struct Document {
    id: u64,
    status: FsmField<String>,
}

impl Document {
    fn empty(id: u64) -> Self {
        Self {
            id,
            status: FsmField::protected("draft"),
        }
    }

    fn status_fsm() -> &'static Fsm<Document, String> {
        static FSM: OnceLock<Fsm<Document, String>> = OnceLock::new();
        FSM.get_or_init(|| {
            FsmBuilder::new("status", |d: &Document| &d.status, |d: &mut Document| &mut d.status)
                .transition("approve", |t| t.from("review").to("approved"))
                .transition("send_back", |t| t.from("review").to("draft"))
                .transition("submit", |t| t.from("draft").to("review"))
                .build()
                .expect("valid document transitions")
        })
    }
}

type Store = Arc<MemoryStore<u64, String>>;

fn edit(guard: &ConcurrencyGuard<Store>, editor: &str, operation: &str, barrier: &Barrier) {
    let fsm = Document::status_fsm();
    let mut doc = Document::empty(1);
    let id = doc.id;
    guard.load(fsm, &mut doc, &id).expect("document exists");

    fsm.apply(&mut doc, operation).expect("valid from review");
    barrier.wait();

    match guard.commit(fsm, &mut doc, &id) {
        Ok(()) => println!("  ✓ {editor}: {operation} saved ({})", doc.status.get()),
        Err(CommitError::Concurrent(conflict)) => {
            println!("  ✗ {editor}: {conflict}");
            guard.refresh(fsm, &mut doc, &id).expect("document exists");
            println!("    {editor} reloaded, document is now '{}'", doc.status.get());
        }
        Err(e) => println!("  ✗ {editor}: {e}"),
    }
}

fn main() {
    println!("=== Concurrent Editors Example ===\n");

    let store: Store = Arc::new(MemoryStore::new());
    store.insert(1, "review".to_string());
    let guard = Arc::new(ConcurrencyGuard::new(store));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [("alice", "approve"), ("bruno", "send_back")]
        .into_iter()
        .map(|(editor, operation)| {
            let guard = Arc::clone(&guard);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || edit(&guard, editor, operation, &barrier))
        })
        .collect();

    for handle in handles {
        handle.join().expect("editor thread panicked");
    }

    println!(
        "\nPersisted status: {}",
        guard.store().get(&1).unwrap_or_default()
    );
    println!("\n=== Example Complete ===");
}
