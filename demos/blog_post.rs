//! Blog Post Workflow
//!
//! This example demonstrates a protected state attribute driven by
//! declared transitions.
//!
//! Key concepts:
//! - Registry built once per type and kept in a `OnceLock`
//! - Guards, permissions and error targets
//! - Listeners for pre- and post-transition notifications
//! - Enumerating the transitions available to an actor
//!
//! Run with: cargo run --example blog_post

use statewarden::executor::EventKind;
use statewarden::{state_enum, Actor, Fsm, FsmBuilder, FsmField, TransitionError};
use std::sync::OnceLock;

state_enum! {
    enum PostState {
        New,
        Published,
        Hidden,
        Removed,
        Failed,
    }
}

struct Post {
    title: String,
    state: FsmField<PostState>,
}

struct User {
    name: &'static str,
    is_staff: bool,
}

impl Actor for User {
    fn has_permission(&self, permission: &str) -> bool {
        self.is_staff && permission.starts_with("blog.")
    }
}

impl Post {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            state: FsmField::protected(PostState::New),
        }
    }

    fn state_fsm() -> &'static Fsm<Post, PostState, User> {
        static FSM: OnceLock<Fsm<Post, PostState, User>> = OnceLock::new();
        FSM.get_or_init(|| {
            FsmBuilder::for_actor("state", |p: &Post| &p.state, |p: &mut Post| &mut p.state)
                .transition("publish", |t| {
                    t.from(PostState::New)
                        .to(PostState::Published)
                        .when_named("has_title", |p: &Post| !p.title.is_empty())
                        .permission("blog.publish")
                        .custom("label", "Publish")
                })
                .transition("hide", |t| {
                    t.from(PostState::Published)
                        .to(PostState::Hidden)
                        .permission_fn(|p: &Post, u: &User| u.is_staff || p.title.starts_with(u.name))
                })
                .transition("remove", |t| {
                    t.from_any_except_target()
                        .to(PostState::Removed)
                        .on_error(PostState::Failed)
                })
                .listener(|event: &statewarden::TransitionEvent<'_, Post, PostState>| {
                    let marker = match event.kind {
                        EventKind::Pre => "->",
                        EventKind::Post => "<-",
                    };
                    println!(
                        "  [{marker}] {} '{}' from {:?} to {:?}",
                        event.operation, event.entity.title, event.source, event.target
                    );
                })
                .build()
                .expect("valid post transitions")
        })
    }

    fn publish(&mut self, user: &User) -> Result<(), TransitionError<String>> {
        Self::state_fsm().call("publish").actor(user).run(self, |post| {
            println!("  Sending '{}' to subscribers", post.title);
            Ok(())
        })
    }

    fn remove(&mut self, storage_online: bool) -> Result<(), TransitionError<String>> {
        Self::state_fsm().invoke(self, "remove", |post| {
            if storage_online {
                Ok(())
            } else {
                Err(format!("could not delete attachments of '{}'", post.title))
            }
        })
    }
}

fn main() {
    println!("=== Blog Post Example ===\n");

    let fsm = Post::state_fsm();
    let staff = User { name: "ana", is_staff: true };
    let guest = User { name: "bob", is_staff: false };

    println!("Declared transitions:");
    for summary in fsm.summaries() {
        println!("  {} -> {:?}", summary.name, summary.target);
    }
    println!();

    println!("Scenario 1: Direct assignment is refused");
    let mut post = Post::new("Release notes");
    if let Err(e) = post.state.set(PostState::Published) {
        println!("  ✓ {e}\n");
    }

    println!("Scenario 2: Guest cannot publish");
    match post.publish(&guest) {
        Err(e) => println!("  ✓ {e}\n"),
        Ok(()) => println!("  ✗ Unexpected publish\n"),
    }

    println!("Scenario 3: Staff publishes");
    let available: Vec<&str> = fsm
        .available_transitions_for_actor(&post, &staff)
        .iter()
        .map(|t| t.name())
        .collect();
    println!("  Available for {}: {available:?}", staff.name);
    post.publish(&staff).expect("staff can publish");
    println!("  ✓ State is now {:?}\n", post.state.get());

    println!("Scenario 4: Publishing twice is refused");
    if let Err(e) = post.publish(&staff) {
        println!("  ✓ {e}\n");
    }

    println!("Scenario 5: Failed removal moves to the error state");
    if let Err(TransitionError::Failed(reason)) = post.remove(false) {
        println!("  ✓ Body failed: {reason}");
    }
    println!("  ✓ State is now {:?}\n", post.state.get());

    println!("Scenario 6: Removal from the error state");
    post.remove(true).expect("removal succeeds");
    println!("  ✓ State is now {:?}", post.state.get());

    println!("\n=== Example Complete ===");
}
