//! Shared fixtures for integration tests.
#![allow(dead_code)]

use statewarden::{Actor, Fsm, FsmBuilder, FsmField};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
pub struct Post {
    pub title: String,
    pub body: String,
    pub reviewed: bool,
    pub state: FsmField<String>,
}

impl Post {
    pub fn new(state: &str) -> Self {
        Self {
            title: "Hello".to_string(),
            body: "Some text".to_string(),
            reviewed: true,
            state: FsmField::protected(state),
        }
    }

    /// Registry shared by every test in the binary.
    pub fn state_fsm() -> &'static Fsm<Post, String, Editor> {
        static FSM: OnceLock<Fsm<Post, String, Editor>> = OnceLock::new();
        FSM.get_or_init(|| {
            FsmBuilder::for_actor("state", |p: &Post| &p.state, |p: &mut Post| &mut p.state)
                .transition("publish", |t| {
                    t.from("new")
                        .to("published")
                        .when_named("has_title", |p: &Post| !p.title.is_empty())
                        .when_named("has_body", |p: &Post| !p.body.is_empty())
                        .permission("blog.publish")
                })
                .transition("review", |t| {
                    t.from("new").to("in_review").when_named("not_reviewed", |p: &Post| !p.reviewed)
                })
                .transition("remove", |t| t.from("published").to("removed").on_error("failed"))
                .transition("archive", |t| t.from_states(["published", "removed"]).to("archived"))
                .transition("destroy", |t| t.from_any().to("destroyed"))
                .transition("hold", |t| t.from_any_except_target().to("onhold"))
                .build()
                .expect("valid post transitions")
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    pub grants: Vec<String>,
}

impl Editor {
    pub fn with(grant: &str) -> Self {
        Self {
            grants: vec![grant.to_string()],
        }
    }
}

impl Actor for Editor {
    fn has_permission(&self, permission: &str) -> bool {
        self.grants.iter().any(|g| g == permission)
    }
}

/// Operation body that counts its executions.
pub fn counting(counter: &AtomicUsize) -> impl FnOnce(&mut Post) -> Result<(), String> + '_ {
    move |_: &mut Post| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
