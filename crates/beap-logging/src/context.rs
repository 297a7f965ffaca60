//! Build context injection
//!
//! Each package build runs under a [`BuildContextGuard`], which stores a
//! build correlation id in thread-local storage. [`crate::BuildContextLayer`]
//! copies it onto every span opened while the guard is alive, so all log
//! lines of one build can be grouped without passing ids around.

use std::cell::RefCell;

use uuid::Uuid;

/// Build context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContextData {
    /// Correlation id for this build
    pub build_id: Uuid,
    /// Package encoding being built (`qBEAP` / `pBEAP`)
    pub encoding: String,
    /// Short sender fingerprint
    pub sender: String,
}

thread_local! {
    static BUILD_CONTEXT: RefCell<Option<BuildContextData>> = const { RefCell::new(None) };
}

/// RAII guard for build context
///
/// When this guard is created, it sets the build context for the current thread.
/// When it's dropped, it restores the previous context (if any).
pub struct BuildContextGuard {
    build_id: Uuid,
    previous: Option<BuildContextData>,
}

impl BuildContextGuard {
    /// Start a new build context with a fresh build id
    pub fn new(encoding: impl Into<String>, sender: impl Into<String>) -> Self {
        Self::with_build_id(Uuid::new_v4(), encoding, sender)
    }

    /// Start a build context with a specific build id
    pub fn with_build_id(
        build_id: Uuid,
        encoding: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        let previous = BUILD_CONTEXT.with(|ctx| ctx.borrow().clone());

        let new_ctx = BuildContextData {
            build_id,
            encoding: encoding.into(),
            sender: sender.into(),
        };
        BUILD_CONTEXT.with(|ctx| *ctx.borrow_mut() = Some(new_ctx));

        Self { build_id, previous }
    }

    /// Build id of this guard
    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    /// Get the current build context (if any)
    pub fn current() -> Option<BuildContextData> {
        BUILD_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current build id (if set)
    pub fn current_build_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.build_id)
    }
}

impl Drop for BuildContextGuard {
    fn drop(&mut self) {
        BUILD_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}
