//! Process-wide settings.
//!
//! Per-manager options live in [`ManagerConfig`](crate::ManagerConfig). The
//! only setting shared by every manager is whether `get` may run outside a
//! render pass.

use std::sync::atomic::{AtomicBool, Ordering};

/// Default for [`require_context_for_get`].
pub const DEFAULT_REQUIRE_CONTEXT_FOR_GET: bool = true;

static REQUIRE_CONTEXT_FOR_GET: AtomicBool = AtomicBool::new(DEFAULT_REQUIRE_CONTEXT_FOR_GET);

/// Whether `get` fails when no render context is available.
pub fn require_context_for_get() -> bool {
    REQUIRE_CONTEXT_FOR_GET.load(Ordering::SeqCst)
}

/// Change the context requirement. Takes effect on the next `get`.
pub fn set_require_context_for_get(required: bool) {
    REQUIRE_CONTEXT_FOR_GET.store(required, Ordering::SeqCst);
}
