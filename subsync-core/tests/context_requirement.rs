//! The process-wide context requirement.
//!
//! Kept in its own test binary with a single test: the flag is global, and
//! flipping it would race with any other test reading it in parallel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use subsync_core::{
    config, Consumer, FrameQueue, ManagerConfig, SubscriptionError,
};

#[test]
fn get_outside_render_respects_flag() {
    let frames = FrameQueue::new();
    let getter_calls = Arc::new(AtomicUsize::new(0));
    let getter_calls_clone = getter_calls.clone();

    let manager = ManagerConfig::new(
        move |q: &String| {
            getter_calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(format!("value of {q}"))
        },
        |_: &[String]| Ok(()),
        |_: &[String]| Ok(()),
    )
    .deferral(frames.clone())
    .build();

    // On by default: fails before the getter runs
    assert!(config::require_context_for_get());
    let err = manager.get(&"q".to_string()).unwrap_err();
    assert!(matches!(err, SubscriptionError::MissingContext));
    assert_eq!(getter_calls.load(Ordering::SeqCst), 0);
    assert!(frames.is_empty());

    // Inside a render pass it succeeds
    let consumer = Consumer::mount(|| {});
    let value = consumer
        .render(|_| manager.get(&"q".to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(value, "value of q");
    assert_eq!(getter_calls.load(Ordering::SeqCst), 1);
    frames.flush();

    // Off: delegates to the getter and tracks nothing
    config::set_require_context_for_get(false);
    let value = manager.get(&"loose".to_string()).unwrap();
    assert_eq!(value, "value of loose");
    assert_eq!(getter_calls.load(Ordering::SeqCst), 2);
    assert!(frames.is_empty());
    assert_eq!(manager.subscribed_keys(), vec!["q"]);

    // Takes effect on the very next call
    config::set_require_context_for_get(true);
    assert!(matches!(
        manager.get(&"q".to_string()),
        Err(SubscriptionError::MissingContext)
    ));
}
