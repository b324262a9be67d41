//! Managers built without a deferral use the process-wide frame queue.
//!
//! Kept in its own test binary: `FrameQueue::global()` is shared by every
//! manager in the process, so a parallel test could flush it.

use std::sync::Arc;

use parking_lot::Mutex;
use subsync_core::{Consumer, FrameQueue, ManagerConfig};

#[test]
fn global_queue_flush_reconciles() {
    let subscribes = Arc::new(Mutex::new(Vec::new()));
    let sub_log = subscribes.clone();
    let manager = ManagerConfig::new(
        |q: &String| Ok(q.len()),
        move |qs: &[String]| {
            sub_log.lock().push(qs.to_vec());
            Ok(())
        },
        |_: &[String]| Ok(()),
    )
    .build();

    let consumer = Consumer::mount(|| {});
    let lengths = consumer
        .render(|_| {
            (
                manager.get(&"ab".to_string()).unwrap(),
                manager.get(&"abc".to_string()).unwrap(),
            )
        })
        .unwrap();
    assert_eq!(lengths, (2, 3));

    // Queued on the global queue, waiting for the host's frame
    assert!(manager.is_update_pending());
    assert!(manager.subscribed_keys().is_empty());
    assert!(subscribes.lock().is_empty());
    assert_eq!(FrameQueue::global().len(), 1);

    assert_eq!(FrameQueue::global().flush(), 1);
    assert!(!manager.is_update_pending());
    assert_eq!(
        *subscribes.lock(),
        vec![vec!["ab".to_string(), "abc".to_string()]]
    );
    assert_eq!(manager.subscribed_keys(), vec!["ab", "abc"]);
}
