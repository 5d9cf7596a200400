//! Per-key rate limiting for log lines that would otherwise repeat on every poll.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

struct Window {
    opened_at: Instant,
    suppressed: u64,
}

static WINDOWS: OnceLock<Mutex<HashMap<&'static str, Window>>> = OnceLock::new();

/// Returns `Some(suppressed)` when the event for `key` should be logged, where
/// `suppressed` is how many events were swallowed since the last emitted one.
/// Returns `None` while the current window for `key` is still open.
pub fn should_emit(key: &'static str, interval: Duration) -> Option<u64> {
    let mut windows = WINDOWS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let now = Instant::now();

    match windows.get_mut(key) {
        None => {
            windows.insert(
                key,
                Window {
                    opened_at: now,
                    suppressed: 0,
                },
            );
            Some(0)
        }
        Some(window) if now.duration_since(window.opened_at) < interval => {
            window.suppressed += 1;
            None
        }
        Some(window) => {
            window.opened_at = now;
            Some(std::mem::take(&mut window.suppressed))
        }
    }
}
