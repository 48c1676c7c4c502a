//! A fixed-capacity publish/subscribe channel with no heap allocation.
//!
//! Listeners are plain function pointers stored in a fixed-size array,
//! the same shape the firmware's other fixed-capacity collections use:
//! capacity is a compile-time constant and registering past it raises
//! [`ErrorCode::MaxListeners`] instead of growing.
use crate::diag::{self, ErrorCode};

const MAX_LISTENERS: usize = 10;

pub type Listener = fn(i32);

/// Broadcasts an `i32` state value to up to [`MAX_LISTENERS`] listeners.
#[derive(Clone, Copy)]
pub struct EventBus {
    listeners: [Option<Listener>; MAX_LISTENERS],
    count: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus {
            listeners: [None; MAX_LISTENERS],
            count: 0,
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns `false` and raises
    /// [`ErrorCode::MaxListeners`] if the bus is already at capacity.
    pub fn listen(&mut self, listener: Listener) -> bool {
        if self.count >= MAX_LISTENERS {
            diag::raise(ErrorCode::MaxListeners);
            return false;
        }
        self.listeners[self.count] = Some(listener);
        self.count += 1;
        true
    }

    /// Call every registered listener with `state`, in registration order.
    pub fn trigger(&self, state: i32) {
        for listener in self.listeners.iter().take(self.count).flatten() {
            listener(state);
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicI32, Ordering};

    static LAST_SEEN: AtomicI32 = AtomicI32::new(0);

    fn record(state: i32) {
        LAST_SEEN.store(state, Ordering::SeqCst);
    }

    #[test]
    fn trigger_calls_every_registered_listener() {
        let mut bus = EventBus::new();
        assert!(bus.listen(record));
        bus.trigger(42);
        assert_eq!(LAST_SEEN.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn registering_past_capacity_is_rejected() {
        let _guard = diag::test_lock().lock().unwrap();
        diag::clear();
        let mut bus = EventBus::new();
        for _ in 0..MAX_LISTENERS {
            assert!(bus.listen(record));
        }
        assert!(!bus.listen(record));
        assert_eq!(diag::take(), Some(ErrorCode::MaxListeners));
    }
}
