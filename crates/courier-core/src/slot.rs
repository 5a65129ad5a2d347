//! Optional callback slots.
//!
//! A [`CallbackSlot<Args>`] holds at most one caller-supplied callback. It is
//! the capability form of a nullable function pointer: emitting into an empty
//! slot is defined as a no-op, never a fault, and installing a callback always
//! replaces whatever was there before.
//!
//! # Reentrancy
//!
//! The callback is cloned out of the slot before it is invoked, so a callback
//! may freely replace or clear its own slot, or call back into the component
//! that emitted it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use courier_core::CallbackSlot;
//!
//! let sent = CallbackSlot::<()>::new();
//! let count = Arc::new(AtomicUsize::new(0));
//!
//! let count_clone = count.clone();
//! sent.set(move |_| {
//!     count_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! sent.emit(&());
//! sent.clear();
//! sent.emit(&()); // no-op
//!
//! assert_eq!(count.load(Ordering::SeqCst), 1);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

/// A shareable callback taking `&Args`.
pub type Callback<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A slot holding zero or one callback.
///
/// `CallbackSlot<Args>` is `Send + Sync` and can be shared between the caller
/// and the collaborators that emit into it.
pub struct CallbackSlot<Args> {
    /// The installed callback, if any.
    callback: Mutex<Option<Callback<Args>>>,
}

impl<Args> Default for CallbackSlot<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> CallbackSlot<Args> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }

    /// Install a callback, replacing any previous one.
    pub fn set<F>(&self, callback: F)
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        *self.callback.lock() = Some(Arc::new(callback));
    }

    /// Replace the slot contents wholesale.
    ///
    /// Passing `None` empties the slot. Returns the previous callback.
    pub fn replace(&self, callback: Option<Callback<Args>>) -> Option<Callback<Args>> {
        std::mem::replace(&mut *self.callback.lock(), callback)
    }

    /// Remove the installed callback, if any.
    pub fn clear(&self) {
        self.callback.lock().take();
    }

    /// Check whether a callback is installed.
    pub fn is_set(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Invoke the installed callback with `args`.
    ///
    /// Returns `true` if a callback ran, `false` if the slot was empty.
    pub fn emit(&self, args: &Args) -> bool {
        // Release the lock before running user code.
        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => {
                callback(args);
                true
            }
            None => false,
        }
    }
}

impl<Args> std::fmt::Debug for CallbackSlot<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_set_emit() {
        let slot = CallbackSlot::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        slot.set(move |&value| {
            received_clone.lock().push(value);
        });

        assert!(slot.emit(&42));
        assert!(slot.emit(&100));

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn test_empty_slot_is_noop() {
        let slot = CallbackSlot::<String>::new();
        assert!(!slot.is_set());
        assert!(!slot.emit(&"nobody listening".to_string()));
    }

    #[test]
    fn test_set_replaces_previous() {
        let slot = CallbackSlot::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let first = received.clone();
        slot.set(move |&value| first.lock().push(("first", value)));
        slot.emit(&1);

        let second = received.clone();
        slot.set(move |&value| second.lock().push(("second", value)));
        slot.emit(&2);

        assert_eq!(*received.lock(), vec![("first", 1), ("second", 2)]);
    }

    #[test]
    fn test_replace_with_none_clears() {
        let slot = CallbackSlot::<()>::new();
        slot.set(|_| {});

        let previous = slot.replace(None);
        assert!(previous.is_some());
        assert!(!slot.is_set());
        assert!(!slot.emit(&()));
    }

    #[test]
    fn test_debug_shows_only_installation() {
        let slot = CallbackSlot::<i32>::new();
        assert_eq!(format!("{slot:?}"), "CallbackSlot { is_set: false }");

        slot.set(|_| {});
        assert_eq!(format!("{slot:?}"), "CallbackSlot { is_set: true }");
    }

    #[test]
    fn test_callback_may_clear_own_slot() {
        let slot = Arc::new(CallbackSlot::<()>::new());
        let count = Arc::new(Mutex::new(0));

        let slot_clone = slot.clone();
        let count_clone = count.clone();
        slot.set(move |_| {
            *count_clone.lock() += 1;
            slot_clone.clear();
        });

        assert!(slot.emit(&()));
        assert!(!slot.emit(&()));
        assert_eq!(*count.lock(), 1);
    }
}
