//! Deferred values - the single-threaded promise analog the walker consumes.
//!
//! A [`Deferred`] starts pending, holds registered continuations, and runs
//! them synchronously (in registration order) the moment [`Deferred::resolve`]
//! is called. Whoever calls `resolve` plays the role of the host event loop:
//! the renderer never blocks waiting, it places a placeholder and moves on.

use std::cell::RefCell;
use std::rc::Rc;

enum State<T> {
    Pending(Vec<Box<dyn FnOnce(T)>>),
    Resolved(T),
}

/// A value that may not exist yet.
///
/// Cheap to clone (shared cell); all clones observe the same resolution.
///
/// # Example
///
/// ```ignore
/// use spark_dom::Deferred;
///
/// let content: Deferred<String> = Deferred::new();
/// content.on_resolve(|value| println!("got {value}"));
/// content.resolve("hello".to_string()); // continuation runs here, synchronously
/// ```
pub struct Deferred<T> {
    state: Rc<RefCell<State<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + 'static> Deferred<T> {
    /// Create a pending deferred value.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Pending(Vec::new()))),
        }
    }

    /// Create an already-resolved deferred value.
    pub fn resolved(value: T) -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Resolved(value))),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), State::Resolved(_))
    }

    /// Resolve with `value`, running every registered continuation in
    /// registration order. A second resolution is ignored.
    pub fn resolve(&self, value: T) {
        let continuations = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                State::Resolved(_) => return,
                State::Pending(pending) => {
                    let continuations = std::mem::take(pending);
                    *state = State::Resolved(value.clone());
                    continuations
                }
            }
        };
        // Borrow released before continuations run: they may clone this
        // deferred and register further continuations re-entrantly.
        for continuation in continuations {
            continuation(value.clone());
        }
    }

    /// Run `continuation` with the resolved value; immediately if already
    /// resolved, otherwise when `resolve` is called.
    pub fn on_resolve(&self, continuation: impl FnOnce(T) + 'static) {
        let resolved = match &mut *self.state.borrow_mut() {
            State::Pending(pending) => {
                pending.push(Box::new(continuation));
                return;
            }
            State::Resolved(value) => value.clone(),
        };
        continuation(resolved);
    }
}

impl<T: Clone + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_continuations_run_in_registration_order() {
        let deferred: Deferred<i32> = Deferred::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_a = order.clone();
        deferred.on_resolve(move |_| order_a.borrow_mut().push("a"));
        let order_b = order.clone();
        deferred.on_resolve(move |_| order_b.borrow_mut().push("b"));

        deferred.resolve(1);
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_second_resolve_ignored() {
        let deferred: Deferred<i32> = Deferred::new();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        deferred.on_resolve(move |value| seen_clone.set(value));

        deferred.resolve(1);
        deferred.resolve(2);
        assert_eq!(seen.get(), 1, "second resolution must be ignored");
        assert!(deferred.is_resolved());
    }

    #[test]
    fn test_on_resolve_after_resolution_fires_immediately() {
        let deferred = Deferred::resolved("x".to_string());
        let seen = Rc::new(RefCell::new(String::new()));
        let seen_clone = seen.clone();
        deferred.on_resolve(move |value| *seen_clone.borrow_mut() = value);
        assert_eq!(*seen.borrow(), "x");
    }

    #[test]
    fn test_reentrant_registration_during_resolve() {
        let deferred: Deferred<i32> = Deferred::new();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let inner = deferred.clone();
        deferred.on_resolve(move |_| {
            let seen_inner = seen_clone.clone();
            // Registered mid-resolution; the deferred is resolved by now.
            inner.on_resolve(move |value| seen_inner.set(value));
        });

        deferred.resolve(7);
        assert_eq!(seen.get(), 7);
    }
}
