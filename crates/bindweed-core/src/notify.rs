#![forbid(unsafe_code)]

//! Synchronous property-change notification.
//!
//! [`ChangedListeners`] is the fan-out half of the `PropertyChanged`
//! contract: an ordered list of callbacks, each invoked in-line with the
//! `(sender, property_name)` pair after every successful property mutation.
//! There is no buffering and no deferral; control returns to the mutating
//! caller only after every listener has run.
//!
//! # Invariants
//!
//! 1. Listeners fire in registration order.
//! 2. Delivery is synchronous and in-process; a mutation is "complete" only
//!    once every listener has returned.
//! 3. Dropping a [`Subscription`] removes its callback before the next
//!    notification cycle.
//! 4. A listener may subscribe or unsubscribe re-entrantly during a
//!    notification; the in-flight cycle still delivers to the snapshot taken
//!    when it began.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Listener<S> = Rc<dyn Fn(&S, &str)>;

struct Slots<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

/// Ordered, synchronous `(sender, property_name)` callback list.
///
/// Cloning shares the underlying listener list, so a handle type can embed
/// one and hand clones to whoever needs to fire it.
pub struct ChangedListeners<S> {
    slots: Rc<RefCell<Slots<S>>>,
}

impl<S> Clone for ChangedListeners<S> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<S> Default for ChangedListeners<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for ChangedListeners<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangedListeners")
            .field("len", &self.len())
            .finish()
    }
}

impl<S> ChangedListeners<S> {
    /// Create an empty listener list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener. The returned [`Subscription`] removes it on drop.
    #[must_use = "dropping the Subscription unsubscribes the listener"]
    pub fn subscribe(&self, listener: impl Fn(&S, &str) + 'static) -> Subscription
    where
        S: 'static,
    {
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, Rc::new(listener)));
            id
        };
        let weak: Weak<RefCell<Slots<S>>> = Rc::downgrade(&self.slots);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    slots.borrow_mut().entries.retain(|(slot, _)| *slot != id);
                }
            })),
        }
    }

    /// Fire every listener with `(sender, property_name)`, in registration
    /// order. The listener set is snapshotted first, so re-entrant
    /// subscribe/unsubscribe from inside a callback is allowed.
    pub fn notify(&self, sender: &S, property_name: &str) {
        let snapshot: Vec<Listener<S>> = self
            .slots
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(sender, property_name);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().entries.len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().entries.is_empty()
    }
}

/// RAII guard for a registered listener.
///
/// Dropping the guard unsubscribes; [`Subscription::detach`] leaks the
/// listener for the lifetime of the list instead.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keep the listener registered for the lifetime of its list.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
