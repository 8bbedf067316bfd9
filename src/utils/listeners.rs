//! Callback registries with explicit cancellation keys.
//!
//! Collaborator objects (seats, parent roles) let the popup machinery
//! subscribe to events and hand back a [`ListenerKey`]; holding on to the key
//! is what keeps the subscription cancellable. Listeners may register or
//! unregister callbacks while an emission is in flight; such changes take
//! effect for the next emission.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Cancellation key for a callback registered on a [`Listeners`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerKey(u64);

/// A keyed set of callbacks for events of type `E`.
pub struct Listeners<E> {
    next_key: Cell<u64>,
    entries: RefCell<Vec<(ListenerKey, Rc<dyn Fn(&E)>)>>,
}

impl<E> Listeners<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            next_key: Cell::new(1),
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Add a callback, returning the key that removes it again.
    pub fn register(&self, listener: Rc<dyn Fn(&E)>) -> ListenerKey {
        let key = ListenerKey(self.next_key.get());
        self.next_key.set(self.next_key.get() + 1);
        self.entries.borrow_mut().push((key, listener));
        key
    }

    /// Drop the callback behind `key`. Unknown keys are ignored.
    pub fn unregister(&self, key: ListenerKey) {
        self.entries.borrow_mut().retain(|(k, _)| *k != key);
    }

    /// Invoke every callback that was registered when the call started.
    pub fn emit(&self, event: &E) {
        let entries: Vec<_> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in entries {
            listener(event);
        }
    }

    /// Whether any callback is currently registered.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_registered_listeners() {
        let listeners = Listeners::new();
        let hits = Rc::new(Cell::new(0));
        let sink = hits.clone();
        let key = listeners.register(Rc::new(move |value: &i32| {
            sink.set(sink.get() + value);
        }));
        listeners.emit(&2);
        listeners.unregister(key);
        listeners.emit(&40);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn listener_can_unregister_itself() {
        let listeners = Rc::new(Listeners::<()>::new());
        let hits = Rc::new(Cell::new(0));
        let key_slot = Rc::new(Cell::new(None::<ListenerKey>));

        let registry = listeners.clone();
        let sink = hits.clone();
        let slot = key_slot.clone();
        let key = listeners.register(Rc::new(move |_: &()| {
            sink.set(sink.get() + 1);
            if let Some(key) = slot.get() {
                registry.unregister(key);
            }
        }));
        key_slot.set(Some(key));

        listeners.emit(&());
        listeners.emit(&());
        assert_eq!(hits.get(), 1);
        assert!(listeners.is_empty());
    }
}
