use crate::container::{ConcurrentHashMap, ConcurrentList};
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};

type Callback = Box<dyn Fn(&dyn Any) + Send + Sync>;

struct Listener {
    id: u64,
    callback: Callback,
}

/// Token returned by [`EventDispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId {
    event: TypeId,
    id: u64,
}

/// Routes events to listeners keyed by the event's type.
///
/// Any `'static` type can be an event. Listeners for one event type are held
/// in a [`ConcurrentList`]; the lists live in a [`ConcurrentHashMap`] keyed
/// by [`TypeId`], so subscribing, unsubscribing, and dispatching are all
/// safe from any thread. A dispatch that overlaps a subscribe or
/// unsubscribe sees some consistent snapshot of the listener list.
///
/// Listener callbacks run on the dispatching thread, while the listener's
/// list node is read-locked. A callback must not subscribe to or
/// unsubscribe from the *same* event type it is handling; that re-enters the
/// list it is being iterated from.
///
/// ```
/// use filch::EventDispatcher;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// struct Tick(u32);
///
/// let dispatcher = EventDispatcher::new();
/// let total = Arc::new(AtomicU32::new(0));
///
/// let sum = total.clone();
/// dispatcher.subscribe(move |tick: &Tick| {
///     sum.fetch_add(tick.0, Ordering::Relaxed);
/// });
///
/// dispatcher.dispatch(&Tick(3));
/// dispatcher.dispatch(&Tick(4));
/// assert_eq!(total.load(Ordering::Relaxed), 7);
/// ```
pub struct EventDispatcher {
    listeners: ConcurrentHashMap<TypeId, ConcurrentList<Listener>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Creates a dispatcher with no listeners.
    pub fn new() -> EventDispatcher {
        EventDispatcher {
            listeners: ConcurrentHashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a callback for events of type `E`. Returns the token that
    /// removes it again.
    pub fn subscribe<E, F>(&self, callback: F) -> ListenerId
    where
        E: Any,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let list = self
            .listeners
            .get_or_insert_with(TypeId::of::<E>(), ConcurrentList::new);

        // Erase the event type; dispatch downcasts back to `E`.
        list.push_front(Listener {
            id,
            callback: Box::new(move |any| {
                if let Some(event) = any.downcast_ref::<E>() {
                    callback(event);
                }
            }),
        });

        ListenerId {
            event: TypeId::of::<E>(),
            id,
        }
    }

    /// Removes a previously registered listener. Returns true if it was
    /// still registered.
    pub fn unsubscribe(&self, listener: ListenerId) -> bool {
        match self.listeners.get(&listener.event) {
            Some(list) => list.remove_if(|l| l.id == listener.id, 1) == 1,
            None => false,
        }
    }

    /// Delivers an event to every listener registered for its type, on the
    /// calling thread. Listener invocation order is unspecified.
    pub fn dispatch<E: Any>(&self, event: &E) {
        if let Some(list) = self.listeners.get(&TypeId::of::<E>()) {
            list.for_each(|listener| (listener.callback)(event));
        }
    }

    /// Returns the number of listeners registered for `E`.
    pub fn num_listeners<E: Any>(&self) -> usize {
        self.listeners
            .get(&TypeId::of::<E>())
            .map_or(0, |list| list.len())
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
