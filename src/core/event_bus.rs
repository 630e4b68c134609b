//! Typed notifications from video handlers to whoever displays them.
//!
//! A listener either registers a callback for one event type (run on the
//! emitting thread, which for `CacheChangedEvent` is the debounce timer) or
//! drains the backlog with `poll()` from its own loop. Every emitted event
//! goes to both.
//!
//! The backlog is bounded. A listener that never polls loses the oldest
//! events, not the newest.

use log::{debug, warn};
use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Default backlog bound
const BACKLOG_CAPACITY: usize = 1000;

pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub type BoxedEvent = Box<dyn Event>;

type Listener = Arc<dyn Fn(&dyn Any) + Send + Sync>;

struct BusInner {
    listeners: RwLock<HashMap<TypeId, Vec<Listener>>>,
    backlog: Mutex<VecDeque<BoxedEvent>>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl BusInner {
    fn listeners_for(&self, type_id: TypeId) -> Vec<Listener> {
        // Copied out so a listener may emit without deadlocking on the map
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&type_id)
            .cloned()
            .unwrap_or_default()
    }

    fn push(&self, event: BoxedEvent) {
        let mut backlog = self.backlog.lock().unwrap_or_else(|e| e.into_inner());
        if backlog.len() >= self.capacity {
            backlog.pop_front();
            if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                warn!("Event backlog reached {} unpolled events, dropping oldest", self.capacity);
            }
        }
        backlog.push_back(event);
    }
}

/// Owner side: registers listeners, drains the backlog, hands out emitters.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(BACKLOG_CAPACITY)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus whose backlog keeps at most `capacity` events (at least 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(HashMap::new()),
                backlog: Mutex::new(VecDeque::new()),
                capacity: capacity.max(1),
                dropped: AtomicUsize::new(0),
            }),
        }
    }

    /// Run `callback` for every future event of type `E`, in registration order.
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.inner
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(listener);
    }

    pub fn emit<E: Event>(&self, event: E) {
        self.emitter().emit(event);
    }

    /// Take everything emitted since the last poll, oldest first
    pub fn poll(&self) -> Vec<BoxedEvent> {
        let mut backlog = self.inner.backlog.lock().unwrap_or_else(|e| e.into_inner());
        if !backlog.is_empty() {
            debug!("Polled {} events", backlog.len());
        }
        backlog.drain(..).collect()
    }

    /// Send-only handle for handlers and caches
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        !self.inner.listeners_for(TypeId::of::<E>()).is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.backlog.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Events lost to the backlog bound since creation
    pub fn dropped_events(&self) -> usize {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct EventEmitter {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("capacity", &self.inner.capacity)
            .field("dropped", &self.inner.dropped.load(Ordering::Relaxed))
            .finish()
    }
}

impl EventEmitter {
    /// Notify listeners of `E` on this thread, then append to the backlog.
    pub fn emit<E: Event>(&self, event: E) {
        for listener in self.inner.listeners_for(TypeId::of::<E>()) {
            listener(&event);
        }
        self.inner.push(Box::new(event));
    }
}

/// Typed view of a polled event. Goes through `dyn Event` so the blanket
/// impl on `Box<dyn Event>` itself is not the one called.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
