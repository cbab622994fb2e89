use log::debug;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Process-wide observable state for presentation collaborators (cart, UI
/// preferences). The state is built by the seed closure when the first
/// subscriber attaches and dropped again when the last handle goes away;
/// the core itself never reads it.
pub struct SharedStore<S> {
    inner: Arc<StoreInner<S>>,
    name: &'static str,
}

struct StoreInner<S> {
    seed: Box<dyn Fn() -> S + Send + Sync>,
    slot: Mutex<StoreSlot<S>>,
}

struct StoreSlot<S> {
    channel: Option<watch::Sender<S>>,
    subscribers: usize,
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: self.name,
        }
    }
}

impl<S: Clone + Send + Sync + 'static> SharedStore<S> {
    pub fn new(name: &'static str, seed: impl Fn() -> S + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                seed: Box::new(seed),
                slot: Mutex::new(StoreSlot {
                    channel: None,
                    subscribers: 0,
                }),
            }),
            name,
        }
    }

    /// Attaches a subscriber, initializing the state on the first one.
    pub fn subscribe(&self) -> StoreHandle<S> {
        let mut slot = self.inner.slot.lock().unwrap();
        let tx = match &slot.channel {
            Some(tx) => tx.clone(),
            None => {
                debug!("initializing store {}", self.name);
                let (tx, _) = watch::channel((self.inner.seed)());
                slot.channel = Some(tx.clone());
                tx
            }
        };
        slot.subscribers += 1;
        let rx = tx.subscribe();
        StoreHandle {
            inner: self.inner.clone(),
            name: self.name,
            tx,
            rx,
        }
    }

    /// True while at least one subscriber holds the state alive
    pub fn is_initialized(&self) -> bool {
        self.inner.slot.lock().unwrap().channel.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.slot.lock().unwrap().subscribers
    }
}

/// Live view of a store. Dropping the last handle tears the state down.
pub struct StoreHandle<S> {
    inner: Arc<StoreInner<S>>,
    name: &'static str,
    tx: watch::Sender<S>,
    rx: watch::Receiver<S>,
}

impl<S: Clone + Send + Sync + 'static> StoreHandle<S> {
    pub fn get(&self) -> S {
        self.rx.borrow().clone()
    }

    pub fn set(&self, state: S) {
        self.tx.send_replace(state);
    }

    pub fn update(&self, apply: impl FnOnce(&mut S)) {
        self.tx.send_modify(apply);
    }

    /// Resolves when the state changes after the last observed value
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<S> Drop for StoreHandle<S> {
    fn drop(&mut self) {
        let mut slot = self.inner.slot.lock().unwrap();
        slot.subscribers = slot.subscribers.saturating_sub(1);
        if slot.subscribers == 0 {
            debug!("tearing down store {}", self.name);
            slot.channel = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct CartState {
        items: Vec<String>,
    }

    #[test]
    fn state_is_seeded_on_first_subscriber_only() {
        let seeded = Arc::new(AtomicUsize::new(0));
        let counter = seeded.clone();
        let store = SharedStore::new("cart", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            CartState::default()
        });

        assert!(!store.is_initialized());
        assert_eq!(seeded.load(Ordering::SeqCst), 0);

        let first = store.subscribe();
        let second = store.subscribe();
        assert_eq!(seeded.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 2);

        drop(first);
        drop(second);
        assert!(!store.is_initialized());

        // resubscribing reseeds from scratch
        let _third = store.subscribe();
        assert_eq!(seeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn updates_are_visible_to_other_handles() {
        let store = SharedStore::new("cart", CartState::default);
        let writer = store.subscribe();
        let reader = store.subscribe();

        writer.update(|state| state.items.push("PKU-VMAX-RB".to_string()));
        assert_eq!(reader.get().items, vec!["PKU-VMAX-RB".to_string()]);
    }

    #[test]
    fn teardown_discards_state() {
        let store = SharedStore::new("cart", CartState::default);
        {
            let handle = store.subscribe();
            handle.update(|state| state.items.push("GYR-HOLO".to_string()));
            assert_eq!(handle.get().items.len(), 1);
        }
        // last handle dropped; fresh subscriber sees seeded state again
        let fresh = store.subscribe();
        assert!(fresh.get().items.is_empty());
    }

    #[tokio::test]
    async fn change_notification_wakes_waiters() {
        let store = SharedStore::new("cart", CartState::default);
        let writer = store.subscribe();
        let mut reader = store.subscribe();

        let waiter = tokio::spawn(async move {
            let changed = reader.changed().await;
            (changed, reader.get())
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        writer.update(|state| state.items.push("MAG-COM".to_string()));

        let (changed, state) = waiter.await.unwrap();
        assert!(changed);
        assert_eq!(state.items, vec!["MAG-COM".to_string()]);
    }
}
