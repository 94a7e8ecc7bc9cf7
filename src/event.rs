use crate::session::{CompletionSummary, Cursor};

/// Typed events emitted by the progress engine. Subscribers (renderer,
/// persistence, audio) pick the variants they care about.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    SessionStarted {
        token_count: usize,
        cursor: Cursor,
    },
    /// Cursor moved forward after a matching input.
    Advanced {
        cursor: Cursor,
    },
    /// Input did not match; the cursor stays put.
    Mismatch {
        symbol: char,
        cursor: Cursor,
    },
    /// Fired for every accepted input, matched or not. Debounced-save
    /// collaborators hang off this one.
    Input {
        matched: bool,
    },
    /// Terminal event of a session; fired instead of a final `Advanced`.
    ChapterCompleted(CompletionSummary),
}

/// Handle returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&EngineEvent)>;

/// Minimal subscriber registry. Dispatch is synchronous and in
/// subscription order; listeners must not block.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the id was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &EngineEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_and_emit() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        bus.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));

        bus.emit(&EngineEvent::Input { matched: true });
        bus.emit(&EngineEvent::Input { matched: false });

        assert_eq!(
            *seen.borrow(),
            vec![
                EngineEvent::Input { matched: true },
                EngineEvent::Input { matched: false },
            ]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&count);
        let id = bus.subscribe(move |_| *sink.borrow_mut() += 1);

        bus.emit(&EngineEvent::Input { matched: true });
        assert!(bus.unsubscribe(id));
        bus.emit(&EngineEvent::Input { matched: true });

        assert_eq!(*count.borrow(), 1);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_multiple_subscribers_all_notified() {
        let mut bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0));

        for _ in 0..3 {
            let sink = Rc::clone(&hits);
            bus.subscribe(move |_| *sink.borrow_mut() += 1);
        }
        assert_eq!(bus.listener_count(), 3);

        bus.emit(&EngineEvent::Input { matched: true });
        assert_eq!(*hits.borrow(), 3);
    }

    #[test]
    fn test_ids_not_reused() {
        let mut bus = EventBus::new();
        let a = bus.subscribe(|_| {});
        bus.unsubscribe(a);
        let b = bus.subscribe(|_| {});
        assert_ne!(a, b);
    }
}
