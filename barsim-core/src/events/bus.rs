//! In-memory publish/subscribe bus.
//!
//! Synchronous and single-threaded: `publish` runs every subscriber for the
//! event's kind to completion, in subscription order, before returning.
//! Handlers may publish follow-up events from inside `on_event`; those
//! dispatch depth-first. A handler error is caught at the publish boundary,
//! logged, and does not stop the remaining handlers.
//!
//! The bus is scoped to one logical simulation and is deliberately not
//! thread-safe (`Rc<RefCell<_>>` handles). Parallel backtests must each own
//! an independent bus/book/risk-engine instance.

use super::{Event, EventKind};
use log::{debug, error};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Boxed error from a handler; the bus logs it and moves on.
pub type HandlerError = Box<dyn std::error::Error>;

/// A subscriber. One handler may subscribe to several event kinds and match
/// on the variant inside `on_event`.
pub trait EventHandler {
    /// Name used in dispatch-failure logs.
    fn name(&self) -> &str;

    fn on_event(&mut self, event: &Event, bus: &mut EventBus) -> Result<(), HandlerError>;
}

/// Shared handler handle as stored in the registry.
pub type SharedHandler = Rc<RefCell<dyn EventHandler>>;

/// Wrap a handler for subscription.
pub fn shared<H: EventHandler + 'static>(handler: H) -> Rc<RefCell<H>> {
    Rc::new(RefCell::new(handler))
}

/// Registry of event kind → ordered subscriber list.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<SharedHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the subscriber list for `kind`.
    pub fn subscribe(&mut self, kind: EventKind, handler: SharedHandler) {
        debug!("subscribed {} -> {:?}", handler.borrow().name(), kind);
        self.subscribers.entry(kind).or_default().push(handler);
    }

    /// Dispatch one event to its subscribers, in subscription order.
    ///
    /// Each handler runs to completion; a handler that publishes from inside
    /// `on_event` dispatches those events depth-first before the outer loop
    /// continues. Handler errors are logged and contained. A handler that is
    /// already borrowed (it published an event it also subscribes to) is
    /// skipped for that event, with the same containment.
    pub fn publish(&mut self, event: Event) {
        let handlers = self
            .subscribers
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();

        for handler in handlers {
            match handler.try_borrow_mut() {
                Ok(mut guard) => {
                    if let Err(err) = guard.on_event(&event, self) {
                        error!(
                            "handler {} failed for {:?}: {err}",
                            guard.name(),
                            event.kind()
                        );
                    }
                }
                Err(_) => {
                    error!(
                        "handler re-entered while dispatching {:?}; skipped",
                        event.kind()
                    );
                }
            }
        }
    }

    pub fn publish_many(&mut self, events: Vec<Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Number of subscribers for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Order, OrderKind, OrderSide};
    use chrono::{TimeZone, Utc};

    fn tick() -> Event {
        Event::Tick(Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            "SPY",
            100.0,
            101.0,
            99.0,
            100.5,
            1_000.0,
        ))
    }

    /// Records the order it saw events in, tagged with its own label.
    struct Recorder {
        label: &'static str,
        seen: Rc<RefCell<Vec<&'static str>>>,
    }

    impl EventHandler for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn on_event(&mut self, _event: &Event, _bus: &mut EventBus) -> Result<(), HandlerError> {
            self.seen.borrow_mut().push(self.label);
            Ok(())
        }
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for label in ["first", "second", "third"] {
            bus.subscribe(
                EventKind::Tick,
                shared(Recorder {
                    label,
                    seen: seen.clone(),
                }),
            );
        }

        bus.publish(tick());
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn events_only_reach_their_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(
            EventKind::OrderRequested,
            shared(Recorder {
                label: "requests",
                seen: seen.clone(),
            }),
        );

        bus.publish(tick());
        assert!(seen.borrow().is_empty());

        let order = Order::new("SPY", OrderSide::Buy, 1.0, OrderKind::Market);
        bus.publish(Event::OrderRequested {
            order,
            strategy_id: "s".into(),
        });
        assert_eq!(*seen.borrow(), vec!["requests"]);
    }

    struct Failing;

    impl EventHandler for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn on_event(&mut self, _event: &Event, _bus: &mut EventBus) -> Result<(), HandlerError> {
            Err("boom".into())
        }
    }

    #[test]
    fn failing_handler_does_not_stop_the_rest() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::Tick, shared(Failing));
        bus.subscribe(
            EventKind::Tick,
            shared(Recorder {
                label: "survivor",
                seen: seen.clone(),
            }),
        );

        bus.publish(tick());
        assert_eq!(*seen.borrow(), vec!["survivor"]);
    }

    /// On Tick, publishes an OrderRequested; checks depth-first dispatch.
    struct Chainer {
        seen: Rc<RefCell<Vec<&'static str>>>,
    }

    impl EventHandler for Chainer {
        fn name(&self) -> &str {
            "chainer"
        }

        fn on_event(&mut self, event: &Event, bus: &mut EventBus) -> Result<(), HandlerError> {
            if matches!(event, Event::Tick(_)) {
                self.seen.borrow_mut().push("chainer-before");
                let order = Order::new("SPY", OrderSide::Buy, 1.0, OrderKind::Market);
                bus.publish(Event::OrderRequested {
                    order,
                    strategy_id: "s".into(),
                });
                self.seen.borrow_mut().push("chainer-after");
            }
            Ok(())
        }
    }

    #[test]
    fn nested_publish_dispatches_depth_first() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(
            EventKind::Tick,
            shared(Chainer { seen: seen.clone() }),
        );
        bus.subscribe(
            EventKind::OrderRequested,
            shared(Recorder {
                label: "requests",
                seen: seen.clone(),
            }),
        );

        bus.publish(tick());
        assert_eq!(
            *seen.borrow(),
            vec!["chainer-before", "requests", "chainer-after"]
        );
    }
}
