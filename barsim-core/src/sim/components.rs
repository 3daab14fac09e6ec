//! Bus-wired components: strategy, risk guard, execution, portfolio.
//!
//! Per-tick control flow runs through the bus: the book attempts fills
//! against pending orders, the strategy may request an order, the guard
//! authorizes or rejects it, the book stages or fills it, and the portfolio
//! publishes a snapshot.

use crate::domain::{Bar, Fill, Order, OrderKind, OrderSide};
use crate::events::{Event, EventBus, EventHandler, HandlerError, PortfolioSnapshot};
use crate::execution::PaperBook;

/// A trading strategy: reacts to a bar with at most one order request.
pub trait Strategy {
    fn id(&self) -> &str;
    fn on_tick(&mut self, bar: &Bar) -> Option<Order>;
}

/// Demo strategy: buy a market order on an up bar when flat; once long,
/// exit with a limit sell at 2% above the previous close when the bar's
/// range reaches it.
pub struct UpBarMeanReversion {
    long: bool,
    prev: Option<Bar>,
}

impl UpBarMeanReversion {
    pub fn new() -> Self {
        Self {
            long: false,
            prev: None,
        }
    }
}

impl Default for UpBarMeanReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for UpBarMeanReversion {
    fn id(&self) -> &str {
        "up_bar_mean_reversion"
    }

    fn on_tick(&mut self, bar: &Bar) -> Option<Order> {
        let prev = self.prev.replace(bar.clone());

        if !self.long && bar.close > bar.open {
            self.long = true;
            return Some(Order::new(
                &bar.symbol,
                OrderSide::Buy,
                1.0,
                OrderKind::Market,
            ));
        }

        if self.long {
            if let Some(prev) = prev {
                let target = (prev.close * 1.02 * 100.0).round() / 100.0;
                if bar.low <= target && target <= bar.high {
                    self.long = false;
                    return Some(Order::new(
                        &bar.symbol,
                        OrderSide::Sell,
                        1.0,
                        OrderKind::Limit {
                            limit_price: target,
                        },
                    ));
                }
            }
        }
        None
    }
}

/// Adapter that publishes a strategy's orders as `OrderRequested`.
pub struct StrategyComponent<S: Strategy> {
    strategy: S,
}

impl<S: Strategy> StrategyComponent<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }
}

impl<S: Strategy> EventHandler for StrategyComponent<S> {
    fn name(&self) -> &str {
        "strategy"
    }

    fn on_event(&mut self, event: &Event, bus: &mut EventBus) -> Result<(), HandlerError> {
        if let Event::Tick(bar) = event {
            if let Some(order) = self.strategy.on_tick(bar) {
                bus.publish(Event::OrderRequested {
                    order,
                    strategy_id: self.strategy.id().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Pre-trade gate: position and notional limits.
///
/// Authorizes or rejects each `OrderRequested`; tracks exposure from fills.
pub struct RiskGuard {
    max_position: f64,
    max_notional: f64,
    position: f64,
    last_close: Option<f64>,
}

impl RiskGuard {
    pub fn new(max_position: f64, max_notional: f64) -> Self {
        Self {
            max_position,
            max_notional,
            position: 0.0,
            last_close: None,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Best available price estimate for the order's notional.
    fn estimate_price(&self, order: &Order) -> Option<f64> {
        match &order.kind {
            OrderKind::Limit { limit_price } => Some(*limit_price),
            OrderKind::StopLimit { limit_price, .. } => Some(*limit_price),
            OrderKind::Stop { stop_price } => Some(*stop_price),
            OrderKind::Market | OrderKind::TrailingStop { .. } => self.last_close,
        }
    }
}

impl Default for RiskGuard {
    fn default() -> Self {
        Self::new(10.0, 10_000.0)
    }
}

impl EventHandler for RiskGuard {
    fn name(&self) -> &str {
        "risk_guard"
    }

    fn on_event(&mut self, event: &Event, bus: &mut EventBus) -> Result<(), HandlerError> {
        match event {
            Event::Tick(bar) => {
                self.last_close = Some(bar.close);
            }
            Event::OrderRequested { order, .. } => {
                let change = order.side.sign() * order.quantity;
                let new_position = self.position + change;
                if new_position.abs() > self.max_position {
                    bus.publish(Event::OrderRejected {
                        order: order.clone(),
                        reason: format!(
                            "position limit exceeded: {new_position} > {}",
                            self.max_position
                        ),
                    });
                    return Ok(());
                }

                if let Some(price) = self.estimate_price(order) {
                    let notional = order.quantity * price;
                    if notional > self.max_notional {
                        bus.publish(Event::OrderRejected {
                            order: order.clone(),
                            reason: format!(
                                "notional limit exceeded: {notional} > {}",
                                self.max_notional
                            ),
                        });
                        return Ok(());
                    }
                }

                bus.publish(Event::OrderAuthorized {
                    order: order.clone(),
                });
            }
            Event::OrderFilled { fill, .. } => {
                self.position += fill.quantity;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Owns the paper book; bridges bus events to it.
pub struct ExecutionComponent {
    book: PaperBook,
}

impl ExecutionComponent {
    pub fn new(book: PaperBook) -> Self {
        Self { book }
    }

    pub fn book(&self) -> &PaperBook {
        &self.book
    }

    pub fn book_mut(&mut self) -> &mut PaperBook {
        &mut self.book
    }
}

impl EventHandler for ExecutionComponent {
    fn name(&self) -> &str {
        "execution"
    }

    fn on_event(&mut self, event: &Event, bus: &mut EventBus) -> Result<(), HandlerError> {
        match event {
            Event::Tick(bar) => {
                for fill in self.book.on_bar(bar) {
                    let order_id = fill.order_id;
                    bus.publish(Event::OrderFilled { fill, order_id });
                }
            }
            Event::OrderAuthorized { order } => match self.book.submit(order.clone()) {
                Ok(submitted) => {
                    if let Some(fill) = submitted.fill {
                        bus.publish(Event::OrderFilled {
                            fill,
                            order_id: submitted.order_id,
                        });
                    }
                }
                Err(err) => {
                    bus.publish(Event::OrderRejected {
                        order: order.clone(),
                        reason: err.to_string(),
                    });
                }
            },
            _ => {}
        }
        Ok(())
    }
}

/// Cash, position, and PnL accounting; publishes `PortfolioUpdated`.
pub struct PortfolioTracker {
    cash: f64,
    position: f64,
    entry_price: f64,
    realized_pnl: f64,
    last_bar: Option<Bar>,
    history: Vec<PortfolioSnapshot>,
}

impl PortfolioTracker {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            position: 0.0,
            entry_price: 0.0,
            realized_pnl: 0.0,
            last_bar: None,
            history: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn history(&self) -> &[PortfolioSnapshot] {
        &self.history
    }

    fn apply_fill(&mut self, fill: &Fill) {
        let gross = fill.notional();
        if fill.is_buy() {
            self.cash -= gross + fill.commission;
        } else {
            self.cash += gross - fill.commission;
        }

        let old_position = self.position;
        let qty = fill.quantity;
        let new_position = old_position + qty;
        let flat = new_position.abs() < 1e-12;

        if old_position == 0.0 || old_position.signum() == qty.signum() {
            // Opening or adding: average the entry price in.
            self.entry_price = if flat {
                0.0
            } else {
                (old_position * self.entry_price + qty * fill.price) / new_position
            };
        } else {
            // Reducing, closing, or flipping: realize PnL on the closed part.
            let closed = qty.abs().min(old_position.abs());
            self.realized_pnl += (fill.price - self.entry_price) * old_position.signum() * closed;
            if flat {
                self.entry_price = 0.0;
            } else if new_position.signum() != old_position.signum() {
                // Flipped through zero: the remainder opens at the fill price.
                self.entry_price = fill.price;
            }
        }
        self.position = if flat { 0.0 } else { new_position };
    }

    fn publish_snapshot(&mut self, bus: &mut EventBus) {
        let Some(bar) = &self.last_bar else {
            return;
        };
        let price = bar.close;
        let unrealized = (price - self.entry_price) * self.position;
        let snapshot = PortfolioSnapshot {
            timestamp: bar.timestamp,
            cash: self.cash,
            position: self.position,
            equity: self.cash + self.position * price,
            unrealized_pnl: unrealized,
            realized_pnl: self.realized_pnl,
        };
        self.history.push(snapshot.clone());
        bus.publish(Event::PortfolioUpdated(snapshot));
    }
}

impl EventHandler for PortfolioTracker {
    fn name(&self) -> &str {
        "portfolio"
    }

    fn on_event(&mut self, event: &Event, bus: &mut EventBus) -> Result<(), HandlerError> {
        match event {
            Event::Tick(bar) => {
                self.last_bar = Some(bar.clone());
                self.publish_snapshot(bus);
            }
            Event::OrderFilled { fill, .. } => {
                self.apply_fill(fill);
                self.publish_snapshot(bus);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderId;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            "SPY",
            open,
            high,
            low,
            close,
            1_000.0,
        )
    }

    fn fill(qty: f64, price: f64) -> Fill {
        Fill {
            order_id: OrderId(1),
            quantity: qty,
            price,
            commission: 0.0,
            slippage_bps: 0.0,
        }
    }

    // ── Strategy ───────────────────────────────────────────────────────

    #[test]
    fn strategy_buys_on_up_bar_when_flat() {
        let mut strategy = UpBarMeanReversion::new();
        let order = strategy.on_tick(&bar(100.0, 102.0, 99.0, 101.0)).unwrap();
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.kind, OrderKind::Market);
    }

    #[test]
    fn strategy_holds_on_down_bar_when_flat() {
        let mut strategy = UpBarMeanReversion::new();
        assert!(strategy.on_tick(&bar(100.0, 101.0, 98.0, 99.0)).is_none());
    }

    #[test]
    fn strategy_exits_with_limit_at_two_percent() {
        let mut strategy = UpBarMeanReversion::new();
        strategy.on_tick(&bar(100.0, 102.0, 99.0, 101.0)); // buys, long
        // target = 101 * 1.02 = 103.02; bar reaches it
        let order = strategy.on_tick(&bar(102.0, 104.0, 101.0, 103.0)).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(
            order.kind,
            OrderKind::Limit {
                limit_price: 103.02
            }
        );
    }

    // ── Risk guard ─────────────────────────────────────────────────────

    fn drain_kinds(events: &[Event]) -> Vec<crate::events::EventKind> {
        events.iter().map(Event::kind).collect()
    }

    /// Collects everything it sees, for asserting guard decisions.
    struct Sink(std::rc::Rc<std::cell::RefCell<Vec<Event>>>);

    impl EventHandler for Sink {
        fn name(&self) -> &str {
            "sink"
        }

        fn on_event(&mut self, event: &Event, _bus: &mut EventBus) -> Result<(), HandlerError> {
            self.0.borrow_mut().push(event.clone());
            Ok(())
        }
    }

    fn guard_bus(guard: RiskGuard) -> (EventBus, std::rc::Rc<std::cell::RefCell<Vec<Event>>>) {
        use crate::events::{shared, EventKind};
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let guard = shared(guard);
        bus.subscribe(EventKind::Tick, guard.clone());
        bus.subscribe(EventKind::OrderRequested, guard.clone());
        bus.subscribe(EventKind::OrderFilled, guard);
        bus.subscribe(EventKind::OrderAuthorized, shared(Sink(seen.clone())));
        bus.subscribe(EventKind::OrderRejected, shared(Sink(seen.clone())));
        (bus, seen)
    }

    #[test]
    fn guard_authorizes_within_limits() {
        let (mut bus, seen) = guard_bus(RiskGuard::default());
        bus.publish(Event::Tick(bar(100.0, 101.0, 99.0, 100.0)));
        bus.publish(Event::OrderRequested {
            order: Order::new("SPY", OrderSide::Buy, 1.0, OrderKind::Market),
            strategy_id: "test".into(),
        });
        assert_eq!(
            drain_kinds(&seen.borrow()),
            vec![crate::events::EventKind::OrderAuthorized]
        );
    }

    #[test]
    fn guard_rejects_position_breach() {
        let (mut bus, seen) = guard_bus(RiskGuard::new(5.0, 1e9));
        bus.publish(Event::OrderRequested {
            order: Order::new("SPY", OrderSide::Buy, 6.0, OrderKind::Market),
            strategy_id: "test".into(),
        });
        let events = seen.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::OrderRejected { reason, .. } => {
                assert!(reason.contains("position limit"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn guard_rejects_notional_breach() {
        let (mut bus, seen) = guard_bus(RiskGuard::new(100.0, 500.0));
        bus.publish(Event::OrderRequested {
            order: Order::new(
                "SPY",
                OrderSide::Buy,
                10.0,
                OrderKind::Limit { limit_price: 100.0 },
            ),
            strategy_id: "test".into(),
        });
        let events = seen.borrow();
        match &events[0] {
            Event::OrderRejected { reason, .. } => {
                assert!(reason.contains("notional limit"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    // ── Portfolio ──────────────────────────────────────────────────────

    #[test]
    fn buy_then_sell_realizes_pnl() {
        let mut tracker = PortfolioTracker::new(10_000.0);
        tracker.apply_fill(&fill(10.0, 100.0));
        assert_eq!(tracker.cash(), 9_000.0);
        assert_eq!(tracker.position(), 10.0);

        tracker.apply_fill(&fill(-10.0, 110.0));
        assert_eq!(tracker.cash(), 10_100.0);
        assert_eq!(tracker.position(), 0.0);
        assert!((tracker.realized_pnl() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn partial_close_realizes_partial_pnl() {
        let mut tracker = PortfolioTracker::new(10_000.0);
        tracker.apply_fill(&fill(10.0, 100.0));
        tracker.apply_fill(&fill(-4.0, 110.0));
        assert_eq!(tracker.position(), 6.0);
        assert!((tracker.realized_pnl() - 40.0).abs() < 1e-10);
        // entry price of the remainder is unchanged
        assert!((tracker.entry_price - 100.0).abs() < 1e-10);
    }

    #[test]
    fn short_round_trip_profits_from_decline() {
        let mut tracker = PortfolioTracker::new(10_000.0);
        tracker.apply_fill(&fill(-10.0, 100.0));
        assert_eq!(tracker.position(), -10.0);
        tracker.apply_fill(&fill(10.0, 90.0));
        assert_eq!(tracker.position(), 0.0);
        assert!((tracker.realized_pnl() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn adds_average_the_entry_price() {
        let mut tracker = PortfolioTracker::new(100_000.0);
        tracker.apply_fill(&fill(10.0, 100.0));
        tracker.apply_fill(&fill(10.0, 110.0));
        assert!((tracker.entry_price - 105.0).abs() < 1e-10);
    }

    #[test]
    fn flip_through_zero_reopens_at_fill_price() {
        let mut tracker = PortfolioTracker::new(100_000.0);
        tracker.apply_fill(&fill(10.0, 100.0));
        tracker.apply_fill(&fill(-15.0, 110.0));
        assert_eq!(tracker.position(), -5.0);
        assert!((tracker.realized_pnl() - 100.0).abs() < 1e-10);
        assert!((tracker.entry_price - 110.0).abs() < 1e-10);
    }

    #[test]
    fn commission_reduces_cash_both_ways() {
        let mut tracker = PortfolioTracker::new(10_000.0);
        let mut buy = fill(10.0, 100.0);
        buy.commission = 5.0;
        tracker.apply_fill(&buy);
        assert_eq!(tracker.cash(), 8_995.0);

        let mut sell = fill(-10.0, 100.0);
        sell.commission = 5.0;
        tracker.apply_fill(&sell);
        assert_eq!(tracker.cash(), 9_990.0);
    }
}
