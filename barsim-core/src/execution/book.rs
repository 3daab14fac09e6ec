//! Paper execution book — working-order lifecycle over a bar replay.
//!
//! The book owns every working order. Each new bar runs the matcher over the
//! working set in id (= creation) order, then runs the trailing pass. Fills
//! remove their order, cancel OCO siblings within the same pass, and stage
//! any pending bracket children for the next bar. Working orders live in a
//! `BTreeMap` keyed by id so iteration order is deterministic; replaying the
//! same bars through a fresh book yields bit-identical fills.

use super::cost_model::CostModel;
use super::matcher::{match_order, MatchOutcome};
use crate::domain::{
    Bar, BracketOrder, Fill, OcoGroupId, Order, OrderError, OrderId, OrderKind, OrderSide, TrailBy,
};
use log::warn;
use std::collections::BTreeMap;

/// Result of a submission: the assigned id, plus the immediate fill if the
/// order matched against the last seen bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub order_id: OrderId,
    pub fill: Option<Fill>,
}

/// The paper book.
pub struct PaperBook {
    cost: CostModel,
    /// Working orders, keyed by id. Id order is creation order.
    orders: BTreeMap<OrderId, Order>,
    /// Bracket children waiting for their parent (keyed by parent id).
    dormant: BTreeMap<OrderId, Vec<Order>>,
    last_bar: Option<Bar>,
    /// Sequence number of the last processed bar; 0 before any bar.
    bar_seq: u64,
    next_order_id: u64,
    next_oco_id: u64,
    /// Cumulative fill log for the whole run.
    fills: Vec<Fill>,
}

impl PaperBook {
    pub fn new(cost: CostModel) -> Self {
        Self {
            cost,
            orders: BTreeMap::new(),
            dormant: BTreeMap::new(),
            last_bar: None,
            bar_seq: 0,
            next_order_id: 0,
            next_oco_id: 0,
            fills: Vec::new(),
        }
    }

    // ── Public API ─────────────────────────────────────────────────────

    /// Process a new bar: ordinary matching pass, then the trailing pass.
    /// Returns this bar's fills in resolution order (ordinary before
    /// trailing).
    pub fn on_bar(&mut self, bar: &Bar) -> Vec<Fill> {
        // Bars are validated upstream; this only guards debug builds.
        debug_assert!(bar.is_sane(), "malformed bar reached the book: {bar:?}");
        self.bar_seq += 1;
        let seq = self.bar_seq;
        self.last_bar = Some(bar.clone());
        let mut new_fills = Vec::new();

        // Ordinary pass, in creation order. An order may have been removed
        // mid-pass by an OCO sibling's fill.
        let ids: Vec<OrderId> = self.orders.keys().copied().collect();
        for id in ids {
            let Some(order) = self.orders.get(&id) else {
                continue;
            };
            // Bracket children staged during this bar wait until the next.
            if order.activated_seq == Some(seq) {
                continue;
            }
            if matches!(order.kind, OrderKind::TrailingStop { .. }) {
                continue;
            }
            match match_order(order, bar, &self.cost) {
                MatchOutcome::Filled(fill) => {
                    let group = order.oco_group_id;
                    self.orders.remove(&id);
                    self.cancel_group_siblings(group, id);
                    self.activate_children(id, seq);
                    self.fills.push(fill.clone());
                    new_fills.push(fill);
                }
                MatchOutcome::Working => {}
                MatchOutcome::Cancelled => {
                    self.orders.remove(&id);
                    self.dormant.remove(&id);
                }
            }
        }

        // Trailing pass: ratchet anchors, fire synthetic market exits.
        let ids: Vec<OrderId> = self.orders.keys().copied().collect();
        for id in ids {
            let Some(order) = self.orders.get_mut(&id) else {
                continue;
            };
            if order.activated_seq == Some(seq) {
                continue;
            }
            let side = order.side;
            let OrderKind::TrailingStop { trail, anchor } = &mut order.kind else {
                continue;
            };
            let trail = *trail;

            // First observed bar only seeds the anchor; no trigger exists yet.
            let Some(prev) = *anchor else {
                *anchor = Some(match side {
                    OrderSide::Sell => bar.high,
                    OrderSide::Buy => bar.low,
                });
                continue;
            };

            // The trigger derives from the *previous* anchor; the anchor
            // itself only ratchets in the protective direction.
            let (breached, raw_exit) = match side {
                OrderSide::Sell => {
                    *anchor = Some(prev.max(bar.high));
                    let trigger = match trail {
                        TrailBy::Amount(a) => prev - a,
                        TrailBy::Percent(p) => prev * (1.0 - p),
                    };
                    (bar.low <= trigger, bar.open.min(trigger))
                }
                OrderSide::Buy => {
                    *anchor = Some(prev.min(bar.low));
                    let trigger = match trail {
                        TrailBy::Amount(a) => prev + a,
                        TrailBy::Percent(p) => prev * (1.0 + p),
                    };
                    (bar.high >= trigger, bar.open.max(trigger))
                }
            };

            if breached {
                let Some(order) = self.orders.remove(&id) else {
                    continue;
                };
                let fill = self.market_fill(&order, raw_exit);
                self.cancel_group_siblings(order.oco_group_id, id);
                self.fills.push(fill.clone());
                new_fills.push(fill);
            }
        }

        new_fills
    }

    /// Submit a single order.
    ///
    /// Validates, assigns an id, and — if a bar has already been seen —
    /// attempts an immediate match against it, so a live market order fills
    /// right away. Unfilled GTC orders enter the book; unfilled non-GTC
    /// orders are gone after this call. A non-GTC order submitted before any
    /// bar exists is dropped with a warning.
    pub fn submit(&mut self, mut order: Order) -> Result<Submitted, OrderError> {
        order.validate()?;
        order.id = self.alloc_order_id();
        let id = order.id;

        // A trailing order starts tracking from the last seen bar.
        if let (Some(bar), OrderKind::TrailingStop { anchor, .. }) =
            (&self.last_bar, &mut order.kind)
        {
            if anchor.is_none() {
                *anchor = Some(match order.side {
                    OrderSide::Sell => bar.high,
                    OrderSide::Buy => bar.low,
                });
            }
        }

        match self.last_bar.clone() {
            Some(bar) => match match_order(&order, &bar, &self.cost) {
                MatchOutcome::Filled(fill) => {
                    self.cancel_group_siblings(order.oco_group_id, id);
                    self.fills.push(fill.clone());
                    Ok(Submitted {
                        order_id: id,
                        fill: Some(fill),
                    })
                }
                MatchOutcome::Working => {
                    self.orders.insert(id, order);
                    Ok(Submitted {
                        order_id: id,
                        fill: None,
                    })
                }
                MatchOutcome::Cancelled => Ok(Submitted {
                    order_id: id,
                    fill: None,
                }),
            },
            None => {
                if order.tif.cancels_if_unfilled() {
                    warn!("dropping non-GTC {id} submitted before any bar");
                    Ok(Submitted {
                        order_id: id,
                        fill: None,
                    })
                } else {
                    self.orders.insert(id, order);
                    Ok(Submitted {
                        order_id: id,
                        fill: None,
                    })
                }
            }
        }
    }

    /// Submit a bracket: parent first, children dormant until the parent
    /// fills. Children share one freshly generated OCO group and become
    /// eligible starting with the bar *after* the parent's fill — never the
    /// same bar.
    pub fn submit_bracket(&mut self, bracket: BracketOrder) -> Result<Submitted, OrderError> {
        let BracketOrder {
            entry,
            take_profit,
            stop_loss,
        } = bracket;

        // Children are validated before the entry is submitted, so an
        // invalid bracket leaves the book untouched.
        if let Some(tp) = &take_profit {
            tp.validate()?;
        }
        if let Some(sl) = &stop_loss {
            sl.validate()?;
        }

        let submitted = self.submit(entry)?;
        let parent_id = submitted.order_id;

        let mut children: Vec<Order> = take_profit.into_iter().chain(stop_loss).collect();
        if children.is_empty() {
            return Ok(submitted);
        }
        let oco = self.alloc_oco_id();
        for child in &mut children {
            child.id = self.alloc_order_id();
            child.parent_id = Some(parent_id);
            child.oco_group_id = Some(oco);
        }

        if submitted.fill.is_some() {
            // Parent filled on submission: children go working now but are
            // not eligible until the next bar.
            for mut child in children {
                child.activated_seq = Some(self.bar_seq);
                self.orders.insert(child.id, child);
            }
        } else if self.orders.contains_key(&parent_id) {
            self.dormant.insert(parent_id, children);
        } else {
            warn!("bracket parent {parent_id} not working; children dropped");
        }

        Ok(submitted)
    }

    /// Remove a working order and any dormant children it staged.
    /// Returns whether anything was removed. No event is produced.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let removed = self.orders.remove(&id).is_some();
        let had_children = self.dormant.remove(&id).is_some();
        removed || had_children
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn is_working(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    /// Whether the order is a staged bracket child still waiting for its
    /// parent to fill.
    pub fn is_dormant(&self, id: OrderId) -> bool {
        self.dormant
            .values()
            .any(|children| children.iter().any(|c| c.id == id))
    }

    pub fn working_count(&self) -> usize {
        self.orders.len()
    }

    /// Working orders in creation order.
    pub fn working_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Cumulative fill log for the run.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.last_bar.as_ref()
    }

    // ── Internal helpers ───────────────────────────────────────────────

    fn alloc_order_id(&mut self) -> OrderId {
        self.next_order_id += 1;
        OrderId(self.next_order_id)
    }

    fn alloc_oco_id(&mut self) -> OcoGroupId {
        self.next_oco_id += 1;
        OcoGroupId(self.next_oco_id)
    }

    /// Remove every working sibling of a filled OCO member, without
    /// producing any fill or rejection. Runs inside the pass that produced
    /// the triggering fill, so no later bar can fill both siblings.
    fn cancel_group_siblings(&mut self, group: Option<OcoGroupId>, filled: OrderId) {
        let Some(group) = group else {
            return;
        };
        let siblings: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.oco_group_id == Some(group) && o.id != filled)
            .map(|o| o.id)
            .collect();
        for sibling in siblings {
            self.orders.remove(&sibling);
            self.dormant.remove(&sibling);
        }
    }

    /// Move a filled parent's dormant children into the working set,
    /// eligible from the next bar.
    fn activate_children(&mut self, parent: OrderId, seq: u64) {
        if let Some(children) = self.dormant.remove(&parent) {
            for mut child in children {
                child.activated_seq = Some(seq);
                self.orders.insert(child.id, child);
            }
        }
    }

    /// Synthetic market fill (trailing exits): directional slippage applies.
    fn market_fill(&self, order: &Order, raw_price: f64) -> Fill {
        let price = self.cost.apply_slippage(raw_price, order.side);
        Fill {
            order_id: order.id,
            quantity: order.side.sign() * order.quantity,
            price,
            commission: self.cost.commission(price, order.quantity),
            slippage_bps: self.cost.slippage_bps,
        }
    }
}
