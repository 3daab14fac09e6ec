//! Bracket orders — an entry plus protective OCO exits.

use super::order::{Order, OrderError, OrderKind, OrderSide, TrailBy};
use serde::{Deserialize, Serialize};

/// Transient description of bracket intent: a limit entry plus optional
/// take-profit and stop-loss exits on the opposite side.
///
/// Once submitted, the children become directly owned by the book: they stay
/// dormant until the entry fills, then join one freshly generated OCO group
/// and become eligible starting with the *next* bar. The book stamps the
/// group id and parent linkage at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketOrder {
    pub entry: Order,
    pub take_profit: Option<Order>,
    pub stop_loss: Option<Order>,
}

/// Build a bracket: limit entry, optional limit take-profit, optional
/// stop-loss that becomes a trailing stop when a trail parameter is given.
///
/// Supplying both `trail_amount` and `trail_pct` (or a trail request with
/// neither) is a construction error, as is any non-finite price. Errors are
/// fatal to this call; nothing is coerced.
#[allow(clippy::too_many_arguments)]
pub fn build_bracket(
    symbol: &str,
    side: OrderSide,
    quantity: f64,
    entry: f64,
    take_profit: Option<f64>,
    stop_loss: Option<f64>,
    trail_amount: Option<f64>,
    trail_pct: Option<f64>,
) -> Result<BracketOrder, OrderError> {
    let entry_order = Order::new(
        symbol,
        side,
        quantity,
        OrderKind::Limit { limit_price: entry },
    );
    entry_order.validate()?;

    let exit_side = side.opposite();

    let tp = match take_profit {
        Some(price) => {
            let order = Order::new(
                symbol,
                exit_side,
                quantity,
                OrderKind::Limit { limit_price: price },
            );
            order.validate()?;
            Some(order)
        }
        None => None,
    };

    let wants_trailing = trail_amount.is_some() || trail_pct.is_some();
    let sl = if wants_trailing {
        let trail = TrailBy::from_params(trail_amount, trail_pct)?;
        let order = Order::new(
            symbol,
            exit_side,
            quantity,
            OrderKind::TrailingStop {
                trail,
                anchor: None,
            },
        );
        order.validate()?;
        Some(order)
    } else if let Some(price) = stop_loss {
        let order = Order::new(symbol, exit_side, quantity, OrderKind::Stop { stop_price: price });
        order.validate()?;
        Some(order)
    } else {
        None
    };

    Ok(BracketOrder {
        entry: entry_order,
        take_profit: tp,
        stop_loss: sl,
    })
}
