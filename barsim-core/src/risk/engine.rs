//! Risk engine — EWMA volatility-target sizing and drawdown stops.
//!
//! Every division guards a zero or undefined denominator with a neutral
//! substitute (pass-through or no-op); sizing never emits a non-finite
//! number.

use crate::config::RiskConfig;
use serde::{Deserialize, Serialize};

/// Events emitted by the risk layer for downstream recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskEvent {
    /// The drawdown stop engaged; `affected` counts the zeroed returns.
    StopTriggered { affected: usize },
}

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Scale a raw signal series to a target annualized volatility.
    ///
    /// With risk disabled or no vol target set, this is just an elementwise
    /// clip of the signal to `[0, 1]`. Otherwise each point is scaled by
    /// `target / annualized_ewma_vol`, clipped above at 1 (never lever up),
    /// with the scale defaulting to 1 wherever volatility is zero or not yet
    /// defined. Outputs are always finite and within `[0, 1]`.
    pub fn size_positions(&self, returns: &[f64], signal: &[f64]) -> Vec<f64> {
        let clipped: Vec<f64> = (0..returns.len())
            .map(|i| {
                let s = signal.get(i).copied().unwrap_or(0.0);
                if s.is_finite() {
                    s.clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect();

        let target_pct = self.config.vol_target_pct.unwrap_or(0.0);
        if !self.config.enabled || target_pct <= 0.0 {
            return clipped;
        }

        let span = self.config.vol_lookback.max(2) as f64;
        let alpha = 2.0 / (span + 1.0);
        let ann = self.config.ann_factor.max(0.0).sqrt();
        let target = target_pct / 100.0;

        // EWMA mean/variance recurrence over the return series.
        let mut mean = 0.0;
        let mut var = 0.0;
        let mut seeded = false;

        clipped
            .iter()
            .zip(returns)
            .map(|(&weight, &ret)| {
                let r = if ret.is_finite() { ret } else { 0.0 };
                if !seeded {
                    mean = r;
                    var = 0.0;
                    seeded = true;
                } else {
                    let delta = r - mean;
                    var = (1.0 - alpha) * (var + alpha * delta * delta);
                    mean = (1.0 - alpha) * mean + alpha * r;
                }
                let ann_vol = var.max(0.0).sqrt() * ann;
                let scale = if ann_vol > 0.0 && ann_vol.is_finite() {
                    (target / ann_vol).min(1.0)
                } else {
                    1.0
                };
                (weight * scale).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Zero out strategy returns after a price drawdown breaches the stop.
    ///
    /// Tracks the running maximum price; once drawdown from that maximum
    /// reaches `-stop_loss_pct`, every return from that point on is zeroed
    /// (the stop latches) and one `StopTriggered` event records the count.
    /// With the stop disabled or unset, returns pass through unchanged.
    pub fn apply_stops(&self, returns: &[f64], prices: &[f64]) -> (Vec<f64>, Vec<RiskEvent>) {
        let stop_pct = self.config.stop_loss_pct.unwrap_or(0.0);
        if !self.config.enabled || stop_pct <= 0.0 {
            return (returns.to_vec(), Vec::new());
        }
        let threshold = -stop_pct / 100.0;

        let mut running_max = f64::NEG_INFINITY;
        let mut stopped = false;
        let mut affected = 0;

        let adjusted: Vec<f64> = returns
            .iter()
            .enumerate()
            .map(|(i, &ret)| {
                if let Some(&price) = prices.get(i) {
                    if price.is_finite() {
                        running_max = running_max.max(price);
                        // Guard the degenerate running max before dividing.
                        if !stopped && running_max > 0.0 {
                            let drawdown = price / running_max - 1.0;
                            if drawdown <= threshold {
                                stopped = true;
                            }
                        }
                    }
                }
                if stopped {
                    affected += 1;
                    0.0
                } else {
                    ret
                }
            })
            .collect();

        let events = if affected > 0 {
            vec![RiskEvent::StopTriggered { affected }]
        } else {
            Vec::new()
        };
        (adjusted, events)
    }
}
