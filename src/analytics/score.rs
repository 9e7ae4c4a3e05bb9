use crate::analytics::aggregate::ScalarMetrics;
use crate::analytics::daily::DailyPoint;
use crate::analytics::finite_or_zero;
use serde::Serialize;
use statrs::statistics::Statistics;

/// Linear rescale for ratio metrics: a ratio of 5 scores 100.
pub const RATIO_SCALE: f64 = 20.0;

/// Currency units of drawdown per score point lost.
pub const DRAWDOWN_UNITS_PER_POINT: f64 = 100.0;

/// Composite performance score. Every component except `win_rate` (already
/// 0..=100) and `avg_win_loss` lies in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZellaScore {
    pub win_rate: f64,
    pub profit_factor: f64,
    pub consistency: f64,
    pub recovery_factor: f64,
    pub max_drawdown: f64,
    /// Not clamped to 100, unlike its siblings.
    pub avg_win_loss: f64,
}

pub fn zella_score(metrics: &ScalarMetrics, series: &[DailyPoint]) -> ZellaScore {
    let avg_win_loss = if metrics.avg_loss > 0.0 {
        metrics.avg_win / metrics.avg_loss * RATIO_SCALE
    } else {
        0.0
    };

    ZellaScore {
        win_rate: finite_or_zero(metrics.win_rate),
        profit_factor: bounded(metrics.profit_factor * RATIO_SCALE),
        consistency: consistency(series),
        recovery_factor: recovery_factor(series),
        max_drawdown: max_drawdown_score(series),
        avg_win_loss: finite_or_zero(avg_win_loss),
    }
}

/// Lower dispersion of daily P&L relative to its mean scores higher.
/// Needs at least two days; a zero mean scores 0.
pub fn consistency(series: &[DailyPoint]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let pnls = series.iter().map(|p| p.daily_pnl);
    let mean = pnls.clone().mean();
    if mean == 0.0 {
        return 0.0;
    }
    let std_dev = pnls.population_std_dev();
    bounded(100.0 - (std_dev / mean.abs()) * 10.0)
}

/// Largest fall of cumulative P&L from its running peak. The peak starts
/// at the first day's cumulative value, not at zero.
pub fn max_drawdown_value(series: &[DailyPoint]) -> f64 {
    let Some(first) = series.first() else {
        return 0.0;
    };
    let mut peak = first.cumulative_pnl;
    let mut max_dd: f64 = 0.0;
    for p in series {
        if p.cumulative_pnl > peak {
            peak = p.cumulative_pnl;
        }
        max_dd = max_dd.max(peak - p.cumulative_pnl);
    }
    max_dd
}

/// 100 minus one point per `DRAWDOWN_UNITS_PER_POINT` of drawdown. No
/// history scores 0.
pub fn max_drawdown_score(series: &[DailyPoint]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    bounded(100.0 - max_drawdown_value(series).abs() / DRAWDOWN_UNITS_PER_POINT)
}

/// Final cumulative P&L over worst drawdown, rescaled. No drawdown at all
/// (empty history included) is a perfect 100.
pub fn recovery_factor(series: &[DailyPoint]) -> f64 {
    let max_dd = max_drawdown_value(series);
    if max_dd == 0.0 {
        return 100.0;
    }
    let total = series.last().map_or(0.0, |p| p.cumulative_pnl);
    bounded(total.abs() / max_dd.abs() * RATIO_SCALE)
}

/// Clamp to [0, 100]; non-finite values become 0.
#[inline]
fn bounded(x: f64) -> f64 {
    finite_or_zero(x).clamp(0.0, 100.0)
}
