//! Dashboard analytics over a user's trade set.
//! All functions are pure -- they take trades and return computed values.

pub mod aggregate;
pub mod daily;
pub mod score;

pub use aggregate::{aggregate, ScalarMetrics};
pub use daily::{build_calendar, build_daily_series, CalendarDay, DailyPoint};
pub use score::{zella_score, ZellaScore};

use crate::journal::Trade;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub metrics: ScalarMetrics,
    pub zella_score: ZellaScore,
    pub daily_data: Vec<DailyPoint>,
}

/// Run the aggregator and the daily series over the same trades, then score
/// them. `trades` must already be scoped to one user and date range.
pub fn compute_dashboard(trades: &[Trade]) -> DashboardAnalytics {
    let metrics = aggregate(trades);
    let daily_data = build_daily_series(trades);
    let zella_score = zella_score(&metrics, &daily_data);
    DashboardAnalytics {
        metrics,
        zella_score,
        daily_data,
    }
}

/// Non-finite values never leave the analytics core.
#[inline]
pub(crate) fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{closed, open};
    use super::*;

    fn in_unit_range(x: f64) -> bool {
        (0.0..=100.0).contains(&x)
    }

    fn sample() -> Vec<Trade> {
        vec![
            closed("2024-01-05", 250.0),
            closed("2024-01-02", -75.0),
            closed("2024-01-02", 40.0),
            open("2024-01-06"),
            closed("2024-01-03", -310.0),
            closed("2024-01-04", 90.0),
            open("2024-01-01"),
        ]
    }

    #[test]
    fn test_empty_pipeline() {
        let d = compute_dashboard(&[]);
        assert_eq!(d.metrics, ScalarMetrics::default());
        assert!(d.daily_data.is_empty());
        assert_eq!(d.zella_score.recovery_factor, 100.0);
        assert_eq!(d.zella_score.win_rate, 0.0);
        assert_eq!(d.zella_score.profit_factor, 0.0);
        assert_eq!(d.zella_score.consistency, 0.0);
        assert_eq!(d.zella_score.max_drawdown, 0.0);
        assert_eq!(d.zella_score.avg_win_loss, 0.0);
    }

    #[test]
    fn test_single_win_scenario() {
        let d = compute_dashboard(&[closed("2024-01-01", 100.0)]);
        let m = &d.metrics;
        assert_eq!((m.total_trades, m.total_wins), (1, 1));
        assert_eq!(m.win_rate, 100.0);
        assert_eq!(m.avg_win, 100.0);
        assert_eq!(m.avg_loss, 0.0);
        assert_eq!(m.profit_factor, 0.0);

        assert_eq!(d.daily_data.len(), 1);
        let p = d.daily_data[0];
        assert_eq!(p.date.to_string(), "2024-01-01");
        assert_eq!((p.daily_pnl, p.cumulative_pnl, p.num_trades), (100.0, 100.0, 1));

        assert_eq!(d.zella_score.recovery_factor, 100.0);
        assert_eq!(d.zella_score.max_drawdown, 100.0);
    }

    #[test]
    fn test_all_losses_scenario() {
        let d = compute_dashboard(&[closed("2024-01-01", -500.0), closed("2024-01-02", -5.0)]);
        assert_eq!(d.metrics.profit_factor, 0.0);
        assert_eq!(d.zella_score.profit_factor, 0.0);
        assert_eq!(d.zella_score.avg_win_loss, 0.0);
    }

    #[test]
    fn test_counts_partition_total() {
        let m = compute_dashboard(&sample()).metrics;
        assert_eq!(m.total_trades, m.total_wins + m.total_losses + m.open_positions);
    }

    #[test]
    fn test_bounded_components() {
        let z = compute_dashboard(&sample()).zella_score;
        assert!(in_unit_range(z.win_rate), "{z:?}");
        assert!(in_unit_range(z.profit_factor), "{z:?}");
        assert!(in_unit_range(z.consistency), "{z:?}");
        assert!(in_unit_range(z.max_drawdown), "{z:?}");
        assert!(in_unit_range(z.recovery_factor), "{z:?}");
    }

    #[test]
    fn test_idempotent() {
        let trades = sample();
        let a = compute_dashboard(&trades);
        let b = compute_dashboard(&trades);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_json_shape() {
        let v = serde_json::to_value(compute_dashboard(&[closed("2024-01-01", 100.0)])).unwrap();
        assert_eq!(v["metrics"]["totalTrades"], 1);
        assert_eq!(v["metrics"]["dayWinRate"], 100.0);
        assert_eq!(v["zellaScore"]["avgWinLoss"], 0.0);
        assert_eq!(v["dailyData"][0]["date"], "2024-01-01");
        assert_eq!(v["dailyData"][0]["cumulativePnl"], 100.0);
        assert_eq!(v["dailyData"][0]["numTrades"], 1);
    }
}
