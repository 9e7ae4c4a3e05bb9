use crate::analytics::finite_or_zero;
use crate::journal::{Trade, TradeStatus};
use serde::Serialize;

/// Scalar summary of a user's trade set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarMetrics {
    pub net_pnl: f64,
    pub total_trades: usize,
    pub total_wins: usize,
    pub total_losses: usize,
    pub open_positions: usize,
    /// Wins over ALL trades, open positions included.
    pub win_rate: f64,
    /// Same as `win_rate` until a day-level rate exists.
    pub day_win_rate: f64,
    /// Average win over average loss magnitude; 0 when there are no losses.
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Magnitude, never negative.
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

/// Single pass over the trade set. Total over every input, empty included.
pub fn aggregate(trades: &[Trade]) -> ScalarMetrics {
    let mut m = ScalarMetrics::default();
    let mut win_sum = 0.0;
    let mut loss_sum = 0.0;
    let mut largest: Option<(f64, f64)> = None;

    for t in trades {
        m.total_trades += 1;
        let pnl = t.pnl();
        m.net_pnl += pnl;

        match t.status {
            TradeStatus::Win => {
                m.total_wins += 1;
                win_sum += pnl;
            }
            TradeStatus::Loss => {
                m.total_losses += 1;
                loss_sum += pnl;
            }
            TradeStatus::Open => m.open_positions += 1,
        }

        if let Some(p) = t.net_pnl.filter(|p| p.is_finite()) {
            largest = Some(match largest {
                Some((hi, lo)) => (hi.max(p), lo.min(p)),
                None => (p, p),
            });
        }
    }

    m.avg_win = mean(win_sum, m.total_wins);
    m.avg_loss = mean(loss_sum, m.total_losses).abs();
    if let Some((hi, lo)) = largest {
        m.largest_win = hi;
        m.largest_loss = lo;
    }

    m.win_rate = if m.total_trades > 0 {
        m.total_wins as f64 / m.total_trades as f64 * 100.0
    } else {
        0.0
    };
    m.day_win_rate = m.win_rate;
    m.net_pnl = finite_or_zero(m.net_pnl);
    m.avg_win = finite_or_zero(m.avg_win);
    m.avg_loss = finite_or_zero(m.avg_loss);
    m.profit_factor = if m.avg_loss > 0.0 {
        finite_or_zero(m.avg_win / m.avg_loss)
    } else {
        0.0
    };
    m
}

#[inline]
fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{closed, open};

    #[test]
    fn test_empty_is_all_zero() {
        assert_eq!(aggregate(&[]), ScalarMetrics::default());
    }

    #[test]
    fn test_single_win() {
        let m = aggregate(&[closed("2024-01-01", 100.0)]);
        assert_eq!(m.total_trades, 1);
        assert_eq!(m.total_wins, 1);
        assert_eq!(m.win_rate, 100.0);
        assert_eq!(m.avg_win, 100.0);
        assert_eq!(m.avg_loss, 0.0);
        assert_eq!(m.profit_factor, 0.0, "no losses means no profit factor");
        assert_eq!(m.largest_win, 100.0);
        assert_eq!(m.largest_loss, 100.0);
    }

    #[test]
    fn test_mixed_set() {
        let trades = vec![
            closed("2024-01-01", 300.0),
            closed("2024-01-01", 100.0),
            closed("2024-01-02", -50.0),
            closed("2024-01-03", -150.0),
            open("2024-01-04"),
        ];
        let m = aggregate(&trades);
        assert_eq!(m.total_trades, 5);
        assert_eq!(m.total_wins, 2);
        assert_eq!(m.total_losses, 2);
        assert_eq!(m.open_positions, 1);
        assert_eq!(m.net_pnl, 200.0);
        assert_eq!(m.avg_win, 200.0);
        assert_eq!(m.avg_loss, 100.0);
        assert_eq!(m.profit_factor, 2.0);
        assert_eq!(m.largest_win, 300.0);
        assert_eq!(m.largest_loss, -150.0);
        // Open position counts against the rate
        assert_eq!(m.win_rate, 40.0);
        assert_eq!(m.day_win_rate, m.win_rate);
    }

    #[test]
    fn test_all_open() {
        let m = aggregate(&[open("2024-01-01"), open("2024-01-02")]);
        assert_eq!(m.open_positions, 2);
        assert_eq!(m.net_pnl, 0.0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.largest_win, 0.0);
        assert_eq!(m.largest_loss, 0.0);
    }

    #[test]
    fn test_all_losses() {
        let m = aggregate(&[closed("2024-01-01", -20.0), closed("2024-01-02", -40.0)]);
        assert_eq!(m.avg_win, 0.0);
        assert_eq!(m.avg_loss, 30.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.largest_win, -20.0);
        assert_eq!(m.largest_loss, -40.0);
    }

    #[test]
    fn test_non_finite_pnl_stays_out() {
        let mut bad = closed("2024-01-02", 0.0);
        bad.net_pnl = Some(f64::INFINITY);
        let m = aggregate(&[closed("2024-01-01", 50.0), bad]);
        assert_eq!(m.total_wins, 2);
        assert_eq!(m.net_pnl, 50.0);
        assert_eq!(m.avg_win, 25.0);
        assert_eq!(m.largest_win, 50.0);
        assert_eq!(m.largest_loss, 50.0);

        // Finite rows whose sum overflows
        let m = aggregate(&[closed("2024-01-01", f64::MAX), closed("2024-01-02", f64::MAX)]);
        assert_eq!(m.net_pnl, 0.0);
        assert_eq!(m.avg_win, 0.0);
        assert_eq!(m.largest_win, f64::MAX);
    }

    #[test]
    fn test_breakeven_counts_as_win() {
        let m = aggregate(&[closed("2024-01-01", 0.0)]);
        assert_eq!(m.total_wins, 1);
        assert_eq!(m.win_rate, 100.0);
    }
}
