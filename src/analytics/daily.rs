use crate::analytics::finite_or_zero;
use crate::journal::Trade;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One calendar day of closed-trade P&L.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub daily_pnl: f64,
    pub cumulative_pnl: f64,
    pub num_trades: usize,
}

/// Heat-map cell for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub pnl: f64,
    pub num_trades: usize,
}

/// Sum and count of terminal trades per UTC entry date, ascending.
fn day_totals(trades: &[Trade]) -> BTreeMap<NaiveDate, (f64, usize)> {
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for t in trades.iter().filter(|t| t.status.is_terminal()) {
        let day = days.entry(t.entry_date.date_naive()).or_insert((0.0, 0));
        day.0 += t.pnl();
        day.1 += 1;
    }
    days
}

/// Ordered daily series with running cumulative P&L. Days without a closed
/// trade are absent, not zero-filled.
pub fn build_daily_series(trades: &[Trade]) -> Vec<DailyPoint> {
    let mut cumulative = 0.0;
    day_totals(trades)
        .into_iter()
        .map(|(date, (daily_pnl, num_trades))| {
            let daily_pnl = finite_or_zero(daily_pnl);
            cumulative = finite_or_zero(cumulative + daily_pnl);
            DailyPoint {
                date,
                daily_pnl,
                cumulative_pnl: cumulative,
                num_trades,
            }
        })
        .collect()
}

pub fn build_calendar(trades: &[Trade]) -> Vec<CalendarDay> {
    day_totals(trades)
        .into_iter()
        .map(|(date, (pnl, num_trades))| CalendarDay {
            date,
            pnl: finite_or_zero(pnl),
            num_trades,
        })
        .collect()
}
