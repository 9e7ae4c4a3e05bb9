use crate::analytics::{self, CalendarDay, DashboardAnalytics};
use crate::db::{self, TradeFilter};
use crate::errors::{JournalError, JournalResult};
use crate::journal::{
    Account, DateRange, NewAccount, NewTrade, Trade, TradePatch, TradeRow, TradeStatus,
};
use crate::server::user::UserContext;
use crate::state::{AppState, RequestCounters};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub account_id: Option<i64>,
    pub status: Option<TradeStatus>,
    pub symbol: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkDeleteRequest {
    pub trade_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize)]
pub struct TradePage {
    pub trades: Vec<TradeRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub analytics: DashboardAnalytics,
    pub recent_trades: Vec<TradeRow>,
}

fn trade_not_found() -> JournalError {
    JournalError::NotFound("Trade not found".into())
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

/// GET /api/accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> JournalResult<Json<Vec<Account>>> {
    Ok(Json(db::list_accounts(&state.db, user.user_id)?))
}

/// POST /api/accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(req): Json<NewAccount>,
) -> JournalResult<(StatusCode, Json<Account>)> {
    let req = req.validated()?;
    let account = db::insert_account(&state.db, user.user_id, &req, Utc::now())?;
    RequestCounters::bump(&state.counters.accounts_created, 1);
    tracing::info!(user_id = user.user_id, account_id = account.id, "account created");
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/trades -- filtered, paginated, newest first
pub async fn list_trades(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Query(params): Query<TradesQuery>,
) -> JournalResult<Json<TradePage>> {
    let cfg = &state.config;
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(cfg.default_page_limit)
        .clamp(1, cfg.max_page_limit);
    let filter = TradeFilter {
        range: DateRange::new(params.date_from, params.date_to)?,
        account_id: params.account_id,
        status: params.status,
        symbol: params.symbol,
    };

    let (trades, total) = db::list_trades(&state.db, user.user_id, &filter, page, limit)?;
    Ok(Json(TradePage {
        trades,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        },
    }))
}

/// GET /api/trades/{id}
pub async fn get_trade(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<String>,
) -> JournalResult<Json<TradeRow>> {
    db::get_trade(&state.db, user.user_id, &id)?
        .map(Json)
        .ok_or_else(trade_not_found)
}

/// POST /api/trades
pub async fn create_trade(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(req): Json<NewTrade>,
) -> JournalResult<(StatusCode, Json<TradeRow>)> {
    let trade = Trade::create(user.user_id, req, Utc::now())?;
    db::insert_trade(&state.db, &trade)?;
    RequestCounters::bump(&state.counters.trades_created, 1);
    tracing::info!(
        user_id = user.user_id,
        trade_id = %trade.id,
        status = %trade.status,
        "trade created"
    );

    let row = db::get_trade(&state.db, user.user_id, &trade.id)?
        .ok_or_else(trade_not_found)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/trades/{id} -- merge, then re-derive the close-out
pub async fn update_trade(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<String>,
    Json(patch): Json<TradePatch>,
) -> JournalResult<Json<TradeRow>> {
    let mut trade = db::get_trade(&state.db, user.user_id, &id)?
        .ok_or_else(trade_not_found)?
        .trade;
    trade.apply(patch, Utc::now())?;
    if !db::update_trade(&state.db, &trade)? {
        return Err(trade_not_found());
    }
    RequestCounters::bump(&state.counters.trades_updated, 1);
    tracing::info!(
        user_id = user.user_id,
        trade_id = %trade.id,
        status = %trade.status,
        "trade updated"
    );

    let row = db::get_trade(&state.db, user.user_id, &id)?.ok_or_else(trade_not_found)?;
    Ok(Json(row))
}

/// DELETE /api/trades/{id}
pub async fn delete_trade(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<String>,
) -> JournalResult<Json<serde_json::Value>> {
    if !db::delete_trade(&state.db, user.user_id, &id)? {
        return Err(trade_not_found());
    }
    RequestCounters::bump(&state.counters.trades_deleted, 1);
    tracing::info!(user_id = user.user_id, trade_id = %id, "trade deleted");
    Ok(Json(serde_json::json!({ "message": "Trade deleted successfully" })))
}

/// POST /api/trades/bulk-delete
pub async fn bulk_delete_trades(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(req): Json<BulkDeleteRequest>,
) -> JournalResult<Json<serde_json::Value>> {
    if req.trade_ids.is_empty() {
        return Err(JournalError::Validation("Invalid trade IDs".into()));
    }
    let deleted = db::delete_trades(&state.db, user.user_id, &req.trade_ids)?;
    RequestCounters::bump(&state.counters.trades_deleted, deleted as u64);
    tracing::info!(
        user_id = user.user_id,
        requested = req.trade_ids.len(),
        deleted,
        "bulk delete"
    );
    Ok(Json(serde_json::json!({
        "message": format!("{deleted} trades deleted successfully"),
        "deletedCount": deleted,
    })))
}

/// GET /api/dashboard/metrics -- analytics over the date range plus the most
/// recent trades (not date-filtered)
pub async fn get_dashboard_metrics(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Query(params): Query<DashboardQuery>,
) -> JournalResult<Json<DashboardResponse>> {
    let range = DateRange::new(params.date_from, params.date_to)?;
    let trades = db::trades_in_range(&state.db, user.user_id, &range)?;
    let analytics = analytics::compute_dashboard(&trades);
    let recent_limit = state.config.recent_trades_limit;
    let recent_trades = db::recent_trades(&state.db, user.user_id, recent_limit)?;

    RequestCounters::bump(&state.counters.dashboards_computed, 1);
    tracing::debug!(
        user_id = user.user_id,
        trades = trades.len(),
        days = analytics.daily_data.len(),
        "dashboard computed"
    );

    Ok(Json(DashboardResponse {
        analytics,
        recent_trades,
    }))
}

/// GET /api/dashboard/calendar-heatmap -- per-day closed P&L for one year
pub async fn get_calendar_heatmap(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Query(params): Query<HeatmapQuery>,
) -> JournalResult<Json<Vec<CalendarDay>>> {
    let range = match params.year {
        Some(year) => DateRange::year(year)?,
        None => DateRange::current_year(),
    };
    let trades = db::trades_in_range(&state.db, user.user_id, &range)?;
    Ok(Json(analytics::build_calendar(&trades)))
}

/// GET /api/counters -- request counters (lock-free reads)
pub async fn get_counters(
    State(state): State<Arc<AppState>>,
    _user: UserContext,
) -> Json<serde_json::Value> {
    Json(state.counters.snapshot())
}
