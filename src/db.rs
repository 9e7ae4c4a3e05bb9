use crate::errors::{JournalError, JournalResult};
use crate::journal::{Account, DateRange, NewAccount, Side, Trade, TradeRow, TradeStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = include_str!("../migrations/001_init.sql");

pub fn init_db(data_dir: &Path) -> JournalResult<DbPool> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| JournalError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("trade_journal.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-64000;",
    )?;
    apply_schema(&conn)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

#[cfg(test)]
pub fn init_memory_db() -> JournalResult<DbPool> {
    let conn = Connection::open_in_memory()?;
    apply_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn apply_schema(conn: &Connection) -> JournalResult<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn lock(db: &DbPool) -> JournalResult<MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|e| JournalError::Database(format!("lock poisoned: {e}")))
}

// ── Column codecs ──

/// Fixed-width UTC text, so that text order is time order.
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_ts(idx, &r)).transpose()
}

fn tags_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl ToSql for Side {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Side {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: JournalError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for TradeStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TradeStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: JournalError| FromSqlError::Other(Box::new(e)))
    }
}

// ── Accounts ──

pub fn insert_account(
    db: &DbPool,
    user_id: i64,
    req: &NewAccount,
    now: DateTime<Utc>,
) -> JournalResult<Account> {
    let conn = lock(db)?;
    conn.execute(
        "INSERT INTO accounts (user_id, account_name, broker, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, req.account_name, req.broker, fmt_ts(now)],
    )?;
    Ok(Account {
        id: conn.last_insert_rowid(),
        user_id,
        account_name: req.account_name.clone(),
        broker: req.broker.clone(),
        created_at: now,
    })
}

pub fn list_accounts(db: &DbPool, user_id: i64) -> JournalResult<Vec<Account>> {
    let conn = lock(db)?;
    let mut stmt = conn.prepare(
        "SELECT id, user_id, account_name, broker, created_at FROM accounts WHERE user_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(rusqlite::params![user_id], |row| {
        Ok(Account {
            id: row.get(0)?,
            user_id: row.get(1)?,
            account_name: row.get(2)?,
            broker: row.get(3)?,
            created_at: ts_col(row, 4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Trades may only reference the owner's own accounts.
fn ensure_account_owned(
    conn: &Connection,
    user_id: i64,
    account_id: Option<i64>,
) -> JournalResult<()> {
    let Some(account_id) = account_id else {
        return Ok(());
    };
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM accounts WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![account_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(JournalError::Validation(format!("unknown accountId: {account_id}"))),
    }
}

// ── Trades ──

const TRADE_COLUMNS: &str = "t.id, t.user_id, t.account_id, t.symbol, t.entry_date, t.exit_date, \
     t.entry_price, t.exit_price, t.quantity, t.side, t.status, t.net_pnl, t.net_roi, \
     t.commission, t.fees, t.tags, t.notes, t.created_at, t.updated_at";

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        symbol: row.get(3)?,
        entry_date: ts_col(row, 4)?,
        exit_date: opt_ts_col(row, 5)?,
        entry_price: row.get(6)?,
        exit_price: row.get(7)?,
        quantity: row.get(8)?,
        side: row.get(9)?,
        status: row.get(10)?,
        net_pnl: row.get(11)?,
        net_roi: row.get(12)?,
        commission: row.get(13)?,
        fees: row.get(14)?,
        tags: tags_col(row, 15)?,
        notes: row.get(16)?,
        created_at: ts_col(row, 17)?,
        updated_at: ts_col(row, 18)?,
    })
}

/// Expects `TRADE_COLUMNS` followed by `a.account_name, a.broker`.
fn trade_row_from_row(row: &Row<'_>) -> rusqlite::Result<TradeRow> {
    Ok(TradeRow {
        trade: trade_from_row(row)?,
        account_name: row.get(19)?,
        broker: row.get(20)?,
    })
}

pub fn insert_trade(db: &DbPool, trade: &Trade) -> JournalResult<()> {
    let conn = lock(db)?;
    ensure_account_owned(&conn, trade.user_id, trade.account_id)?;
    conn.execute(
        "INSERT INTO trades (id, user_id, account_id, symbol, entry_date, exit_date, entry_price, exit_price, quantity, side, status, net_pnl, net_roi, commission, fees, tags, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        rusqlite::params![
            trade.id,
            trade.user_id,
            trade.account_id,
            trade.symbol,
            fmt_ts(trade.entry_date),
            trade.exit_date.map(fmt_ts),
            trade.entry_price,
            trade.exit_price,
            trade.quantity,
            trade.side,
            trade.status,
            trade.net_pnl,
            trade.net_roi,
            trade.commission,
            trade.fees,
            serde_json::to_string(&trade.tags)?,
            trade.notes,
            fmt_ts(trade.created_at),
            fmt_ts(trade.updated_at),
        ],
    )?;
    Ok(())
}

/// Overwrite a stored trade. Returns false when the user has no such trade.
pub fn update_trade(db: &DbPool, trade: &Trade) -> JournalResult<bool> {
    let conn = lock(db)?;
    ensure_account_owned(&conn, trade.user_id, trade.account_id)?;
    let changed = conn.execute(
        "UPDATE trades SET account_id = ?1, symbol = ?2, entry_date = ?3, exit_date = ?4, entry_price = ?5,
             exit_price = ?6, quantity = ?7, side = ?8, status = ?9, net_pnl = ?10, net_roi = ?11,
             commission = ?12, fees = ?13, tags = ?14, notes = ?15, updated_at = ?16
         WHERE id = ?17 AND user_id = ?18",
        rusqlite::params![
            trade.account_id,
            trade.symbol,
            fmt_ts(trade.entry_date),
            trade.exit_date.map(fmt_ts),
            trade.entry_price,
            trade.exit_price,
            trade.quantity,
            trade.side,
            trade.status,
            trade.net_pnl,
            trade.net_roi,
            trade.commission,
            trade.fees,
            serde_json::to_string(&trade.tags)?,
            trade.notes,
            fmt_ts(trade.updated_at),
            trade.id,
            trade.user_id,
        ],
    )?;
    Ok(changed > 0)
}

pub fn get_trade(db: &DbPool, user_id: i64, id: &str) -> JournalResult<Option<TradeRow>> {
    let conn = lock(db)?;
    let sql = format!(
        "SELECT {TRADE_COLUMNS}, a.account_name, a.broker FROM trades t
         LEFT JOIN accounts a ON t.account_id = a.id
         WHERE t.id = ?1 AND t.user_id = ?2"
    );
    let row = conn
        .query_row(&sql, rusqlite::params![id, user_id], trade_row_from_row)
        .optional()?;
    Ok(row)
}

pub fn delete_trade(db: &DbPool, user_id: i64, id: &str) -> JournalResult<bool> {
    let conn = lock(db)?;
    let changed = conn.execute(
        "DELETE FROM trades WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id],
    )?;
    Ok(changed > 0)
}

/// Delete the listed trades owned by `user_id`; ids of other users' trades
/// are skipped. Returns the number removed.
pub fn delete_trades(db: &DbPool, user_id: i64, ids: &[String]) -> JournalResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let conn = lock(db)?;
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM trades WHERE user_id = ? AND id IN ({placeholders})");
    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(ids.len() + 1);
    params.push(&user_id);
    params.extend(ids.iter().map(|id| id as &dyn ToSql));
    let changed = conn.execute(&sql, rusqlite::params_from_iter(params))?;
    Ok(changed)
}

/// Optional filters for trade listing.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub range: DateRange,
    pub account_id: Option<i64>,
    pub status: Option<TradeStatus>,
    /// Case-insensitive substring match.
    pub symbol: Option<String>,
}

fn filter_clause(user_id: i64, filter: &TradeFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut sql = String::from("t.user_id = ?");
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];

    let (start, end) = filter.range.bounds();
    if let Some(start) = start {
        sql.push_str(" AND t.entry_date >= ?");
        params.push(Box::new(fmt_ts(start)));
    }
    if let Some(end) = end {
        sql.push_str(" AND t.entry_date < ?");
        params.push(Box::new(fmt_ts(end)));
    }
    if let Some(account_id) = filter.account_id {
        sql.push_str(" AND t.account_id = ?");
        params.push(Box::new(account_id));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND t.status = ?");
        params.push(Box::new(status));
    }
    if let Some(symbol) = filter.symbol.as_deref().filter(|s| !s.is_empty()) {
        sql.push_str(" AND t.symbol LIKE ? ESCAPE '\\'");
        params.push(Box::new(format!("%{}%", escape_like(symbol))));
    }
    (sql, params)
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One page of matching trades, newest entry first, plus the total number of
/// matches. `page` is 1-based.
pub fn list_trades(
    db: &DbPool,
    user_id: i64,
    filter: &TradeFilter,
    page: usize,
    limit: usize,
) -> JournalResult<(Vec<TradeRow>, usize)> {
    let conn = lock(db)?;
    let (clause, mut params) = filter_clause(user_id, filter);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM trades t WHERE {clause}"),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    // Pages past i64::MAX rows are simply empty
    let offset = i64::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(i64::MAX);
    params.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
    params.push(Box::new(offset));
    let sql = format!(
        "SELECT {TRADE_COLUMNS}, a.account_name, a.broker FROM trades t
         LEFT JOIN accounts a ON t.account_id = a.id
         WHERE {clause}
         ORDER BY t.entry_date DESC, t.created_at DESC
         LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), trade_row_from_row)?;
    let trades = rows.collect::<Result<Vec<_>, _>>()?;
    Ok((trades, total.max(0) as usize))
}

/// Every trade of `user_id` entered within `range`; the analytics input.
pub fn trades_in_range(db: &DbPool, user_id: i64, range: &DateRange) -> JournalResult<Vec<Trade>> {
    let conn = lock(db)?;
    let filter = TradeFilter { range: *range, ..Default::default() };
    let (clause, params) = filter_clause(user_id, &filter);
    let sql =
        format!("SELECT {TRADE_COLUMNS} FROM trades t WHERE {clause} ORDER BY t.entry_date ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), trade_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn recent_trades(db: &DbPool, user_id: i64, limit: usize) -> JournalResult<Vec<TradeRow>> {
    let conn = lock(db)?;
    let sql = format!(
        "SELECT {TRADE_COLUMNS}, a.account_name, a.broker FROM trades t
         LEFT JOIN accounts a ON t.account_id = a.id
         WHERE t.user_id = ?1
         ORDER BY t.entry_date DESC, t.created_at DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params![user_id, limit as i64], trade_row_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{NewTrade, TradePatch};
    use chrono::{NaiveDate, TimeZone};

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn trade(user_id: i64, symbol: &str, day: u32, exit: Option<f64>) -> Trade {
        let req = NewTrade {
            account_id: None,
            symbol: symbol.into(),
            entry_date: ts(day, 10),
            exit_date: exit.map(|_| ts(day, 16)),
            entry_price: 100.0,
            exit_price: exit,
            quantity: 2.0,
            side: Side::Long,
            commission: 0.0,
            fees: 0.0,
            tags: vec!["breakout".into()],
            notes: None,
        };
        Trade::create(user_id, req, ts(day, 17)).unwrap()
    }

    fn seeded() -> DbPool {
        let db = init_memory_db().unwrap();
        insert_trade(&db, &trade(1, "AAPL", 1, Some(110.0))).unwrap();
        insert_trade(&db, &trade(1, "MSFT", 2, Some(95.0))).unwrap();
        insert_trade(&db, &trade(1, "aapl", 3, None)).unwrap();
        insert_trade(&db, &trade(2, "AAPL", 2, Some(150.0))).unwrap();
        db
    }

    #[test]
    fn test_round_trip_preserves_trade() {
        let db = init_memory_db().unwrap();
        let t = trade(1, "NVDA", 5, Some(104.0));
        insert_trade(&db, &t).unwrap();
        let got = get_trade(&db, 1, &t.id).unwrap().expect("stored");
        assert_eq!(got.trade, t);
        assert_eq!(got.account_name, None);
    }

    #[test]
    fn test_users_are_isolated() {
        let db = seeded();
        let (rows, total) = list_trades(&db, 2, &TradeFilter::default(), 1, 50).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].trade.user_id, 2);

        let other = rows[0].trade.id.clone();
        assert!(get_trade(&db, 1, &other).unwrap().is_none());
        assert!(!delete_trade(&db, 1, &other).unwrap());
    }

    #[test]
    fn test_list_newest_first_and_paginated() {
        let db = seeded();
        let (page1, total) = list_trades(&db, 1, &TradeFilter::default(), 1, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].trade.entry_date, ts(3, 10));
        assert_eq!(page1[1].trade.entry_date, ts(2, 10));

        let (page2, _) = list_trades(&db, 1, &TradeFilter::default(), 2, 2).unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].trade.entry_date, ts(1, 10));
    }

    #[test]
    fn test_page_far_past_end_is_empty() {
        let db = seeded();
        for (page, limit) in [(usize::MAX, 1), (usize::MAX / 2, 3), (4, 1)] {
            let (rows, total) = list_trades(&db, 1, &TradeFilter::default(), page, limit).unwrap();
            assert!(rows.is_empty(), "page={page} limit={limit}");
            assert_eq!(total, 3);
        }
    }

    #[test]
    fn test_filters_count_filtered_total() {
        let db = seeded();
        let filter = TradeFilter {
            symbol: Some("aap".into()),
            ..Default::default()
        };
        let (rows, total) = list_trades(&db, 1, &filter, 1, 50).unwrap();
        assert_eq!(total, 2, "symbol match is case-insensitive");
        assert_eq!(rows.len(), 2);

        let filter = TradeFilter {
            status: Some(TradeStatus::Loss),
            ..Default::default()
        };
        let (rows, total) = list_trades(&db, 1, &filter, 1, 50).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].trade.symbol, "MSFT");

        let filter = TradeFilter {
            symbol: Some("%".into()),
            ..Default::default()
        };
        let (_, total) = list_trades(&db, 1, &filter, 1, 50).unwrap();
        assert_eq!(total, 0, "wildcards are matched literally");
    }

    #[test]
    fn test_range_is_inclusive() {
        let db = seeded();
        let range = DateRange::new(Some(date(2)), Some(date(3))).unwrap();
        let trades = trades_in_range(&db, 1, &range).unwrap();
        assert_eq!(trades.len(), 2);
        assert!(trades[0].entry_date < trades[1].entry_date);

        let all = trades_in_range(&db, 1, &DateRange::default()).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_update_recomputes_and_persists() {
        let db = seeded();
        let (rows, _) = list_trades(&db, 1, &TradeFilter::default(), 1, 1).unwrap();
        let mut t = rows[0].trade.clone();
        assert_eq!(t.status, TradeStatus::Open);

        let patch = TradePatch {
            exit_price: Some(90.0),
            exit_date: Some(ts(4, 9)),
            ..Default::default()
        };
        t.apply(patch, ts(4, 10)).unwrap();
        assert!(update_trade(&db, &t).unwrap());

        let got = get_trade(&db, 1, &t.id).unwrap().unwrap().trade;
        assert_eq!(got.status, TradeStatus::Loss);
        assert_eq!(got.net_pnl, Some(-20.0));
    }

    #[test]
    fn test_bulk_delete_only_own() {
        let db = seeded();
        let all = DateRange::default();
        let mut ids: Vec<String> = Vec::new();
        for user in [1, 2] {
            ids.extend(trades_in_range(&db, user, &all).unwrap().into_iter().map(|t| t.id));
        }
        assert_eq!(delete_trades(&db, 1, &ids).unwrap(), 3);
        assert_eq!(trades_in_range(&db, 2, &DateRange::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_accounts_join_and_ownership() {
        let db = init_memory_db().unwrap();
        let req = NewAccount { account_name: "Main".into(), broker: Some("IBKR".into()) };
        let acct = insert_account(&db, 1, &req, ts(1, 8)).unwrap();
        assert_eq!(list_accounts(&db, 1).unwrap(), vec![acct.clone()]);
        assert!(list_accounts(&db, 2).unwrap().is_empty());

        let mut t = trade(1, "TSLA", 1, None);
        t.account_id = Some(acct.id);
        insert_trade(&db, &t).unwrap();
        let rows = recent_trades(&db, 1, 10).unwrap();
        assert_eq!(rows[0].account_name.as_deref(), Some("Main"));
        assert_eq!(rows[0].broker.as_deref(), Some("IBKR"));

        // Another user cannot book against this account
        let mut foreign = trade(2, "TSLA", 1, None);
        foreign.account_id = Some(acct.id);
        let err = insert_trade(&db, &foreign).unwrap_err();
        assert!(matches!(err, JournalError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_recent_trades_limit() {
        let db = seeded();
        let rows = recent_trades(&db, 1, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].trade.entry_date, ts(3, 10));
    }
}
