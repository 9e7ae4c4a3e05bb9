use crate::errors::{JournalError, JournalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl FromStr for Side {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            other => Err(JournalError::Validation(format!("unknown side: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Win,
    Loss,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Win => "win",
            Self::Loss => "loss",
        }
    }

    /// Closed trades: `win` or `loss`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl FromStr for TradeStatus {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            other => Err(JournalError::Validation(format!("unknown status: {other}"))),
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Realized result of closing a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub net_pnl: f64,
    pub net_roi: f64,
}

impl Settlement {
    pub fn status(&self) -> TradeStatus {
        if self.net_pnl >= 0.0 {
            TradeStatus::Win
        } else {
            TradeStatus::Loss
        }
    }
}

/// Net P&L after charges and gross ROI (percent of entry price).
pub fn settle(
    side: Side,
    entry_price: f64,
    exit_price: f64,
    quantity: f64,
    commission: f64,
    fees: f64,
) -> Settlement {
    let price_diff = match side {
        Side::Long => exit_price - entry_price,
        Side::Short => entry_price - exit_price,
    };
    Settlement {
        net_pnl: price_diff * quantity - commission - fees,
        net_roi: price_diff / entry_price * 100.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub user_id: i64,
    pub account_id: Option<i64>,
    pub symbol: String,
    pub entry_date: DateTime<Utc>,
    pub exit_date: Option<DateTime<Utc>>,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub side: Side,
    pub status: TradeStatus,
    pub net_pnl: Option<f64>,
    pub net_roi: Option<f64>,
    pub commission: f64,
    pub fees: f64,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    /// Build a new trade for `user_id` from a create request. Close-out
    /// fields are derived, never taken from the client.
    pub fn create(user_id: i64, req: NewTrade, now: DateTime<Utc>) -> JournalResult<Self> {
        let mut trade = Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            account_id: req.account_id,
            symbol: req.symbol.trim().to_string(),
            entry_date: req.entry_date,
            exit_date: req.exit_date,
            entry_price: req.entry_price,
            exit_price: req.exit_price,
            quantity: req.quantity,
            side: req.side,
            status: TradeStatus::Open,
            net_pnl: None,
            net_roi: None,
            commission: req.commission,
            fees: req.fees,
            tags: req.tags,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };
        trade.validate()?;
        trade.recompute()?;
        Ok(trade)
    }

    /// Merge a partial update, then re-derive and re-validate.
    pub fn apply(&mut self, patch: TradePatch, now: DateTime<Utc>) -> JournalResult<()> {
        if let Some(account_id) = patch.account_id {
            self.account_id = Some(account_id);
        }
        if let Some(symbol) = patch.symbol {
            self.symbol = symbol.trim().to_string();
        }
        if let Some(entry_date) = patch.entry_date {
            self.entry_date = entry_date;
        }
        if let Some(exit_date) = patch.exit_date {
            self.exit_date = Some(exit_date);
        }
        if let Some(entry_price) = patch.entry_price {
            self.entry_price = entry_price;
        }
        if let Some(exit_price) = patch.exit_price {
            self.exit_price = Some(exit_price);
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(side) = patch.side {
            self.side = side;
        }
        if let Some(commission) = patch.commission {
            self.commission = commission;
        }
        if let Some(fees) = patch.fees {
            self.fees = fees;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        self.validate()?;
        self.recompute()?;
        self.updated_at = now;
        Ok(())
    }

    /// Net P&L as analytics count it: open or non-finite values are 0.
    pub fn pnl(&self) -> f64 {
        self.net_pnl.filter(|p| p.is_finite()).unwrap_or(0.0)
    }

    /// A trade is closed iff both exit price and exit date are present.
    /// Finite inputs can still overflow the close-out, which is rejected.
    fn recompute(&mut self) -> JournalResult<()> {
        match (self.exit_price, self.exit_date) {
            (Some(exit_price), Some(_)) => {
                let s = settle(
                    self.side,
                    self.entry_price,
                    exit_price,
                    self.quantity,
                    self.commission,
                    self.fees,
                );
                if !(s.net_pnl.is_finite() && s.net_roi.is_finite()) {
                    return Err(invalid("price and quantity are out of range"));
                }
                self.net_pnl = Some(s.net_pnl);
                self.net_roi = Some(s.net_roi);
                self.status = s.status();
            }
            _ => {
                self.net_pnl = None;
                self.net_roi = None;
                self.status = TradeStatus::Open;
            }
        }
        Ok(())
    }

    fn validate(&self) -> JournalResult<()> {
        if self.symbol.is_empty() {
            return Err(invalid("symbol is required"));
        }
        if !(self.entry_price.is_finite() && self.entry_price > 0.0) {
            return Err(invalid("entryPrice must be a positive number"));
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(invalid("quantity must be a positive number"));
        }
        if let Some(exit_price) = self.exit_price {
            if !(exit_price.is_finite() && exit_price > 0.0) {
                return Err(invalid("exitPrice must be a positive number"));
            }
        }
        if !(self.commission.is_finite() && self.commission >= 0.0) {
            return Err(invalid("commission must be non-negative"));
        }
        if !(self.fees.is_finite() && self.fees >= 0.0) {
            return Err(invalid("fees must be non-negative"));
        }
        match (self.exit_price, self.exit_date) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(invalid("exitPrice and exitDate must be given together"));
            }
            (_, Some(exit_date)) if exit_date < self.entry_date => {
                return Err(invalid("exitDate is before entryDate"));
            }
            _ => {}
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> JournalError {
    JournalError::Validation(msg.to_string())
}

/// A trade joined with its account's display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRow {
    #[serde(flatten)]
    pub trade: Trade,
    pub account_name: Option<String>,
    pub broker: Option<String>,
}

/// POST /api/trades body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTrade {
    pub account_id: Option<i64>,
    pub symbol: String,
    pub entry_date: DateTime<Utc>,
    pub exit_date: Option<DateTime<Utc>>,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub side: Side,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub fees: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

/// PUT /api/trades/{id} body. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TradePatch {
    pub account_id: Option<i64>,
    pub symbol: Option<String>,
    pub entry_date: Option<DateTime<Utc>>,
    pub exit_date: Option<DateTime<Utc>>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub side: Option<Side>,
    pub commission: Option<f64>,
    pub fees: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}
