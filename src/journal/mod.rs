pub mod account;
pub mod range;
pub mod trade;

pub use account::{Account, NewAccount};
pub use range::DateRange;
pub use trade::{NewTrade, Side, Trade, TradePatch, TradeRow, TradeStatus};
