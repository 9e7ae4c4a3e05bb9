use crate::errors::{JournalError, JournalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A brokerage account trades can be booked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub account_name: String,
    pub broker: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// POST /api/accounts body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAccount {
    pub account_name: String,
    pub broker: Option<String>,
}

impl NewAccount {
    pub fn validated(self) -> JournalResult<Self> {
        let account_name = self.account_name.trim().to_string();
        if account_name.is_empty() {
            return Err(JournalError::Validation("accountName is required".into()));
        }
        let broker = self
            .broker
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        Ok(Self { account_name, broker })
    }
}
