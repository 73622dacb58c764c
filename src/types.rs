// src/types.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// What the model asked for. `Hold` is also the safe fallback for anything
/// the parser or sizer refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Last quote for one symbol. The day's percent change rides along for the
/// prompt; only `price` drives sizing and valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub change_pct: Option<f64>,
}

/// Per-cycle price map. A symbol missing here is untradeable this cycle.
pub type PriceSnapshot = HashMap<String, Quote>;

/// A validated trade instruction. Always well-formed: the parser substitutes
/// defaults instead of failing, so a `Decision` never needs re-checking for
/// shape, only for sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub action: Action,
    pub qty: u64,
    pub reasoning: String,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
}

impl Decision {
    pub fn hold(symbol: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action: Action::Hold,
            qty: 0,
            reasoning: reasoning.into(),
            stop_loss_price: None,
            take_profit_price: None,
        }
    }
}

/// One line of the append-only audit trail. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub action: Action,
    pub qty: u64,
    pub price: Decimal,
    pub reasoning: String,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
}

impl TradeRecord {
    /// "BUY 9000 TQQQ" / "SELL 50 NVDA" / "HOLD"
    pub fn summary(&self) -> String {
        match self.action {
            Action::Hold => "HOLD".to_string(),
            _ => format!("{} {} {}", self.action, self.qty, self.symbol),
        }
    }
}

/// Mark-to-market sample taken once per cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationPoint {
    pub timestamp: DateTime<Utc>,
    pub total_value: Decimal,
    pub roi_percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id: String,
    pub symbol: String,
    pub status: String,
}
