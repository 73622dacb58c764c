// src/core/ledger.rs
use crate::core::risk::SizedOrder;
use crate::types::{Action, Decision, PriceSnapshot, TradeRecord, ValuationPoint};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

/// Invariant violations the ledger refuses to apply. Unreachable when the
/// sizer did its job; a violating apply is rejected rather than driving cash
/// or a share count negative.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("buy cost {cost} exceeds cash {cash}")]
    InsufficientCash { cost: Decimal, cash: Decimal },

    #[error("sell qty {requested} exceeds held {held} for {symbol}")]
    InsufficientShares {
        symbol: String,
        requested: u64,
        held: u64,
    },

    #[error("non-positive fill price {price}")]
    NonPositivePrice { price: Decimal },
}

/// Mark-to-market result. Symbols without a price this cycle contribute 0 to
/// `total` and are listed in `missing` so the caller can flag the valuation
/// as approximate.
#[derive(Debug, Clone)]
pub struct Valuation {
    pub total: Decimal,
    pub missing: Vec<String>,
}

/// Read-only view handed to the advisor for prompt building.
#[derive(Debug, Clone)]
pub struct PortfolioView {
    pub cash: Decimal,
    pub positions: BTreeMap<String, u64>,
}

/// The authoritative paper book: cash plus per-symbol share counts, mutated
/// only through [`Ledger::apply`]. Cash and share counts never go negative.
pub struct Ledger {
    cash: Decimal,
    starting_cash: Decimal,
    positions: HashMap<String, u64>,
    history: Vec<TradeRecord>,
    valuations: Vec<ValuationPoint>,
}

impl Ledger {
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            cash: starting_cash,
            starting_cash,
            positions: HashMap::new(),
            history: Vec::new(),
            valuations: Vec::new(),
        }
    }

    /// Apply a sized order atomically: all validation happens before the
    /// first mutation, so a rejected apply leaves the book untouched.
    pub fn apply(
        &mut self,
        decision: &Decision,
        order: SizedOrder,
        price: Decimal,
    ) -> Result<TradeRecord, LedgerError> {
        let action = match order {
            SizedOrder::Buy { qty } => {
                if price <= Decimal::ZERO {
                    return Err(LedgerError::NonPositivePrice { price });
                }
                let cost = price * Decimal::from(qty);
                if cost > self.cash {
                    return Err(LedgerError::InsufficientCash {
                        cost,
                        cash: self.cash,
                    });
                }
                self.cash -= cost;
                *self.positions.entry(decision.symbol.clone()).or_insert(0) += qty;
                Action::Buy
            }
            SizedOrder::Sell { qty } => {
                if price <= Decimal::ZERO {
                    return Err(LedgerError::NonPositivePrice { price });
                }
                let held = self.position(&decision.symbol);
                if qty > held {
                    return Err(LedgerError::InsufficientShares {
                        symbol: decision.symbol.clone(),
                        requested: qty,
                        held,
                    });
                }
                self.cash += price * Decimal::from(qty);
                let remaining = held - qty;
                if remaining == 0 {
                    self.positions.remove(&decision.symbol);
                } else {
                    self.positions.insert(decision.symbol.clone(), remaining);
                }
                Action::Sell
            }
            SizedOrder::Hold => Action::Hold,
        };

        let record = TradeRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            symbol: decision.symbol.clone(),
            action,
            qty: order.qty(),
            price,
            reasoning: decision.reasoning.clone(),
            stop_loss_price: decision.stop_loss_price,
            take_profit_price: decision.take_profit_price,
        };
        self.history.push(record.clone());
        Ok(record)
    }

    /// cash + Σ shares × snapshot price. Pure read.
    pub fn mark_to_market(&self, snapshot: &PriceSnapshot) -> Valuation {
        let mut total = self.cash;
        let mut missing = Vec::new();
        for (symbol, qty) in &self.positions {
            match snapshot.get(symbol) {
                Some(quote) => total += quote.price * Decimal::from(*qty),
                None => missing.push(symbol.clone()),
            }
        }
        missing.sort();
        Valuation { total, missing }
    }

    pub fn roi_percent(&self, total_value: Decimal) -> Decimal {
        (total_value - self.starting_cash) / self.starting_cash * Decimal::from(100)
    }

    pub fn record_valuation(
        &mut self,
        timestamp: DateTime<Utc>,
        total_value: Decimal,
    ) -> ValuationPoint {
        let point = ValuationPoint {
            timestamp,
            total_value,
            roi_percent: self.roi_percent(total_value),
        };
        self.valuations.push(point.clone());
        point
    }

    pub fn view(&self) -> PortfolioView {
        PortfolioView {
            cash: self.cash,
            positions: self
                .positions
                .iter()
                .map(|(s, q)| (s.clone(), *q))
                .collect(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn starting_cash(&self) -> Decimal {
        self.starting_cash
    }

    pub fn position(&self, symbol: &str) -> u64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &HashMap<String, u64> {
        &self.positions
    }

    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }

    pub fn valuations(&self) -> &[ValuationPoint] {
        &self.valuations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quote;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn decision(symbol: &str, action: Action, qty: u64) -> Decision {
        Decision {
            symbol: symbol.into(),
            action,
            qty,
            reasoning: "test".into(),
            stop_loss_price: None,
            take_profit_price: None,
        }
    }

    fn snapshot(entries: &[(&str, i64)]) -> PriceSnapshot {
        entries
            .iter()
            .map(|(s, p)| {
                (
                    s.to_string(),
                    Quote {
                        price: dec(*p),
                        change_pct: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn buy_moves_cash_into_position() {
        let mut ledger = Ledger::new(dec(100_000));
        let d = decision("TQQQ", Action::Buy, 9_000);
        let record = ledger
            .apply(&d, SizedOrder::Buy { qty: 9_000 }, dec(10))
            .unwrap();

        assert_eq!(ledger.cash(), dec(10_000));
        assert_eq!(ledger.position("TQQQ"), 9_000);
        assert_eq!(record.summary(), "BUY 9000 TQQQ");
    }

    #[test]
    fn sell_moves_position_back_into_cash() {
        let mut ledger = Ledger::new(dec(100_000));
        let buy = decision("NVDA", Action::Buy, 100);
        ledger
            .apply(&buy, SizedOrder::Buy { qty: 100 }, dec(100))
            .unwrap();

        let sell = decision("NVDA", Action::Sell, 100);
        ledger
            .apply(&sell, SizedOrder::Sell { qty: 100 }, dec(110))
            .unwrap();

        assert_eq!(ledger.cash(), dec(101_000));
        assert_eq!(ledger.position("NVDA"), 0);
        assert!(ledger.positions().is_empty());
    }

    #[test]
    fn hold_leaves_state_unchanged_but_is_recorded() {
        let mut ledger = Ledger::new(dec(50_000));
        let d = decision("QQQ", Action::Hold, 0);
        let record = ledger.apply(&d, SizedOrder::Hold, dec(400)).unwrap();

        assert_eq!(ledger.cash(), dec(50_000));
        assert_eq!(record.summary(), "HOLD");
        assert_eq!(ledger.history().len(), 1);
    }

    #[test]
    fn overdrawn_buy_is_rejected_without_mutation() {
        let mut ledger = Ledger::new(dec(100));
        let d = decision("NVDA", Action::Buy, 50);
        let err = ledger.apply(&d, SizedOrder::Buy { qty: 50 }, dec(10));

        assert!(matches!(err, Err(LedgerError::InsufficientCash { .. })));
        assert_eq!(ledger.cash(), dec(100));
        assert_eq!(ledger.position("NVDA"), 0);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn uncovered_sell_is_rejected_without_mutation() {
        let mut ledger = Ledger::new(dec(1_000));
        let d = decision("NVDA", Action::Sell, 100);
        let err = ledger.apply(&d, SizedOrder::Sell { qty: 100 }, dec(10));

        assert!(matches!(err, Err(LedgerError::InsufficientShares { .. })));
        assert_eq!(ledger.cash(), dec(1_000));
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn non_positive_fill_price_is_rejected() {
        let mut ledger = Ledger::new(dec(1_000));
        let d = decision("NVDA", Action::Buy, 1);
        let err = ledger.apply(&d, SizedOrder::Buy { qty: 1 }, dec(0));
        assert!(matches!(err, Err(LedgerError::NonPositivePrice { .. })));
    }

    #[test]
    fn cash_and_positions_stay_non_negative_over_a_sequence() {
        let mut ledger = Ledger::new(dec(1_000));
        let steps = [
            (Action::Buy, SizedOrder::Buy { qty: 50 }, 10),
            (Action::Sell, SizedOrder::Sell { qty: 20 }, 12),
            (Action::Hold, SizedOrder::Hold, 11),
            (Action::Sell, SizedOrder::Sell { qty: 30 }, 9),
        ];
        for (action, order, price) in steps {
            let d = decision("TQQQ", action, order.qty());
            ledger.apply(&d, order, dec(price)).unwrap();
            assert!(ledger.cash() >= Decimal::ZERO);
        }
        assert_eq!(ledger.position("TQQQ"), 0);
    }

    #[test]
    fn buy_leaves_total_value_unchanged_at_fill_price() {
        let mut ledger = Ledger::new(dec(100_000));
        let snap = snapshot(&[("TQQQ", 10)]);
        let before = ledger.mark_to_market(&snap).total;

        let d = decision("TQQQ", Action::Buy, 9_000);
        ledger
            .apply(&d, SizedOrder::Buy { qty: 9_000 }, dec(10))
            .unwrap();

        let after = ledger.mark_to_market(&snap).total;
        assert_eq!(before, after);
    }

    #[test]
    fn valuation_flags_unpriced_symbols() {
        let mut ledger = Ledger::new(dec(10_000));
        let d = decision("SOXL", Action::Buy, 10);
        ledger
            .apply(&d, SizedOrder::Buy { qty: 10 }, dec(30))
            .unwrap();

        let valuation = ledger.mark_to_market(&snapshot(&[("NVDA", 100)]));
        assert_eq!(valuation.total, dec(9_700)); // SOXL contributes 0
        assert_eq!(valuation.missing, vec!["SOXL".to_string()]);
    }

    #[test]
    fn roi_is_relative_to_starting_cash() {
        let ledger = Ledger::new(dec(100_000));
        assert_eq!(ledger.roi_percent(dec(110_000)), dec(10));
        assert_eq!(ledger.roi_percent(dec(90_000)), dec(-10));
    }

    #[test]
    fn record_valuation_appends_with_roi() {
        let mut ledger = Ledger::new(dec(100_000));
        let point = ledger.record_valuation(Utc::now(), dec(105_000));
        assert_eq!(point.roi_percent, dec(5));
        assert_eq!(ledger.valuations().len(), 1);
    }

    #[test]
    fn view_exposes_cash_and_sorted_positions() {
        let mut ledger = Ledger::new(dec(10_000));
        for symbol in ["QQQ", "NVDA"] {
            let d = decision(symbol, Action::Buy, 5);
            ledger.apply(&d, SizedOrder::Buy { qty: 5 }, dec(10)).unwrap();
        }
        let view = ledger.view();
        assert_eq!(view.cash, dec(9_900));
        let symbols: Vec<_> = view.positions.keys().cloned().collect();
        assert_eq!(symbols, vec!["NVDA".to_string(), "QQQ".to_string()]);
    }
}
