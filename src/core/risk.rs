// src/core/risk.rs
use crate::types::Action;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Outcome of sizing a decision. Quantities are always executable as-is:
/// a buy is affordable under the risk cap, a sell is covered by inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizedOrder {
    Buy { qty: u64 },
    Sell { qty: u64 },
    Hold,
}

impl SizedOrder {
    pub fn qty(&self) -> u64 {
        match self {
            SizedOrder::Buy { qty } | SizedOrder::Sell { qty } => *qty,
            SizedOrder::Hold => 0,
        }
    }
}

/// Compute the executable quantity under the configured risk limits.
///
/// Buys are clamped to `floor((cash * risk_percent / 100) / price)`, a
/// fraction of current cash, not of total equity. Sells are rejected outright
/// when the requested quantity exceeds inventory; selling more than held is
/// an invalid instruction, not a partial fill.
pub fn size(
    action: Action,
    requested_qty: u64,
    cash: Decimal,
    held_qty: u64,
    price: Decimal,
    risk_percent: Decimal,
) -> SizedOrder {
    if price <= Decimal::ZERO {
        return SizedOrder::Hold;
    }

    match action {
        Action::Hold => SizedOrder::Hold,
        Action::Buy => {
            let budget = cash * risk_percent / Decimal::from(100);
            let cap = (budget / price).floor().to_u64().unwrap_or(0);
            let qty = requested_qty.min(cap);
            if qty == 0 {
                SizedOrder::Hold
            } else {
                SizedOrder::Buy { qty }
            }
        }
        Action::Sell => {
            if requested_qty == 0 || requested_qty > held_qty {
                SizedOrder::Hold
            } else {
                SizedOrder::Sell { qty: requested_qty }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn buy_is_clamped_to_risk_cap() {
        // cash $100,000 at 90% risk, price $10 -> cap 9,000
        let order = size(Action::Buy, 20_000, dec(100_000), 0, dec(10), dec(90));
        assert_eq!(order, SizedOrder::Buy { qty: 9_000 });
    }

    #[test]
    fn buy_below_cap_passes_through() {
        let order = size(Action::Buy, 100, dec(100_000), 0, dec(10), dec(90));
        assert_eq!(order, SizedOrder::Buy { qty: 100 });
    }

    #[test]
    fn buy_cap_uses_floor() {
        // budget $95, price $10 -> cap 9, not 9.5
        let order = size(Action::Buy, 50, dec(95), 0, dec(10), dec(100));
        assert_eq!(order, SizedOrder::Buy { qty: 9 });
    }

    #[test]
    fn unaffordable_buy_degenerates_to_hold() {
        let order = size(Action::Buy, 10, dec(5), 0, dec(10), dec(90));
        assert_eq!(order, SizedOrder::Hold);
    }

    #[test]
    fn zero_risk_percent_blocks_all_buys() {
        let order = size(Action::Buy, 10, dec(100_000), 0, dec(10), dec(0));
        assert_eq!(order, SizedOrder::Hold);
    }

    #[test]
    fn full_risk_percent_deploys_all_cash() {
        let order = size(Action::Buy, 1_000_000, dec(100_000), 0, dec(10), dec(100));
        assert_eq!(order, SizedOrder::Buy { qty: 10_000 });
    }

    #[test]
    fn sell_beyond_inventory_is_rejected() {
        // held 50, requested 100 -> rejected outright, not clamped
        let order = size(Action::Sell, 100, dec(0), 50, dec(10), dec(90));
        assert_eq!(order, SizedOrder::Hold);
    }

    #[test]
    fn sell_within_inventory_passes_through() {
        let order = size(Action::Sell, 50, dec(0), 50, dec(10), dec(90));
        assert_eq!(order, SizedOrder::Sell { qty: 50 });
    }

    #[test]
    fn zero_qty_sell_is_hold() {
        let order = size(Action::Sell, 0, dec(0), 50, dec(10), dec(90));
        assert_eq!(order, SizedOrder::Hold);
    }

    #[test]
    fn hold_action_stays_hold() {
        let order = size(Action::Hold, 100, dec(100_000), 50, dec(10), dec(90));
        assert_eq!(order, SizedOrder::Hold);
    }

    #[test]
    fn non_positive_price_forces_hold() {
        assert_eq!(
            size(Action::Buy, 10, dec(100_000), 0, dec(0), dec(90)),
            SizedOrder::Hold
        );
        assert_eq!(
            size(Action::Sell, 10, dec(100_000), 50, dec(-1), dec(90)),
            SizedOrder::Hold
        );
    }

    #[test]
    fn executable_never_exceeds_request_or_cap() {
        // spot checks of the buy-cap property across a small grid
        for (cash, price, risk, req) in [
            (100_000, 10, 90, 20_000u64),
            (1_000, 3, 50, 10_000),
            (77, 13, 100, 5),
            (0, 10, 90, 100),
        ] {
            let order = size(Action::Buy, req, dec(cash), 0, dec(price), dec(risk));
            let cap = (dec(cash) * dec(risk) / dec(100) / dec(price))
                .floor()
                .to_u64()
                .unwrap();
            assert!(order.qty() <= cap);
            assert!(order.qty() <= req);
        }
    }
}
