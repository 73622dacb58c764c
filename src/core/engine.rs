// src/core/engine.rs
use crate::config::AppConfig;
use crate::connectors::traits::{ExecutionHandler, MarketData};
use crate::core::ledger::Ledger;
use crate::core::risk::{self, SizedOrder};
use crate::reporting::{self, DailyReporter, ReportSummary, TradeJournal};
use crate::strategies::traits::Advisor;
use crate::types::{Action, Side, TradeRecord};
use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Drives the fetch → advise → size → apply → report cycle at a fixed
/// cadence. Exactly one engine instance may run per ledger.
pub struct TradingEngine {
    config: AppConfig,
    market: Box<dyn MarketData>,
    advisor: Box<dyn Advisor>,
    execution: Option<Box<dyn ExecutionHandler>>,
    ledger: Ledger,
    journal: TradeJournal,
    reporter: DailyReporter,
    shutdown: watch::Receiver<bool>,
}

impl TradingEngine {
    pub fn new(
        config: AppConfig,
        market: Box<dyn MarketData>,
        advisor: Box<dyn Advisor>,
        execution: Option<Box<dyn ExecutionHandler>>,
        journal: TradeJournal,
        reporter: DailyReporter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let ledger = Ledger::new(config.starting_cash);
        Self {
            config,
            market,
            advisor,
            execution,
            ledger,
            journal,
            reporter,
            shutdown,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub async fn run(&mut self) -> Result<()> {
        info!(
            "engine loop running; {} mode, advisor \"{}\", {}s cadence",
            if self.config.live_trading {
                "live"
            } else {
                "paper"
            },
            self.advisor.name(),
            self.config.cycle_secs
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.cycle_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Cycle boundary: nothing below this line may kill the loop.
                    if let Err(e) = self.run_cycle().await {
                        error!("cycle failed: {e:#}");
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.finish().await
    }

    async fn run_cycle(&mut self) -> Result<()> {
        let snapshot = self.market.snapshot(&self.config.symbols).await;
        if snapshot.is_empty() {
            warn!("no prices available this cycle; holding");
            return Ok(());
        }

        let opening = self.ledger.mark_to_market(&snapshot);
        if !opening.missing.is_empty() {
            warn!("valuation approximate; no price for {:?}", opening.missing);
        }
        info!(
            "portfolio ${:.0} | cash ${:.0}",
            opening.total,
            self.ledger.cash()
        );

        let decision = self.advisor.advise(&self.ledger.view(), &snapshot).await;

        let quote_price = snapshot.get(&decision.symbol).map(|q| q.price);
        let order = match quote_price {
            Some(price) => risk::size(
                decision.action,
                decision.qty,
                self.ledger.cash(),
                self.ledger.position(&decision.symbol),
                price,
                self.config.risk_percent,
            ),
            None => {
                if decision.action != Action::Hold {
                    warn!("{} is untradeable this cycle; holding", decision.symbol);
                }
                SizedOrder::Hold
            }
        };

        if decision.action != Action::Hold && order.qty() < decision.qty {
            info!(
                "requested {} {} {} reduced to {}",
                decision.action,
                decision.qty,
                decision.symbol,
                order.qty()
            );
        }

        let price = quote_price.unwrap_or(Decimal::ZERO);
        let record = match self.ledger.apply(&decision, order, price) {
            Ok(record) => record,
            Err(e) => {
                // Unreachable when sizing is correct; the apply is rejected
                // and the loop carries on with the book intact.
                error!("ledger rejected apply: {e}");
                return Ok(());
            }
        };

        info!(
            "TRADE → {} @ ${:.2} | {}",
            record.summary(),
            record.price,
            record.reasoning
        );

        if let Err(e) = self.journal.append(&record).await {
            warn!("trade journal write failed: {e:#}");
        }

        self.mirror(&record).await;

        let closing = self.ledger.mark_to_market(&snapshot);
        self.ledger.record_valuation(Utc::now(), closing.total);

        let view = self.ledger.view();
        let summary = ReportSummary {
            total_value: closing.total,
            pnl: closing.total - self.ledger.starting_cash(),
            cash: view.cash,
            positions: &view.positions,
            live: self.config.live_trading,
        };
        self.reporter.maybe_send(Utc::now(), &summary).await;

        Ok(())
    }

    /// Best-effort mirror to the real venue. The paper book already holds
    /// the fill; a failure here is logged and never rolled back.
    async fn mirror(&self, record: &TradeRecord) {
        if !self.config.live_trading || record.qty == 0 {
            return;
        }
        let Some(execution) = &self.execution else {
            return;
        };
        let side = match record.action {
            Action::Buy => Side::Buy,
            Action::Sell => Side::Sell,
            Action::Hold => return,
        };

        match execution
            .submit_market_order(&record.symbol, side, record.qty)
            .await
        {
            Ok(receipt) => info!(
                "live order accepted for {}: {} ({})",
                receipt.symbol, receipt.id, receipt.status
            ),
            Err(e) => error!("live order failed: {e:#}"),
        }
    }

    async fn finish(&mut self) -> Result<()> {
        info!("shutdown requested; computing final valuation");
        let snapshot = self.market.snapshot(&self.config.symbols).await;
        let valuation = self.ledger.mark_to_market(&snapshot);
        let point = self.ledger.record_valuation(Utc::now(), valuation.total);
        info!(
            "final portfolio ${:.2} | ROI {:.2}% | {} trades recorded",
            point.total_value,
            point.roi_percent,
            self.ledger.history().len()
        );

        match reporting::export_valuations_csv(self.journal.dir(), self.ledger.valuations()).await
        {
            Ok(path) => info!("valuation history exported to {}", path.display()),
            Err(e) => warn!("valuation export failed: {e:#}"),
        }
        Ok(())
    }
}
