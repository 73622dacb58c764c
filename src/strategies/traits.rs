// src/strategies/traits.rs
use crate::core::ledger::PortfolioView;
use crate::types::{Decision, PriceSnapshot};
use async_trait::async_trait;

#[async_trait]
pub trait Advisor: Send + Sync {
    fn name(&self) -> String;

    /// Produce a decision for this cycle. Total by contract: transport
    /// failures, timeouts, and malformed output must degrade to a hold
    /// decision inside the implementation, never surface as an error.
    async fn advise(&self, portfolio: &PortfolioView, snapshot: &PriceSnapshot) -> Decision;
}
