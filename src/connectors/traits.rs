use crate::types::{OrderReceipt, PriceSnapshot, Side};
use anyhow::Result;
use async_trait::async_trait;

/// Price source for the allow-listed symbols.
///
/// Total by contract: a symbol whose quote cannot be fetched is simply absent
/// from the returned map, and a fully failed fetch yields an empty map. The
/// engine treats absence as "untradeable this cycle".
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn snapshot(&self, symbols: &[String]) -> PriceSnapshot;
}

/// Free-form text completion endpoint. The response is untrusted; callers
/// must funnel it through the decision parser.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Best-effort mirror to a real venue. The ledger is authoritative; a failed
/// submission is logged by the caller and never rolled back.
#[async_trait]
pub trait ExecutionHandler: Send + Sync {
    async fn submit_market_order(&self, symbol: &str, side: Side, qty: u64)
        -> Result<OrderReceipt>;
}

/// Side channel for the daily summary.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}
