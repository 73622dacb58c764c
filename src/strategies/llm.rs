// src/strategies/llm.rs
use crate::connectors::traits::CompletionClient;
use crate::core::ledger::PortfolioView;
use crate::core::parser;
use crate::strategies::traits::Advisor;
use crate::types::{Decision, PriceSnapshot, Quote};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Asks a language model for the next trade. The model sees cash, risk
/// limit, positions, and rounded prices, and is asked for a single JSON
/// object; whatever comes back goes through the decision parser.
pub struct LlmAdvisor {
    client: Box<dyn CompletionClient>,
    symbols: Vec<String>,
    risk_percent: Decimal,
    timeout: Duration,
}

impl LlmAdvisor {
    pub fn new(
        client: Box<dyn CompletionClient>,
        symbols: Vec<String>,
        risk_percent: Decimal,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            symbols,
            risk_percent,
            timeout,
        }
    }

    fn default_symbol(&self) -> &str {
        &self.symbols[0]
    }

    fn build_prompt(&self, portfolio: &PortfolioView, snapshot: &PriceSnapshot) -> String {
        let positions = portfolio
            .positions
            .iter()
            .map(|(s, q)| format!("\"{s}\":{q}"))
            .collect::<Vec<_>>()
            .join(",");

        // BTreeMap keeps the price listing stable across cycles.
        let quotes: BTreeMap<&str, &Quote> = snapshot
            .iter()
            .map(|(s, q)| (s.as_str(), q))
            .collect();
        let prices = quotes
            .iter()
            .map(|(s, q)| match q.change_pct {
                Some(change) => format!("\"{s}\":{} ({change:+.2}%)", q.price.round_dp(2)),
                None => format!("\"{s}\":{}", q.price.round_dp(2)),
            })
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "Cash ${cash} | Risk {risk}% | Positions {{{positions}}} | Prices {{{prices}}} \
             → JSON: {{symbol,action:'buy'|'sell'|'hold',qty:int,reasoning:string}}",
            cash = portfolio.cash.round_dp(0),
            risk = self.risk_percent,
        )
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    fn name(&self) -> String {
        "llm".to_string()
    }

    async fn advise(&self, portfolio: &PortfolioView, snapshot: &PriceSnapshot) -> Decision {
        let prompt = self.build_prompt(portfolio, snapshot);
        debug!("prompt: {prompt}");

        let raw = match tokio::time::timeout(self.timeout, self.client.complete(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("model call failed: {e:#}");
                return Decision::hold(self.default_symbol(), "model unavailable");
            }
            Err(_) => {
                warn!("model call timed out after {:?}", self.timeout);
                return Decision::hold(self.default_symbol(), "model timeout");
            }
        };

        parser::parse(&raw, &self.symbols, self.default_symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;
    use anyhow::{anyhow, Result};

    struct FixedClient(String);

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    struct SlowClient;

    #[async_trait]
    impl CompletionClient for SlowClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("{}".to_string())
        }
    }

    fn advisor_with_timeout(client: Box<dyn CompletionClient>, timeout: Duration) -> LlmAdvisor {
        LlmAdvisor::new(
            client,
            vec!["TQQQ".into(), "NVDA".into()],
            Decimal::from(90),
            timeout,
        )
    }

    fn advisor(client: Box<dyn CompletionClient>) -> LlmAdvisor {
        advisor_with_timeout(client, Duration::from_secs(5))
    }

    fn view(cash: i64) -> PortfolioView {
        PortfolioView {
            cash: Decimal::from(cash),
            positions: BTreeMap::new(),
        }
    }

    fn snapshot() -> PriceSnapshot {
        [(
            "NVDA".to_string(),
            Quote {
                price: Decimal::new(18123, 2),
                change_pct: Some(1.2),
            },
        )]
        .into()
    }

    #[tokio::test]
    async fn parses_model_reply_into_decision() {
        let advisor = advisor(Box::new(FixedClient(
            r#"Sure: {"symbol":"NVDA","action":"buy","qty":5,"reasoning":"momentum"}"#.into(),
        )));
        let d = advisor.advise(&view(100_000), &snapshot()).await;
        assert_eq!(d.symbol, "NVDA");
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.qty, 5);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_hold() {
        let advisor = advisor(Box::new(FailingClient));
        let d = advisor.advise(&view(100_000), &snapshot()).await;
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.symbol, "TQQQ");
        assert_eq!(d.reasoning, "model unavailable");
    }

    #[tokio::test]
    async fn timeout_degrades_to_hold() {
        let advisor = advisor_with_timeout(Box::new(SlowClient), Duration::from_millis(20));
        let d = advisor.advise(&view(100_000), &snapshot()).await;
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.reasoning, "model timeout");
    }

    #[tokio::test]
    async fn prompt_carries_cash_risk_and_rounded_prices() {
        let advisor = advisor(Box::new(FixedClient("{}".into())));
        let prompt = advisor.build_prompt(&view(100_000), &snapshot());
        assert!(prompt.contains("Cash $100000"));
        assert!(prompt.contains("Risk 90%"));
        assert!(prompt.contains("\"NVDA\":181.23 (+1.20%)"));
        assert!(prompt.contains("action:'buy'|'sell'|'hold'"));
    }
}
