// src/connectors/yahoo.rs
use crate::connectors::traits::MarketData;
use crate::types::{PriceSnapshot, Quote};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Quote provider backed by the Yahoo Finance v8 chart API (no auth).
pub struct YahooMarketData {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
}

impl YahooMarketData {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .user_agent(
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                     AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/120.0.0.0 Safari/537.36",
                )
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn fetch_one(&self, symbol: &str) -> Result<Quote> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{symbol}?range=1d&interval=1d"
        );

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("Yahoo API returned {} for {symbol}", resp.status()));
        }

        let data: ChartResponse = resp.json().await?;
        if let Some(err) = data.chart.error {
            return Err(anyhow!("Yahoo error for {symbol}: {err}"));
        }

        let results = data
            .chart
            .result
            .ok_or_else(|| anyhow!("no chart results for {symbol}"))?;
        let meta = &results
            .first()
            .ok_or_else(|| anyhow!("empty chart results for {symbol}"))?
            .meta;

        let raw_price = meta
            .regular_market_price
            .ok_or_else(|| anyhow!("no price for {symbol}"))?;
        let price = Decimal::from_f64(raw_price)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| anyhow!("non-positive price {raw_price} for {symbol}"))?;

        let change_pct = meta
            .chart_previous_close
            .filter(|prev| *prev > 0.0)
            .map(|prev| (raw_price - prev) / prev * 100.0);

        Ok(Quote { price, change_pct })
    }
}

#[async_trait]
impl MarketData for YahooMarketData {
    async fn snapshot(&self, symbols: &[String]) -> PriceSnapshot {
        let fetches = symbols
            .iter()
            .map(|symbol| async move { (symbol, self.fetch_one(symbol).await) });

        let mut snapshot = PriceSnapshot::new();
        for (symbol, result) in join_all(fetches).await {
            match result {
                Ok(quote) => {
                    snapshot.insert(symbol.clone(), quote);
                }
                // The symbol is untradeable this cycle; the loop goes on.
                Err(e) => warn!("price fetch failed for {symbol}: {e}"),
            }
        }
        snapshot
    }
}
