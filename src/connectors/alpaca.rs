// src/connectors/alpaca.rs
use crate::config::BrokerConfig;
use crate::connectors::traits::ExecutionHandler;
use crate::types::{OrderReceipt, Side};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";
const LIVE_BASE_URL: &str = "https://api.alpaca.markets";

/// Market-order bridge to Alpaca. Fire-and-forget from the ledger's point of
/// view: the caller logs failures and never unwinds the paper book.
pub struct AlpacaClient {
    client: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    symbol: &'a str,
    qty: String,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    time_in_force: &'a str,
}

#[derive(Deserialize)]
struct AlpacaOrderResponse {
    id: String,
    symbol: String,
    status: String,
}

impl AlpacaClient {
    pub fn new(cfg: &BrokerConfig, live: bool, timeout: Duration) -> Self {
        let base_url = if live { LIVE_BASE_URL } else { PAPER_BASE_URL };
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl ExecutionHandler for AlpacaClient {
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        qty: u64,
    ) -> Result<OrderReceipt> {
        let side_str = match side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };

        info!("submitting order: {} {} {}", side_str, qty, symbol);

        let resp = self
            .client
            .post(format!("{}/v2/orders", self.base_url))
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
            .json(&OrderRequest {
                symbol,
                qty: qty.to_string(),
                side: side_str,
                order_type: "market",
                time_in_force: "gtc",
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Alpaca API {status}: {body}"));
        }

        let order: AlpacaOrderResponse = resp.json().await?;
        Ok(OrderReceipt {
            id: order.id,
            symbol: order.symbol,
            status: order.status,
        })
    }
}
