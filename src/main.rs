// src/main.rs
use crate::config::AppConfig;
use crate::connectors::alpaca::AlpacaClient;
use crate::connectors::traits::ExecutionHandler;
use crate::connectors::xai::XaiClient;
use crate::connectors::yahoo::YahooMarketData;
use crate::core::engine::TradingEngine;
use crate::reporting::{DailyReporter, LogNotifier, TradeJournal};
use crate::strategies::llm::LlmAdvisor;
use dotenvy::dotenv;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod config;
mod connectors;
mod core;
mod reporting;
mod strategies;
mod types;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let file_appender = tracing_appender::rolling::daily("logs", "oracle.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    // Unrecoverable configuration problems fail fast, before the loop starts.
    let config = AppConfig::new()?;

    println!("========================================");
    println!("       THE ORACLE BOT - v0.1.0");
    println!("========================================");
    println!("Symbols: {}", config.symbols.join(", "));
    println!(
        "Mode:   {}",
        if config.live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 PAPER TRADING"
        }
    );
    println!("Starting cash: ${}", config.starting_cash);
    println!("========================================");

    let timeout = Duration::from_secs(config.request_timeout_secs);

    let market = YahooMarketData::new(timeout);
    let completion = XaiClient::new(&config.model, timeout);
    let advisor = LlmAdvisor::new(
        Box::new(completion),
        config.symbols.clone(),
        config.risk_percent,
        timeout,
    );
    let execution: Option<Box<dyn ExecutionHandler>> = config.broker.as_ref().map(|broker| {
        Box::new(AlpacaClient::new(broker, config.live_trading, timeout))
            as Box<dyn ExecutionHandler>
    });
    let journal = TradeJournal::new("history");
    let reporter = DailyReporter::new(Box::new(LogNotifier), config.report.enabled);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut engine = TradingEngine::new(
        config,
        Box::new(market),
        Box::new(advisor),
        execution,
        journal,
        reporter,
        shutdown_rx,
    );

    if let Err(e) = engine.run().await {
        eprintln!("Fatal Engine Error: {}", e);
    }

    Ok(())
}
