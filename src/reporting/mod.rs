// src/reporting/mod.rs
use crate::connectors::traits::Notifier;
use crate::types::{TradeRecord, ValuationPoint};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Append-only JSONL trade log, one file per calendar day. This is the sole
/// persisted history; the in-memory ledger is rebuilt from config on every
/// start.
pub struct TradeJournal {
    dir: PathBuf,
}

impl TradeJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn append(&self, record: &TradeRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let day = record.timestamp.format("%Y%m%d");
        let path = self.dir.join(format!("trades_{day}.jsonl"));

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// Dump the per-cycle valuation samples as CSV. Called once, on shutdown.
pub async fn export_valuations_csv(dir: &Path, points: &[ValuationPoint]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join("valuations.csv");

    let mut out = String::from("timestamp,total_value,roi_percent\n");
    for p in points {
        out.push_str(&format!(
            "{},{},{}\n",
            p.timestamp.to_rfc3339(),
            p.total_value,
            p.roi_percent
        ));
    }
    tokio::fs::write(&path, out).await?;
    Ok(path)
}

/// Notifier that just writes the summary to the log. Stands in whenever no
/// real mail/webhook transport is wired up.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        info!("{subject}\n{body}");
        Ok(())
    }
}

pub struct ReportSummary<'a> {
    pub total_value: Decimal,
    pub pnl: Decimal,
    pub cash: Decimal,
    pub positions: &'a BTreeMap<String, u64>,
    pub live: bool,
}

impl ReportSummary<'_> {
    fn render(&self, date: NaiveDate) -> String {
        let positions = if self.positions.is_empty() {
            "none".to_string()
        } else {
            self.positions
                .iter()
                .map(|(s, q)| format!("{s}: {q}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Date: {date}\nMode: {mode}\nTotal value: ${total:.2}\nP&L: ${pnl:.2}\nCash: ${cash:.2}\nPositions: {positions}",
            mode = if self.live { "live" } else { "paper" },
            total = self.total_value,
            pnl = self.pnl,
            cash = self.cash,
        )
    }
}

/// Sends the human-readable summary at most once per calendar day. A failed
/// dispatch is logged and retried on a later cycle of the same day.
pub struct DailyReporter {
    enabled: bool,
    last_sent: Option<NaiveDate>,
    notifier: Box<dyn Notifier>,
}

impl DailyReporter {
    pub fn new(notifier: Box<dyn Notifier>, enabled: bool) -> Self {
        Self {
            enabled,
            last_sent: None,
            notifier,
        }
    }

    pub async fn maybe_send(&mut self, now: DateTime<Utc>, summary: &ReportSummary<'_>) {
        if !self.enabled {
            return;
        }
        let today = now.date_naive();
        if self.last_sent == Some(today) {
            return;
        }

        let subject = format!("Daily trading summary {today}");
        match self.notifier.notify(&subject, &summary.render(today)).await {
            Ok(()) => self.last_sent = Some(today),
            Err(e) => warn!("daily report dispatch failed: {e:#}"),
        }
    }
}
