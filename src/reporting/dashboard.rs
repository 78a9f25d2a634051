use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::detector::Opportunity;
use crate::error::Result;
use crate::market::PriceRecord;

/// Headline metrics for the dashboard view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub active_markets: usize,
    pub average_price: f64,
    pub price_spread: f64,
    pub total_volume: u64,
    pub active_opportunities: usize,
    pub last_updated: DateTime<Utc>,
}

pub fn compute_metrics(
    records: &[PriceRecord],
    active_opportunities: usize,
    now: DateTime<Utc>,
) -> DashboardMetrics {
    let locations: BTreeSet<&str> = records.iter().map(|r| r.location.as_str()).collect();
    let (min, max, sum) = records.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), r| (min.min(r.price), max.max(r.price), sum + r.price),
    );

    DashboardMetrics {
        active_markets: locations.len(),
        average_price: if records.is_empty() {
            0.0
        } else {
            sum / records.len() as f64
        },
        price_spread: if records.is_empty() { 0.0 } else { max - min },
        total_volume: records.iter().map(|r| r.volume).sum(),
        active_opportunities,
        last_updated: now,
    }
}

/// Where detection output goes. The detector itself returns data; a sink
/// implementation owns persistence.
#[async_trait]
pub trait DashboardSink: Send + Sync {
    async fn write_raw_records(&self, records: &[PriceRecord]) -> Result<()>;

    async fn write_analysis(&self, as_of: DateTime<Utc>, analysis: &str) -> Result<()>;

    async fn write_opportunities(&self, opportunities: &[Opportunity]) -> Result<()>;

    async fn write_metrics(
        &self,
        metrics: &DashboardMetrics,
        top: Option<&Opportunity>,
    ) -> Result<()>;
}

/// CSV-file dashboard under a data directory, one file per worksheet:
/// `raw_data.csv` (append), `analysis.log` (append), `opportunities.csv`
/// and `dashboard.csv` (rewritten each cycle).
pub struct CsvDashboard {
    data_dir: PathBuf,
}

impl CsvDashboard {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn append_csv(&self, file: &str, header: &str, rows: &[String]) -> Result<()> {
        let path = self.data_dir.join(file);
        let is_new = !path.exists();
        let mut out = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            writeln!(out, "{}", header)?;
        }
        for row in rows {
            writeln!(out, "{}", row)?;
        }
        Ok(())
    }

    fn rewrite_csv(&self, file: &str, header: &str, rows: &[String]) -> Result<()> {
        let path = self.data_dir.join(file);
        let mut content = String::from(header);
        content.push('\n');
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[async_trait]
impl DashboardSink for CsvDashboard {
    async fn write_raw_records(&self, records: &[PriceRecord]) -> Result<()> {
        let rows: Vec<String> = records
            .iter()
            .map(|r| {
                format!(
                    "{},{:.2},{},{},{}",
                    csv_field(&r.location),
                    r.price,
                    r.volume,
                    r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    r.source_type
                )
            })
            .collect();
        self.append_csv("raw_data.csv", "Location,Price,Volume,Date,Type", &rows)
    }

    async fn write_analysis(&self, as_of: DateTime<Utc>, analysis: &str) -> Result<()> {
        let path = self.data_dir.join("analysis.log");
        let mut out = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(out, "=== {} ===", as_of.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(out, "{}\n", analysis)?;
        Ok(())
    }

    async fn write_opportunities(&self, opportunities: &[Opportunity]) -> Result<()> {
        let rows: Vec<String> = opportunities
            .iter()
            .map(|o| {
                format!(
                    "{},{:.2},{},{:.2},{:.2},{:.2},{}",
                    csv_field(&o.buy_location),
                    o.buy_price,
                    csv_field(&o.sell_location),
                    o.sell_price,
                    o.net_profit,
                    o.risk_score,
                    o.timestamp.format("%Y-%m-%d %H:%M:%S")
                )
            })
            .collect();
        self.rewrite_csv(
            "opportunities.csv",
            "Buy Location,Buy Price,Sell Location,Sell Price,Net Profit,Risk Score,Timestamp",
            &rows,
        )
    }

    async fn write_metrics(
        &self,
        metrics: &DashboardMetrics,
        top: Option<&Opportunity>,
    ) -> Result<()> {
        info!("Updating dashboard metrics");

        let mut rows = vec![
            format!("Active Markets,{}", metrics.active_markets),
            format!("Average Price,${:.0}", metrics.average_price),
            format!("Price Spread,${:.0}", metrics.price_spread),
            format!("Total Volume,{}", metrics.total_volume),
            format!("Active Opportunities,{}", metrics.active_opportunities),
            format!(
                "Last Updated,{}",
                metrics.last_updated.format("%Y-%m-%d %H:%M:%S")
            ),
        ];

        if let Some(opp) = top {
            rows.push(format!(
                "Top Opportunity,{}",
                csv_field(&format!(
                    "Buy {} @ ${:.2} / Sell {} @ ${:.2} / ${:.2} net / {:.0}% risk",
                    opp.buy_location,
                    opp.buy_price,
                    opp.sell_location,
                    opp.sell_price,
                    opp.net_profit,
                    opp.risk_score * 100.0
                ))
            ));
        }

        self.rewrite_csv("dashboard.csv", "Metric,Value", &rows)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
