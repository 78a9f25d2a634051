use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::market::PriceRecord;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_ANALYSIS_TOKENS: u32 = 600;

/// Per-location aggregate over the stored records, mirroring the summary
/// table fed to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationStats {
    pub count: usize,
    pub mean_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_volume: u64,
}

pub fn summarize_by_location(records: &[PriceRecord]) -> BTreeMap<String, LocationStats> {
    let mut stats: BTreeMap<String, LocationStats> = BTreeMap::new();
    for record in records {
        let entry = stats
            .entry(record.location.clone())
            .or_insert(LocationStats {
                count: 0,
                mean_price: 0.0,
                min_price: f64::INFINITY,
                max_price: f64::NEG_INFINITY,
                total_volume: 0,
            });
        // Running mean keeps a single pass over the records.
        entry.mean_price =
            (entry.mean_price * entry.count as f64 + record.price) / (entry.count + 1) as f64;
        entry.count += 1;
        entry.min_price = entry.min_price.min(record.price);
        entry.max_price = entry.max_price.max(record.price);
        entry.total_volume += record.volume;
    }
    stats
}

fn format_summary(stats: &BTreeMap<String, LocationStats>) -> String {
    let mut out = String::new();
    for (location, s) in stats {
        out.push_str(&format!(
            "{}: mean ${:.2}, min ${:.2}, max ${:.2}, {} record(s), {} AF total volume\n",
            location, s.mean_price, s.min_price, s.max_price, s.count, s.total_volume
        ));
    }
    out
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Asks the model for a market read over recent records. Without an API key
/// it falls back to a deterministic heuristic summary, so the pipeline runs
/// end to end in any environment.
pub struct MarketAnalyst {
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl MarketAnalyst {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: Client::new(),
        }
    }

    pub async fn analyze(&self, records: &[PriceRecord]) -> Result<String> {
        info!("Running market analysis over {} record(s)", records.len());

        // Keep the prompt bounded to the most recent observations.
        let recent: Vec<PriceRecord> = records.iter().rev().take(20).rev().cloned().collect();
        let stats = summarize_by_location(&recent);

        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                info!("No OpenAI API key configured, using heuristic analysis");
                return Ok(heuristic_analysis(&stats));
            }
        };

        let prompt = self.build_prompt(&recent, &stats);
        match self.chat(api_key, &prompt).await {
            Ok(analysis) => Ok(analysis),
            Err(e) => {
                error!("AI analysis failed, falling back to heuristic: {}", e);
                Ok(heuristic_analysis(&stats))
            }
        }
    }

    fn build_prompt(&self, recent: &[PriceRecord], stats: &BTreeMap<String, LocationStats>) -> String {
        let mut transactions = String::new();
        for record in recent.iter().rev().take(10).rev() {
            transactions.push_str(&format!(
                "{} | ${:.2}/AF | {} AF | {} | {}\n",
                record.location,
                record.price,
                record.volume,
                record.source_type,
                record.timestamp.format("%Y-%m-%d %H:%M:%S")
            ));
        }

        format!(
            "Analyze this water market data for arbitrage opportunities:\n\n\
            Recent Transactions:\n{}\n\
            Market Summary by Location:\n{}\n\
            Please provide:\n\
            1. Top 3 arbitrage opportunities with specific buy/sell locations\n\
            2. Risk factors to consider\n\
            3. Optimal timing for trades\n\
            4. Expected profit margins\n\
            5. Market trend predictions\n\n\
            Be specific about locations, prices, and profit calculations.",
            transactions,
            format_summary(stats)
        )
    }

    async fn chat(&self, api_key: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_ANALYSIS_TOKENS,
        };

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("requesting chat completion")?
            .error_for_status()
            .context("chat completion returned an error")?;

        let parsed: ChatResponse = response
            .json()
            .await
            .context("decoding chat completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("chat completion returned no choices")
    }
}

/// Spread-based read on the market used when no model is available. Purely a
/// function of the stats, so repeated cycles over the same data agree.
fn heuristic_analysis(stats: &BTreeMap<String, LocationStats>) -> String {
    if stats.len() < 2 {
        return "Not enough markets to analyze: need observations from at least two locations."
            .to_string();
    }

    let cheapest = stats
        .iter()
        .min_by(|a, b| a.1.mean_price.total_cmp(&b.1.mean_price))
        .map(|(loc, s)| (loc.clone(), s.mean_price));
    let priciest = stats
        .iter()
        .max_by(|a, b| a.1.mean_price.total_cmp(&b.1.mean_price))
        .map(|(loc, s)| (loc.clone(), s.mean_price));

    match (cheapest, priciest) {
        (Some((buy_loc, buy_price)), Some((sell_loc, sell_price))) => {
            let spread = sell_price - buy_price;
            format!(
                "Heuristic analysis across {} market(s). Widest mean spread: buy {} at \
                ${:.2}/AF, sell {} at ${:.2}/AF (${:.2}/AF gross). Transport costs and \
                drought exposure not yet netted; see the opportunity table for the \
                ranked, risk-scored view.",
                stats.len(),
                buy_loc,
                buy_price,
                sell_loc,
                sell_price,
                spread
            )
        }
        _ => "No analyzable market data in this cycle.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::SourceType;
    use chrono::{TimeZone, Utc};

    fn record(location: &str, price: f64, volume: u64) -> PriceRecord {
        PriceRecord {
            location: location.to_string(),
            price,
            volume,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            source_type: SourceType::Surface,
        }
    }

    #[test]
    fn summary_groups_by_location() {
        let records = vec![
            record("Central Valley", 400.0, 1000),
            record("Central Valley", 500.0, 500),
            record("Bay Area", 750.0, 600),
        ];
        let stats = summarize_by_location(&records);

        assert_eq!(stats.len(), 2);
        let cv = &stats["Central Valley"];
        assert_eq!(cv.count, 2);
        assert!((cv.mean_price - 450.0).abs() < 1e-9);
        assert_eq!(cv.min_price, 400.0);
        assert_eq!(cv.max_price, 500.0);
        assert_eq!(cv.total_volume, 1500);
    }

    #[test]
    fn heuristic_names_widest_spread() {
        let records = vec![
            record("Imperial Valley", 380.0, 1200),
            record("Bay Area", 750.0, 600),
            record("Central Valley", 450.0, 1000),
        ];
        let analysis = heuristic_analysis(&summarize_by_location(&records));

        assert!(analysis.contains("buy Imperial Valley"));
        assert!(analysis.contains("sell Bay Area"));
    }

    #[test]
    fn heuristic_needs_two_markets() {
        let records = vec![record("Bay Area", 750.0, 600)];
        let analysis = heuristic_analysis(&summarize_by_location(&records));
        assert!(analysis.contains("at least two locations"));
    }

    #[tokio::test]
    async fn analyze_without_key_is_deterministic() {
        let analyst = MarketAnalyst::new(None, "gpt-4o");
        let records = vec![
            record("Imperial Valley", 380.0, 1200),
            record("Bay Area", 750.0, 600),
        ];
        let first = analyst.analyze(&records).await.unwrap();
        let second = analyst.analyze(&records).await.unwrap();
        assert_eq!(first, second);
    }
}
