use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Events below this relevance are dropped from reports.
pub const MIN_RELEVANCE: u8 = 6;

/// Colorado Basin states, prioritized for district operations.
const TARGET_STATES: &[&str] = &[
    "Wyoming",
    "California",
    "Nevada",
    "Utah",
    "Colorado",
    "Arizona",
    "New Mexico",
];

const PRIORITY_REGIONS: &[&str] = &[
    "Imperial Valley",
    "Southern California",
    "Colorado River",
    "Salton Sea",
    "Imperial County",
    "Coachella Valley",
];

const CLIMATE_KEYWORDS: &[&str] = &[
    "wildfire", "drought", "flood", "heatwave", "storm", "forecast", "weather", "climate",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEvent {
    pub headline: String,
    pub region: String,
    pub summary: String,
    /// Operational relevance, 1 (minimal) to 10 (direct impact).
    #[serde(default)]
    pub relevance: u8,
}

/// Searches for recent climate events affecting the monitored basins.
/// Climate events only; water policy and regulation are out of scope.
pub struct ClimateNewsAgent {
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl ClimateNewsAgent {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: Client::new(),
        }
    }

    /// Returns relevant events, most relevant first. Without an API key this
    /// is an empty list: climate events are never fabricated locally.
    pub async fn fetch_events(&self) -> Result<Vec<ClimateEvent>> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                info!("No OpenAI API key configured, skipping climate news search");
                return Ok(Vec::new());
            }
        };

        info!("Searching for recent climate events...");

        let raw = match self.search(api_key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Climate news search failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut events = parse_events(&raw);
        for event in &mut events {
            if event.relevance == 0 {
                event.relevance = score_relevance(event);
            }
        }
        events.retain(|e| e.relevance >= MIN_RELEVANCE);
        events.sort_by(|a, b| {
            b.relevance
                .cmp(&a.relevance)
                .then_with(|| a.headline.cmp(&b.headline))
        });

        info!("Found {} relevant climate event(s)", events.len());
        Ok(events)
    }

    async fn search(&self, api_key: &str) -> Result<String> {
        let instructions = format!(
            "You are a climate events analyst for a water district. Report recent \
            (last 7-10 days) climate events affecting these priority regions: {}. \
            Secondary focus, Colorado Basin states: {}. Event keywords: {}. \
            FOCUS ONLY ON CLIMATE/WEATHER EVENTS, NOT POLICY OR WATER MANAGEMENT \
            DECISIONS. Score each event's operational relevance from 1 to 10 and \
            include only events scoring {} or higher. Respond with a JSON array of \
            objects with fields: headline, region, summary, relevance.",
            PRIORITY_REGIONS.join(", "),
            TARGET_STATES.join(", "),
            CLIMATE_KEYWORDS.join(", "),
            MIN_RELEVANCE
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": instructions},
                {"role": "user", "content": "List the relevant climate events as JSON."}
            ],
            "max_tokens": 800,
        });

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("requesting climate news")?
            .error_for_status()
            .context("climate news request returned an error")?;

        let parsed: serde_json::Value =
            response.json().await.context("decoding climate news response")?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .context("climate news response had no content")
    }
}

/// Extracts the JSON array from the model reply, tolerating surrounding
/// prose or a markdown fence. Unparseable replies yield no events.
fn parse_events(raw: &str) -> Vec<ClimateEvent> {
    let start = match raw.find('[') {
        Some(i) => i,
        None => return Vec::new(),
    };
    let end = match raw.rfind(']') {
        Some(i) if i > start => i,
        _ => return Vec::new(),
    };
    serde_json::from_str(&raw[start..=end]).unwrap_or_default()
}

/// Deterministic fallback scorer for events the model left unscored.
/// Priority-region events outrank basin-state events, which outrank
/// keyword-only matches.
pub fn score_relevance(event: &ClimateEvent) -> u8 {
    let text = format!("{} {} {}", event.headline, event.region, event.summary).to_lowercase();

    if PRIORITY_REGIONS.iter().any(|r| text.contains(&r.to_lowercase())) {
        9
    } else if TARGET_STATES.iter().any(|s| text.contains(&s.to_lowercase())) {
        7
    } else if CLIMATE_KEYWORDS.iter().any(|k| text.contains(k)) {
        5
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(headline: &str, region: &str, summary: &str) -> ClimateEvent {
        ClimateEvent {
            headline: headline.to_string(),
            region: region.to_string(),
            summary: summary.to_string(),
            relevance: 0,
        }
    }

    #[test]
    fn priority_region_outranks_basin_state_and_keywords() {
        let direct = event("Heat dome settles over Imperial Valley", "California", "");
        let basin = event("Snowpack shrinks", "Colorado", "early melt across the basin");
        let keyword = event("Wildfire smoke blankets Pacific Northwest", "Oregon", "");
        let unrelated = event("Earnings season opens", "NYSE", "");

        let direct_score = score_relevance(&direct);
        let basin_score = score_relevance(&basin);
        let keyword_score = score_relevance(&keyword);
        let unrelated_score = score_relevance(&unrelated);

        assert!(direct_score > basin_score);
        assert!(basin_score > keyword_score);
        assert!(keyword_score > unrelated_score);
        assert!(direct_score >= MIN_RELEVANCE);
        assert!(keyword_score < MIN_RELEVANCE);
    }

    #[test]
    fn parses_events_from_fenced_reply() {
        let raw = "Here are the events:\n```json\n[\
            {\"headline\": \"Flood watch on the Colorado River\", \"region\": \"Arizona\", \
             \"summary\": \"Monsoon storms\", \"relevance\": 8}\
            ]\n```";
        let events = parse_events(raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].relevance, 8);
    }

    #[test]
    fn garbage_reply_yields_no_events() {
        assert!(parse_events("no json here").is_empty());
        assert!(parse_events("]").is_empty());
    }

    #[tokio::test]
    async fn no_api_key_means_no_events() {
        let agent = ClimateNewsAgent::new(None, "gpt-4o");
        assert!(agent.fetch_events().await.unwrap().is_empty());
    }
}
