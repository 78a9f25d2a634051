use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::detector::DetectorConfig;
use crate::market::sources::{NoaaWaterSource, NOAA_WATER_MONITOR_URL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub analyst_model: String,
    pub news_model: String,
    pub ncdc_api_key: Option<String>,
    pub noaa_water_url: String,
    pub market_feed_url: Option<String>,
    pub data_dir: PathBuf,
    pub log_dir: String,
    pub detector: DetectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            analyst_model: "gpt-3.5-turbo".to_string(),
            news_model: "gpt-4o".to_string(),
            ncdc_api_key: None,
            noaa_water_url: NOAA_WATER_MONITOR_URL.to_string(),
            market_feed_url: None,
            data_dir: PathBuf::from("./data"),
            log_dir: "./logs".to_string(),
            detector: DetectorConfig::default(),
        }
    }
}

pub async fn load_config() -> Result<Config> {
    let mut config = Config::default();

    // Override defaults with environment variables
    if let Ok(key) = env::var("OPENAI_API_KEY") {
        config.openai_api_key = Some(key);
    }

    if let Ok(model) = env::var("ANALYST_MODEL") {
        config.analyst_model = model;
    }

    if let Ok(model) = env::var("CLIMATE_NEWS_AGENT_MODEL") {
        config.news_model = model;
    }

    if let Ok(key) = env::var("NCDC_API_KEY") {
        config.ncdc_api_key = Some(key);
    }

    if let Ok(url) = env::var("NOAA_WATER_URL") {
        config.noaa_water_url = url;
    }

    if let Ok(url) = env::var("MARKET_FEED_URL") {
        config.market_feed_url = Some(url);
    }

    if let Ok(dir) = env::var("DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }

    if let Ok(dir) = env::var("LOG_DIR") {
        config.log_dir = dir;
    }

    override_f64("MIN_GROSS_PROFIT", &mut config.detector.min_gross_profit);
    override_f64("MIN_MARGIN_PCT", &mut config.detector.min_margin_pct);
    override_f64("MIN_NET_PROFIT", &mut config.detector.min_net_profit);
    if let Ok(raw) = env::var("MAX_RESULTS") {
        match raw.parse() {
            Ok(value) => config.detector.max_results = value,
            Err(_) => warn!("Ignoring MAX_RESULTS={}: not a whole number", raw),
        }
    }

    Ok(config)
}

fn override_f64(name: &str, target: &mut f64) {
    if let Ok(raw) = env::var(name) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring {}={}: not a number", name, raw),
        }
    }
}

/// Sanity-checks credentials and connectivity before the first run.
pub async fn initialize_config() -> Result<()> {
    info!("Initializing configuration...");

    let config = load_config().await?;

    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set: AI analysis and climate news will use fallbacks");
    }
    if config.market_feed_url.is_none() {
        warn!("MARKET_FEED_URL not set: no market feed will be polled");
    }

    info!("Probing NOAA water monitor at: {}", config.noaa_water_url);
    let noaa = NoaaWaterSource::new(&config.noaa_water_url, config.ncdc_api_key.clone())?;
    match noaa.monitor().await {
        Ok(_) => info!("NOAA water monitor reachable"),
        Err(e) => warn!("Could not reach NOAA water monitor: {}", e),
    }

    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(&config.log_dir)?;
    info!(
        "Data directory ready at {}, logs at {}",
        config.data_dir.display(),
        config.log_dir
    );

    config.detector.validate()?;
    info!("Configuration initialized successfully!");
    Ok(())
}
