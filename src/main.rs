mod agent;
mod config;
mod detector;
mod error;
mod market;
mod reporting;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::time::{Duration, Instant};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use agent::{ClimateNewsAgent, MarketAnalyst};
use detector::{Opportunity, OpportunityDetector, StaticWeatherTable, TransportCostModel};
use market::{MarketDataSource, MarketFeedSource, SnapshotStore};
use reporting::{compute_metrics, CsvDashboard, CycleLog, CycleLogger, DashboardSink};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run detection cycles against the configured market sources
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// Seconds between cycles
        #[arg(long, default_value_t = 3600)]
        interval: u64,
    },
    /// Check credentials, connectivity, and data directories
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Starting WaterSeer - water market arbitrage oracle");

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Run { once, interval }) => {
            run_waterseer(*once, Duration::from_secs(*interval)).await?;
        }
        Some(Commands::Init) => {
            info!("Initializing WaterSeer configuration...");
            config::initialize_config().await?;
        }
        None => {
            info!("No command specified. Use --help for available commands.");
        }
    }

    Ok(())
}

async fn run_waterseer(once: bool, interval: Duration) -> Result<()> {
    info!("Loading configuration...");
    let config = config::load_config().await?;

    // Initialize components
    let detector = OpportunityDetector::new(config.detector.clone())
        .context("invalid detector configuration")?;
    let weather = StaticWeatherTable::california();
    let transport = TransportCostModel::california();
    let analyst = MarketAnalyst::new(config.openai_api_key.clone(), &config.analyst_model);
    let news_agent = ClimateNewsAgent::new(config.openai_api_key.clone(), &config.news_model);
    let dashboard = CsvDashboard::new(&config.data_dir)?;
    let cycle_logger = CycleLogger::new(Some(config.log_dir.as_str()))?;

    let mut sources: Vec<Box<dyn MarketDataSource>> = Vec::new();
    if let Some(url) = &config.market_feed_url {
        sources.push(Box::new(MarketFeedSource::new("market-feed", url)?));
    }
    if sources.is_empty() {
        info!("No market sources configured; cycles will detect over stored data only");
    }

    let mut store = SnapshotStore::new();
    let mut ticker = tokio::time::interval(interval);

    info!("WaterSeer is running. Monitoring water markets...");

    loop {
        ticker.tick().await;
        if let Err(e) = run_cycle(
            &sources,
            &mut store,
            &analyst,
            &news_agent,
            &detector,
            &weather,
            &transport,
            &dashboard,
            &cycle_logger,
        )
        .await
        {
            error!("Cycle failed: {:#}", e);
        }
        if once {
            break;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    sources: &[Box<dyn MarketDataSource>],
    store: &mut SnapshotStore,
    analyst: &MarketAnalyst,
    news_agent: &ClimateNewsAgent,
    detector: &OpportunityDetector,
    weather: &StaticWeatherTable,
    transport: &TransportCostModel,
    dashboard: &CsvDashboard,
    cycle_logger: &CycleLogger,
) -> Result<()> {
    let started = Instant::now();
    let as_of = Utc::now();
    info!("=== Starting detection cycle at {} ===", as_of);

    // 1. Collect fresh market data; a failing source never kills the cycle.
    let mut collected = Vec::new();
    for source in sources {
        match source.fetch_latest().await {
            Ok(records) => {
                info!("{}: {} record(s)", source.name(), records.len());
                collected.extend(records);
            }
            Err(e) => error!("{} failed: {:#}", source.name(), e),
        }
    }
    let fetched = collected.len();
    let stored = store.append_all(collected.clone());
    collected.retain(|r| r.is_usable());
    if !collected.is_empty() {
        dashboard.write_raw_records(&collected).await?;
    }

    // 2. AI market analysis
    let analysis = match analyst.analyze(store.records()).await {
        Ok(text) => {
            dashboard.write_analysis(as_of, &text).await?;
            Some(text)
        }
        Err(e) => {
            error!("Market analysis failed: {:#}", e);
            None
        }
    };

    // 3. Climate events
    let climate_events = match news_agent.fetch_events().await {
        Ok(events) => events,
        Err(e) => {
            error!("Climate news failed: {:#}", e);
            Vec::new()
        }
    };
    for event in &climate_events {
        info!(
            "Climate event [{}/10] {} ({})",
            event.relevance, event.headline, event.region
        );
    }

    // 4. Detect arbitrage opportunities over the latest snapshot
    let latest = store.latest_per_location();
    let opportunities = detector.detect(&latest, weather, transport, as_of);
    dashboard.write_opportunities(&opportunities).await?;

    // 5. Update dashboard metrics
    let metrics = compute_metrics(store.records(), opportunities.len(), as_of);
    dashboard
        .write_metrics(&metrics, opportunities.first())
        .await?;

    // 6. Summary report
    report(&opportunities, metrics.active_markets, analysis.as_deref());

    cycle_logger
        .log_cycle(CycleLog {
            timestamp: as_of,
            records_collected: fetched,
            markets: metrics.active_markets,
            opportunities_found: opportunities.len(),
            climate_events: climate_events.len(),
            best_net_profit: opportunities.first().map(|o| o.net_profit),
            duration_ms: started.elapsed().as_millis() as u64,
            success: true,
            notes: if stored < fetched {
                Some(format!("{} record(s) skipped", fetched - stored))
            } else {
                None
            },
        })
        .await?;

    info!(
        "Cycle finished in {:.1}s: {} opportunity(ies) across {} market(s)",
        started.elapsed().as_secs_f64(),
        opportunities.len(),
        metrics.active_markets
    );
    Ok(())
}

fn report(opportunities: &[Opportunity], markets: usize, analysis: Option<&str>) {
    info!("Markets monitored: {}", markets);
    info!("Opportunities found: {}", opportunities.len());

    if let Some(best) = opportunities.first() {
        info!("Best opportunity:");
        info!("  Buy:  {} @ ${:.2}", best.buy_location, best.buy_price);
        info!("  Sell: {} @ ${:.2}", best.sell_location, best.sell_price);
        info!("  Net profit: ${:.2} per unit", best.net_profit);
        info!("  Risk score: {:.0}%", best.risk_score * 100.0);
    }

    if let Some(text) = analysis {
        let excerpt: String = text.chars().take(200).collect();
        if text.chars().count() > 200 {
            info!("AI insights: {}...", excerpt);
        } else {
            info!("AI insights: {}", excerpt);
        }
    }
}
