use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::Result;

/// One line per completed detection cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleLog {
    pub timestamp: DateTime<Utc>,
    pub records_collected: usize,
    pub markets: usize,
    pub opportunities_found: usize,
    pub climate_events: usize,
    pub best_net_profit: Option<f64>,
    pub duration_ms: u64,
    pub success: bool,
    pub notes: Option<String>,
}

/// JSON-lines cycle history under the log directory.
pub struct CycleLogger {
    log_path: PathBuf,
}

impl CycleLogger {
    pub fn new(log_dir: Option<&str>) -> Result<Self> {
        let log_dir = log_dir.unwrap_or("./logs");
        std::fs::create_dir_all(log_dir)?;

        Ok(Self {
            log_path: PathBuf::from(log_dir).join("cycles.jsonl"),
        })
    }

    pub async fn log_cycle(&self, entry: CycleLog) -> Result<()> {
        info!(
            "Cycle complete: {} record(s), {} opportunity(ies), {} ms",
            entry.records_collected, entry.opportunities_found, entry.duration_ms
        );

        let json = serde_json::to_string(&entry)
            .map_err(|e| crate::error::WaterSeerError::report_error(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    pub async fn history(&self) -> Result<Vec<CycleLog>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.log_path)?;
        let mut logs = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(log) => logs.push(log),
                Err(e) => warn!("Skipping corrupt cycle log line: {}", e),
            }
        }

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(opportunities: usize) -> CycleLog {
        CycleLog {
            timestamp: Utc::now(),
            records_collected: 5,
            markets: 5,
            opportunities_found: opportunities,
            climate_events: 0,
            best_net_profit: Some(80.0),
            duration_ms: 12,
            success: true,
            notes: None,
        }
    }

    #[tokio::test]
    async fn history_round_trips_logged_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CycleLogger::new(dir.path().to_str()).unwrap();

        logger.log_cycle(entry(1)).await.unwrap();
        logger.log_cycle(entry(3)).await.unwrap();

        let history = logger.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].opportunities_found, 3);
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CycleLogger::new(dir.path().to_str()).unwrap();
        logger.log_cycle(entry(1)).await.unwrap();

        let path = dir.path().join("cycles.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("not json\n");
        std::fs::write(&path, content).unwrap();

        let history = logger.history().await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn empty_history_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CycleLogger::new(dir.path().to_str()).unwrap();
        assert!(logger.history().await.unwrap().is_empty());
    }
}
