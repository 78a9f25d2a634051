pub mod dashboard;
pub mod logger;

pub use dashboard::{compute_metrics, CsvDashboard, DashboardMetrics, DashboardSink};
pub use logger::{CycleLog, CycleLogger};
