pub mod snapshot;
pub mod sources;

pub use snapshot::{PriceRecord, SnapshotStore, SourceType};
pub use sources::{MarketDataSource, MarketFeedSource, NoaaWaterSource};
