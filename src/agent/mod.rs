pub mod analyst;
pub mod climate_news;

pub use analyst::MarketAnalyst;
pub use climate_news::{ClimateEvent, ClimateNewsAgent};
