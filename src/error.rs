use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum WaterSeerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Analyst error: {0}")]
    Analyst(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl WaterSeerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn market_data_error(msg: impl Into<String>) -> Self {
        Self::MarketData(msg.into())
    }

    pub fn store_error(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn analyst_error(msg: impl Into<String>) -> Self {
        Self::Analyst(msg.into())
    }

    pub fn report_error(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }

    pub fn validation_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WaterSeerError>;
