use crate::events::schedule::PhaseScheduleEntry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Matching discipline a venue's engines apply.
///
/// Only price-time matching is implemented; the option exists so venue configurations
/// naming an engine type remain loadable.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum EngineType {
    #[default]
    Matching,
}

/// Typed venue configuration consumed by the trading system.
///
/// Normally deserialized from a JSON document; every option has a default so partial
/// configurations stay valid.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub venue_id: String,
    pub engine_type: EngineType,
    pub persistence_enabled: bool,
    pub persistence_file_path: String,
    pub trading_phases_schedule: Vec<PhaseScheduleEntry>,
    /// IANA timezone name the venue's schedule is expressed in, eg/ "Europe/London".
    pub timezone_clock: String,
    pub cancel_on_disconnect: bool,
    pub include_own_orders: bool,
    pub tns_enabled: bool,
    pub tns_qty_enabled: bool,
    pub tns_side_enabled: bool,
    pub tns_parties_enabled: bool,
    pub support_tif_ioc: bool,
    pub support_tif_fok: bool,
    pub support_tif_day: bool,
    pub order_on_startup: bool,
    pub random_parties_count: u32,
    pub rest_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            venue_id: String::from("BOURSE"),
            engine_type: EngineType::default(),
            persistence_enabled: false,
            persistence_file_path: String::new(),
            trading_phases_schedule: Vec::new(),
            timezone_clock: String::from("UTC"),
            cancel_on_disconnect: false,
            include_own_orders: true,
            tns_enabled: true,
            tns_qty_enabled: true,
            tns_side_enabled: true,
            tns_parties_enabled: false,
            support_tif_ioc: true,
            support_tif_fok: true,
            support_tif_day: true,
            order_on_startup: false,
            random_parties_count: 0,
            rest_port: 9001,
        }
    }
}

impl Config {
    /// Read a venue configuration from a JSON file.
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read venue configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse venue configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown timezone in venue configuration: {0}")]
    UnknownTimezone(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_protocol::phase::TradingPhase;

    #[test]
    fn test_partial_json_config_fills_defaults() {
        let parsed: Config = serde_json::from_str(
            r#"{
                "venue_id": "LSE",
                "persistence_enabled": true,
                "trading_phases_schedule": [
                    {"phase": "Open", "start_time": "08:00:00", "end_time": "16:30:00"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.venue_id, "LSE");
        assert!(parsed.persistence_enabled);
        assert_eq!(parsed.trading_phases_schedule.len(), 1);
        assert_eq!(parsed.trading_phases_schedule[0].phase, TradingPhase::Open);
        // Untouched options keep their defaults.
        assert!(parsed.include_own_orders);
        assert_eq!(parsed.timezone_clock, "UTC");
    }
}
