//! Configuration for the colony world model.
//!
//! Strongly-typed configuration mapped onto a `config.toml` file. Every field has
//! a default, so a partial file (or none at all) is valid.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [map]
//! width = 300
//! height = 150
//! max_depth = 4
//! mine_count = 30
//! hostility = "medium"
//! seed = 42
//!
//! [routing]
//! base_cost = 1.0
//! road_repair_threshold = 35
//!
//! [mining]
//! storage_capacity = 500
//! base_production_rate = 10
//!
//! [connectivity]
//! roads_conduct = true
//! vertical = "shaft_to_shaft"
//! ```

use crate::connectivity::ConnectionPolicy;
use crate::error::ConfigError;
use crate::types::{Hostility, ProductionRate, StorableResources, OreType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Map dimensions and generation parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub width: i32,
    pub height: i32,
    pub max_depth: i32,
    pub mine_count: usize,
    pub hostility: Hostility,
    pub seed: Option<u64>,
    /// Intensity span of one terrain category in the height source.
    pub terrain_bucket: u8,
    pub view_edge_length: i32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 150,
            max_depth: 4,
            mine_count: 30,
            hostility: Hostility::Low,
            seed: None,
            terrain_bucket: 50,
            view_edge_length: 20,
        }
    }
}

/// Edge costs fed to the path search.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RouteConfig {
    pub base_cost: f32,
    /// Roads with integrity below this count as damaged.
    pub road_repair_threshold: u32,
    pub damaged_road_cost: f32,
    pub road_cost: f32,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            base_cost: 1.0,
            road_repair_threshold: 35,
            damaged_road_cost: 0.75,
            road_cost: 0.5,
        }
    }
}

/// Mine facility and deposit tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MiningConfig {
    /// Total facility storage, split evenly across the ore types.
    pub storage_capacity: u32,
    /// Per-ore extraction cap per turn.
    pub base_production_rate: u32,
    /// Turns needed to dig one level deeper.
    pub extension_time: u32,
    /// Turns needed to build a facility.
    pub build_time: u32,
    pub reserves_low: u32,
    pub reserves_medium: u32,
    pub reserves_high: u32,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            storage_capacity: 500,
            base_production_rate: 10,
            extension_time: 10,
            build_time: 2,
            reserves_low: 600,
            reserves_medium: 800,
            reserves_high: 1000,
        }
    }
}

impl MiningConfig {
    /// Per-ore storage limit of one facility.
    pub fn storage_limit(&self) -> StorableResources {
        StorableResources::uniform(self.storage_capacity / OreType::COUNT as u32)
    }

    /// Ore of each type exposed by digging one level into a deposit.
    pub fn reserves_per_level(&self, rate: ProductionRate) -> u32 {
        match rate {
            ProductionRate::Low => self.reserves_low,
            ProductionRate::Medium => self.reserves_medium,
            ProductionRate::High => self.reserves_high,
        }
    }
}

/// Top-level configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub map: MapConfig,
    pub routing: RouteConfig,
    pub mining: MiningConfig,
    pub connectivity: ConnectionPolicy,
}

impl Config {
    /// Reads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let map = &self.map;
        if map.width <= 0 || map.height <= 0 {
            return Err(ConfigError::Validation(format!(
                "map size must be positive, got {}x{}",
                map.width, map.height
            )));
        }
        if map.max_depth < 0 {
            return Err(ConfigError::Validation(format!(
                "max_depth must not be negative, got {}",
                map.max_depth
            )));
        }
        if map.terrain_bucket == 0 {
            return Err(ConfigError::Validation("terrain_bucket must be non-zero".into()));
        }
        if !(self.routing.base_cost > 0.0) {
            return Err(ConfigError::Validation(format!(
                "routing.base_cost must be positive, got {}",
                self.routing.base_cost
            )));
        }
        if self.mining.extension_time == 0 {
            return Err(ConfigError::Validation("mining.extension_time must be non-zero".into()));
        }
        Ok(())
    }
}
