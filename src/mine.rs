//! Mine deposits: finite, depth-bound ore reserves attached to one surface tile.

use crate::types::{OreType, ProductionRate, StorableResources};
use serde::{Deserialize, Serialize};

/// Handle of a deposit held in the tile map's deposit arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepositId(pub u32);

/// A resource reserve under one surface tile.
///
/// Reserves are only exposed as the deposit is dug deeper: each level adds a
/// yield-dependent amount of every ore. A deposit with nothing left is
/// exhausted, whatever its depth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mine {
    depth: i32,
    production_rate: ProductionRate,
    reserves: StorableResources,
    active: bool,
    mining_enabled: [bool; OreType::COUNT],
}

impl Mine {
    /// Fresh, undug deposit with every ore enabled.
    pub fn new(production_rate: ProductionRate) -> Self {
        Self {
            depth: 0,
            production_rate,
            reserves: StorableResources::default(),
            active: false,
            mining_enabled: [true; OreType::COUNT],
        }
    }

    /// Restores a deposit from saved state.
    pub fn with_state(
        depth: i32,
        production_rate: ProductionRate,
        reserves: StorableResources,
        active: bool,
        mining_enabled: [bool; OreType::COUNT],
    ) -> Self {
        Self {
            depth,
            production_rate,
            reserves,
            active,
            mining_enabled,
        }
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn production_rate(&self) -> ProductionRate {
        self.production_rate
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn mining_enabled(&self) -> [bool; OreType::COUNT] {
        self.mining_enabled
    }

    pub fn ore_enabled(&self, ore: OreType) -> bool {
        self.mining_enabled[ore.index()]
    }

    pub fn enable_ore(&mut self, ore: OreType, enabled: bool) {
        self.mining_enabled[ore.index()] = enabled;
    }

    pub fn reserves(&self) -> StorableResources {
        self.reserves
    }

    pub fn remaining(&self, ore: OreType) -> u32 {
        self.reserves.get(ore)
    }

    pub fn exhausted(&self) -> bool {
        self.reserves.is_empty()
    }

    /// Digs one level deeper, exposing `reserves_per_level` of every ore.
    pub fn increase_depth(&mut self, reserves_per_level: u32) {
        self.depth += 1;
        self.reserves += StorableResources::uniform(reserves_per_level);
    }

    /// Takes up to `amount` of `ore`, returning what was actually taken.
    pub fn pull(&mut self, ore: OreType, amount: u32) -> u32 {
        let taken = self.reserves.get(ore).min(amount);
        self.reserves.set(ore, self.reserves.get(ore) - taken);
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mine_is_undug_and_inactive() {
        let mine = Mine::new(ProductionRate::Medium);
        assert_eq!(mine.depth(), 0);
        assert!(!mine.active());
        assert!(mine.exhausted());
        assert!(OreType::ALL.iter().all(|&ore| mine.ore_enabled(ore)));
    }

    #[test]
    fn digging_exposes_reserves() {
        let mut mine = Mine::new(ProductionRate::Low);
        mine.increase_depth(600);
        mine.increase_depth(600);
        assert_eq!(mine.depth(), 2);
        assert_eq!(mine.remaining(OreType::RareMetals), 1200);
        assert!(!mine.exhausted());
    }

    #[test]
    fn pull_never_exceeds_remaining() {
        let mut mine = Mine::with_state(
            1,
            ProductionRate::High,
            StorableResources::new([5, 100, 0, 100]),
            true,
            [true; OreType::COUNT],
        );
        assert_eq!(mine.pull(OreType::CommonMetals, 10), 5);
        assert_eq!(mine.pull(OreType::CommonMinerals, 10), 10);
        assert_eq!(mine.pull(OreType::RareMetals, 10), 0);
        assert_eq!(mine.reserves().resources, [0, 90, 0, 100]);
    }

    #[test]
    fn exhausted_only_when_every_ore_is_gone() {
        let mut mine = Mine::with_state(
            1,
            ProductionRate::Low,
            StorableResources::new([0, 0, 0, 1]),
            true,
            [true; OreType::COUNT],
        );
        assert!(!mine.exhausted());
        mine.pull(OreType::RareMinerals, 1);
        assert!(mine.exhausted());
    }
}
