//! Mine facility: turns deposit reserves into stored ore, one turn at a time.

use crate::config::MiningConfig;
use crate::error::{Result, WorldError};
use crate::mine::{DepositId, Mine};
use crate::structure::StructureState;
use crate::types::{IdleReason, OreType, StorableResources};
use serde::{Deserialize, Serialize};

/// Lifecycle of a mine facility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacilityState {
    UnderConstruction { turns_remaining: u32 },
    Operational,
    Idle(IdleReason),
    /// Digging the deposit one level deeper; no production meanwhile.
    Extending { turns_remaining: u32 },
}

/// Notable outcomes of a facility turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacilityEvent {
    /// Construction finished; the deposit was opened at its first level.
    Activated,
    ExtensionComplete { depth: i32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MineFacility {
    deposit: DepositId,
    state: FacilityState,
    storage: StorableResources,
    max_depth: i32,
    /// Held idle from outside; freezes production and any dig in progress.
    forced_idle: bool,
    config: MiningConfig,
}

impl MineFacility {
    /// New facility over `deposit`, starting construction.
    pub fn new(deposit: DepositId, max_depth: i32, config: &MiningConfig) -> Self {
        Self {
            deposit,
            state: FacilityState::UnderConstruction {
                turns_remaining: config.build_time,
            },
            storage: StorableResources::default(),
            max_depth,
            forced_idle: false,
            config: config.clone(),
        }
    }

    /// Restores a facility from saved state.
    ///
    /// A saved `Idle(PlayerSet)` state comes back as a forced idle
    /// operational facility.
    pub fn restore(
        deposit: DepositId,
        state: FacilityState,
        storage: StorableResources,
        max_depth: i32,
        config: &MiningConfig,
    ) -> Self {
        let forced_idle = state == FacilityState::Idle(IdleReason::PlayerSet);
        Self {
            deposit,
            state: if forced_idle { FacilityState::Operational } else { state },
            storage,
            max_depth,
            forced_idle,
            config: config.clone(),
        }
    }

    pub fn with_forced_idle(mut self, forced_idle: bool) -> Self {
        self.forced_idle = forced_idle;
        self
    }

    pub fn deposit(&self) -> DepositId {
        self.deposit
    }

    pub fn state(&self) -> FacilityState {
        self.state
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    pub fn storage(&self) -> StorableResources {
        self.storage
    }

    pub fn storage_limit(&self) -> StorableResources {
        self.config.storage_limit()
    }

    /// Empties internal storage, handing its contents to the caller.
    pub fn take_production(&mut self) -> StorableResources {
        std::mem::take(&mut self.storage)
    }

    pub fn is_idle(&self) -> bool {
        self.forced_idle || matches!(self.state, FacilityState::Idle(_))
    }

    pub fn forced_idle(&self) -> bool {
        self.forced_idle
    }

    /// Forces the facility idle, or releases it.
    ///
    /// An extension in progress pauses until release. Ignored while under
    /// construction; returns whether the request changed anything.
    pub fn force_idle(&mut self, idle: bool) -> bool {
        if matches!(self.state, FacilityState::UnderConstruction { .. }) || self.forced_idle == idle {
            return false;
        }
        self.forced_idle = idle;
        true
    }

    pub fn extending(&self) -> bool {
        matches!(self.state, FacilityState::Extending { .. })
    }

    pub fn dig_time_remaining(&self) -> u32 {
        match self.state {
            FacilityState::Extending { turns_remaining } => turns_remaining,
            _ => 0,
        }
    }

    /// The generic structure state this facility reports.
    pub fn structure_state(&self) -> StructureState {
        if self.forced_idle {
            return StructureState::Idle(IdleReason::PlayerSet);
        }
        match self.state {
            FacilityState::UnderConstruction { .. } => StructureState::UnderConstruction,
            FacilityState::Operational | FacilityState::Extending { .. } => StructureState::Operational,
            FacilityState::Idle(reason) => StructureState::Idle(reason),
        }
    }

    /// True once built, with no dig running and a level left to open.
    pub fn can_extend(&self, mine: &Mine) -> bool {
        matches!(self.state, FacilityState::Operational | FacilityState::Idle(_))
            && mine.depth() < self.max_depth
    }

    /// Starts digging one level deeper; no-op when `can_extend` is false.
    pub fn extend(&mut self, mine: &Mine) {
        if self.can_extend(mine) {
            self.state = FacilityState::Extending {
                turns_remaining: self.config.extension_time,
            };
        }
    }

    /// Like `extend`, but reports why the extension cannot start.
    pub fn try_extend(&mut self, mine: &Mine) -> Result<()> {
        if mine.depth() >= self.max_depth {
            return Err(WorldError::logic(format!(
                "mine is already at maximum depth {}",
                self.max_depth
            )));
        }
        if !self.can_extend(mine) {
            return Err(WorldError::logic(format!(
                "mine facility cannot extend while {:?}",
                self.state
            )));
        }
        self.extend(mine);
        Ok(())
    }

    /// Advances construction, then runs production once built.
    pub fn update(&mut self, mine: &mut Mine) -> Option<FacilityEvent> {
        if let FacilityState::UnderConstruction { turns_remaining } = self.state {
            let turns_remaining = turns_remaining.saturating_sub(1);
            if turns_remaining > 0 {
                self.state = FacilityState::UnderConstruction { turns_remaining };
                return None;
            }
            self.activate(mine);
            return Some(FacilityEvent::Activated);
        }
        self.think(mine)
    }

    fn activate(&mut self, mine: &mut Mine) {
        mine.increase_depth(self.config.reserves_per_level(mine.production_rate()));
        mine.set_active(true);
        self.state = FacilityState::Operational;
    }

    /// One production turn for a built facility.
    pub fn think(&mut self, mine: &mut Mine) -> Option<FacilityEvent> {
        if self.forced_idle {
            return None;
        }
        match self.state {
            FacilityState::UnderConstruction { .. } => return None,
            FacilityState::Extending { turns_remaining } => {
                let turns_remaining = turns_remaining.saturating_sub(1);
                if turns_remaining > 0 {
                    self.state = FacilityState::Extending { turns_remaining };
                    return None;
                }
                mine.increase_depth(self.config.reserves_per_level(mine.production_rate()));
                self.state = FacilityState::Operational;
                return Some(FacilityEvent::ExtensionComplete { depth: mine.depth() });
            }
            FacilityState::Operational | FacilityState::Idle(_) => {}
        }

        let limit = self.storage_limit();

        if self.is_idle() && mine.active() && !self.storage.fills(&limit) {
            self.state = FacilityState::Operational;
        }

        if mine.exhausted() {
            self.state = FacilityState::Idle(IdleReason::MineExhausted);
            return None;
        }

        if !mine.active() {
            if !self.is_idle() {
                self.state = FacilityState::Idle(IdleReason::MineInactive);
            }
            return None;
        }

        if self.storage.fills(&limit) {
            self.state = FacilityState::Idle(IdleReason::InternalStorageFull);
            return None;
        }

        let max_transfer = (limit - self.storage).cap(self.config.base_production_rate);
        let mut ore = StorableResources::default();
        for kind in OreType::ALL {
            if mine.ore_enabled(kind) {
                ore.set(kind, mine.pull(kind, max_transfer.get(kind)));
            }
        }
        self.storage += ore;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductionRate;

    fn config(capacity_per_ore: u32, rate: u32) -> MiningConfig {
        MiningConfig {
            storage_capacity: capacity_per_ore * OreType::COUNT as u32,
            base_production_rate: rate,
            extension_time: 3,
            build_time: 2,
            ..MiningConfig::default()
        }
    }

    fn stocked_mine(amount: u32) -> Mine {
        Mine::with_state(
            1,
            ProductionRate::Medium,
            StorableResources::uniform(amount),
            true,
            [true; OreType::COUNT],
        )
    }

    fn running(config: &MiningConfig) -> MineFacility {
        MineFacility::restore(
            DepositId(0),
            FacilityState::Operational,
            StorableResources::default(),
            4,
            config,
        )
    }

    #[test]
    fn one_turn_moves_capped_amount() {
        let config = config(125, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);

        facility.think(&mut mine);
        assert_eq!(facility.storage(), StorableResources::uniform(10));
        assert_eq!(mine.reserves(), StorableResources::uniform(90));
    }

    #[test]
    fn transfer_is_capped_by_remaining_capacity() {
        let config = config(4, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);

        facility.think(&mut mine);
        assert_eq!(facility.storage(), StorableResources::uniform(4));
        assert_eq!(mine.reserves(), StorableResources::uniform(96));

        facility.think(&mut mine);
        assert_eq!(facility.state(), FacilityState::Idle(IdleReason::InternalStorageFull));
        assert_eq!(facility.storage(), StorableResources::uniform(4));
        assert_eq!(mine.reserves(), StorableResources::uniform(96));
        assert_eq!(facility.structure_state(), StructureState::Idle(IdleReason::InternalStorageFull));
    }

    #[test]
    fn emptied_storage_resumes_production() {
        let config = config(4, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);
        facility.think(&mut mine);
        facility.think(&mut mine);
        assert!(facility.is_idle());

        assert_eq!(facility.take_production(), StorableResources::uniform(4));
        facility.think(&mut mine);
        assert_eq!(facility.state(), FacilityState::Operational);
        assert_eq!(facility.storage(), StorableResources::uniform(4));
    }

    #[test]
    fn disabled_ores_are_left_in_the_ground() {
        let config = config(125, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);
        mine.enable_ore(OreType::RareMetals, false);

        facility.think(&mut mine);
        assert_eq!(facility.storage().resources, [10, 10, 0, 10]);
        assert_eq!(mine.remaining(OreType::RareMetals), 100);
    }

    #[test]
    fn exhausted_and_inactive_mines_idle_the_facility() {
        let config = config(125, 10);
        let mut facility = running(&config);
        let mut empty = stocked_mine(0);
        facility.think(&mut empty);
        assert_eq!(facility.state(), FacilityState::Idle(IdleReason::MineExhausted));

        let mut facility = running(&config);
        let mut inactive = stocked_mine(50);
        inactive.set_active(false);
        facility.think(&mut inactive);
        assert_eq!(facility.state(), FacilityState::Idle(IdleReason::MineInactive));
        assert!(facility.storage().is_empty());

        inactive.set_active(true);
        facility.think(&mut inactive);
        assert_eq!(facility.state(), FacilityState::Operational);
        assert_eq!(facility.storage(), StorableResources::uniform(10));
    }

    #[test]
    fn inactive_keeps_an_earlier_idle_reason() {
        let config = config(125, 10);
        let mut facility = MineFacility::restore(
            DepositId(0),
            FacilityState::Idle(IdleReason::InternalStorageFull),
            StorableResources::uniform(125),
            4,
            &config,
        );
        let mut mine = stocked_mine(50);
        mine.set_active(false);
        facility.think(&mut mine);
        assert_eq!(facility.state(), FacilityState::Idle(IdleReason::InternalStorageFull));
    }

    #[test]
    fn forced_idle_skips_the_turn() {
        let config = config(125, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);
        assert!(facility.force_idle(true));
        facility.think(&mut mine);
        assert!(facility.storage().is_empty());
        assert!(facility.is_idle());
        assert_eq!(facility.structure_state(), StructureState::Idle(IdleReason::PlayerSet));
        assert!(!facility.force_idle(true));

        assert!(facility.force_idle(false));
        facility.think(&mut mine);
        assert_eq!(facility.storage(), StorableResources::uniform(10));
    }

    #[test]
    fn forced_idle_pauses_an_extension() {
        let config = config(125, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);
        facility.extend(&mine);
        facility.think(&mut mine);
        assert_eq!(facility.dig_time_remaining(), 2);

        assert!(facility.force_idle(true));
        for _ in 0..5 {
            assert_eq!(facility.think(&mut mine), None);
        }
        assert_eq!(mine.depth(), 1);
        assert_eq!(facility.dig_time_remaining(), 2);
        assert!(facility.extending());

        assert!(facility.force_idle(false));
        assert_eq!(facility.think(&mut mine), None);
        assert_eq!(
            facility.think(&mut mine),
            Some(FacilityEvent::ExtensionComplete { depth: 2 })
        );
    }

    #[test]
    fn forced_idle_facility_can_start_an_extension() {
        let config = config(125, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);
        facility.force_idle(true);

        assert!(facility.can_extend(&mine));
        facility.extend(&mine);
        facility.think(&mut mine);
        assert_eq!(facility.dig_time_remaining(), 3);
    }

    #[test]
    fn construction_ignores_forced_idle() {
        let config = config(125, 10);
        let mut facility = MineFacility::new(DepositId(0), 4, &config);
        assert!(!facility.force_idle(true));
        assert!(!facility.forced_idle());
    }

    #[test]
    fn saved_player_idle_restores_as_forced() {
        let config = config(125, 10);
        let facility = MineFacility::restore(
            DepositId(0),
            FacilityState::Idle(IdleReason::PlayerSet),
            StorableResources::default(),
            4,
            &config,
        );
        assert!(facility.forced_idle());
        assert_eq!(facility.state(), FacilityState::Operational);
    }

    #[test]
    fn construction_opens_the_deposit() {
        let config = config(125, 10);
        let mut facility = MineFacility::new(DepositId(0), 4, &config);
        let mut mine = Mine::new(ProductionRate::Low);

        assert_eq!(facility.update(&mut mine), None);
        assert_eq!(facility.structure_state(), StructureState::UnderConstruction);
        assert_eq!(facility.update(&mut mine), Some(FacilityEvent::Activated));
        assert_eq!(mine.depth(), 1);
        assert!(mine.active());
        assert_eq!(mine.remaining(OreType::CommonMetals), config.reserves_low);

        facility.update(&mut mine);
        assert_eq!(facility.storage(), StorableResources::uniform(10));
    }

    #[test]
    fn extension_digs_one_level_without_producing() {
        let config = config(125, 10);
        let mut facility = running(&config);
        let mut mine = stocked_mine(100);

        assert!(facility.can_extend(&mine));
        facility.extend(&mine);
        assert!(facility.extending());
        assert!(!facility.can_extend(&mine));
        assert_eq!(facility.dig_time_remaining(), 3);

        assert_eq!(facility.think(&mut mine), None);
        assert_eq!(facility.think(&mut mine), None);
        assert_eq!(
            facility.think(&mut mine),
            Some(FacilityEvent::ExtensionComplete { depth: 2 })
        );
        assert!(facility.storage().is_empty());
        assert_eq!(mine.remaining(OreType::CommonMetals), 100 + config.reserves_medium);
        assert_eq!(facility.state(), FacilityState::Operational);
    }

    #[test]
    fn extension_stops_at_max_depth() {
        let config = config(125, 10);
        let mut facility = MineFacility::restore(
            DepositId(0),
            FacilityState::Operational,
            StorableResources::default(),
            1,
            &config,
        );
        let mine = stocked_mine(100);
        assert!(!facility.can_extend(&mine));
        facility.extend(&mine);
        assert!(!facility.extending());
        assert!(matches!(facility.try_extend(&mine), Err(WorldError::Logic(_))));
    }
}
