//! Structure state the world model reads from its occupants.
//!
//! The core only cares about a few facts per structure: its class, its
//! lifecycle state and, for connectors, orientation and integrity. It writes
//! back the `connected` flag after each connectivity walk.

use crate::error::{Result, WorldError};
use crate::map::TileMap;
use crate::types::{IdleReason, MapCoordinate, TerrainType};
use serde::{Deserialize, Serialize};

/// Handle of a structure in the `StructureRegistry`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(pub u32);

/// Handle of a mobile unit; robots live outside the world model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RobotId(pub u32);

/// What stands on a tile. A tile holds at most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupant {
    Structure(StructureId),
    Robot(RobotId),
}

/// NOTE - Structure kinds the world model distinguishes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureClass {
    Command,      // NOTE - Root of the tube network
    Tube,         // NOTE - Connector
    Road,         // NOTE - Cheap surface route, optionally a connector
    Factory,
    Warehouse,
    MineFacility,
    Other,
}

/// NOTE - Tube orientation; decides which neighbours a connector links to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorDir {
    Intersection, // NOTE - All four horizontal neighbours
    EastWest,
    NorthSouth,
    Vertical,     // NOTE - Air shaft: all horizontal neighbours plus the levels above and below
}

/// NOTE - Lifecycle state shared by all structures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureState {
    UnderConstruction,
    Operational,
    Idle(IdleReason),
    Destroyed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub class: StructureClass,
    pub state: StructureState,
    pub connector: Option<ConnectorDir>,
    /// 0–100; roads below the repair threshold cost more to cross.
    pub integrity: u32,
    /// Set by the connectivity walk; recomputed after every load.
    #[serde(skip)]
    pub connected: bool,
    pub position: MapCoordinate,
}

impl Structure {
    pub fn new(class: StructureClass, position: MapCoordinate) -> Self {
        Self {
            class,
            state: StructureState::UnderConstruction,
            connector: None,
            integrity: 100,
            connected: false,
            position,
        }
    }

    pub fn tube(direction: ConnectorDir, position: MapCoordinate) -> Self {
        Self {
            connector: Some(direction),
            ..Self::new(StructureClass::Tube, position)
        }
    }

    pub fn with_state(mut self, state: StructureState) -> Self {
        self.state = state;
        self
    }

    pub fn with_integrity(mut self, integrity: u32) -> Self {
        self.integrity = integrity;
        self
    }

    pub fn operational(&self) -> bool {
        self.state == StructureState::Operational
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, StructureState::Idle(_))
    }

    pub fn is_road(&self) -> bool {
        self.class == StructureClass::Road
    }
}

/// Slot arena of every structure on the map.
#[derive(Clone, Debug, Default)]
pub struct StructureRegistry {
    slots: Vec<Option<Structure>>,
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `structure` on its tile and registers it.
    ///
    /// The tile must exist, be excavated, be free of occupants and not be
    /// impassable.
    pub fn add(&mut self, map: &mut TileMap, structure: Structure) -> Result<StructureId> {
        let id = StructureId(self.slots.len() as u32);
        Self::claim_tile(map, &structure, id)?;
        self.slots.push(Some(structure));
        Ok(id)
    }

    /// Re-registers a saved structure under its saved handle.
    pub fn restore(&mut self, map: &mut TileMap, id: StructureId, structure: Structure) -> Result<()> {
        let index = id.0 as usize;
        if self.slots.get(index).is_some_and(Option::is_some) {
            return Err(WorldError::logic(format!("structure {} already registered", id.0)));
        }
        Self::claim_tile(map, &structure, id)?;
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(structure);
        Ok(())
    }

    /// Unregisters a structure and frees its tile.
    pub fn remove(&mut self, map: &mut TileMap, id: StructureId) -> Result<Structure> {
        let structure = self
            .slots
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or_else(|| WorldError::logic(format!("no structure {} to remove", id.0)))?;
        let tile = map.tile_mut(structure.position)?;
        if tile.occupant() == Some(Occupant::Structure(id)) {
            tile.set_occupant(None);
        }
        Ok(structure)
    }

    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// The structure standing on `position`, if any.
    pub fn at(&self, map: &TileMap, position: MapCoordinate) -> Option<&Structure> {
        match map.tile(position).ok()?.occupant()? {
            Occupant::Structure(id) => self.get(id),
            Occupant::Robot(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructureId, &Structure)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|s| (StructureId(index as u32), s)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StructureId, &mut Structure)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|s| (StructureId(index as u32), s)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn claim_tile(map: &mut TileMap, structure: &Structure, id: StructureId) -> Result<()> {
        let tile = map.tile_mut(structure.position)?;
        if !tile.is_empty() {
            return Err(WorldError::logic("tile is already occupied"));
        }
        if tile.terrain() == TerrainType::Impassable {
            return Err(WorldError::logic("cannot build on impassable terrain"));
        }
        if !tile.excavated() {
            return Err(WorldError::logic("cannot build on an unexcavated tile"));
        }
        if tile.has_mine() && structure.class != StructureClass::MineFacility {
            return Err(WorldError::logic("only a mine facility can stand on a deposit"));
        }
        tile.set_occupant(Some(Occupant::Structure(id)));
        Ok(())
    }
}
