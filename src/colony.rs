//! Colony session: owns the world and advances it one turn at a time.

use crate::config::Config;
use crate::connectivity::walk_connectivity;
use crate::error::{Result, WorldError};
use crate::map::TileMap;
use crate::mine::Mine;
use crate::mine_facility::{FacilityEvent, FacilityState, MineFacility};
use crate::pathfinding::{PathContext, Route, find_path};
use crate::persistence::{ColonySnapshot, FacilityRecord, SiteRecord, StructureRecord, TileMapSnapshot};
use crate::structure::{Structure, StructureClass, StructureId, StructureRegistry};
use crate::terrain::HeightSource;
use crate::types::{DEPTH_SURFACE, IdleReason, MapCoordinate, Point, StorableResources, TerrainType};
use rand::Rng;
use std::collections::BTreeMap;

/// Something a turn produced that the player should hear about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColonyEvent {
    Facility { structure: StructureId, event: FacilityEvent },
    MineExhausted { structure: StructureId },
}

pub struct Colony {
    config: Config,
    map: TileMap,
    structures: StructureRegistry,
    facilities: BTreeMap<StructureId, MineFacility>,
    stockpile: StorableResources,
    turn: u64,
}

impl Colony {
    pub fn new(config: Config, map: TileMap) -> Self {
        Self {
            config,
            map,
            structures: StructureRegistry::new(),
            facilities: BTreeMap::new(),
            stockpile: StorableResources::default(),
            turn: 0,
        }
    }

    /// Fresh session on a generated map.
    pub fn generate<R: Rng + ?Sized>(config: Config, heights: &dyn HeightSource, rng: &mut R) -> Result<Self> {
        let map = TileMap::generate(&config.map, heights, rng)?;
        Ok(Self::new(config, map))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut TileMap {
        &mut self.map
    }

    pub fn structures(&self) -> &StructureRegistry {
        &self.structures
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id)
    }

    pub fn facility(&self, id: StructureId) -> Option<&MineFacility> {
        self.facilities.get(&id)
    }

    pub fn facilities(&self) -> impl Iterator<Item = (StructureId, &MineFacility)> {
        self.facilities.iter().map(|(&id, facility)| (id, facility))
    }

    /// Ore delivered by connected facilities so far.
    pub fn stockpile(&self) -> StorableResources {
        self.stockpile
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Places a structure and bulldozes its tile.
    pub fn place_structure(&mut self, structure: Structure) -> Result<StructureId> {
        let position = structure.position;
        let id = self.structures.add(&mut self.map, structure)?;
        self.map.tile_mut(position)?.set_terrain(TerrainType::Dozed);
        self.check_connectedness();
        tracing::debug!(id = id.0, ?position, "placed structure");
        Ok(id)
    }

    /// Starts building a mine facility over the deposit at `location`.
    pub fn build_mine_facility(&mut self, location: Point) -> Result<StructureId> {
        let deposit = self
            .map
            .deposit_at(location)
            .ok_or_else(|| WorldError::logic(format!("no deposit at ({}, {})", location.x, location.y)))?;

        let structure = Structure::new(StructureClass::MineFacility, MapCoordinate::at(location, DEPTH_SURFACE));
        let id = self.place_structure(structure)?;
        let facility = MineFacility::new(deposit, self.map.max_depth(), &self.config.mining);
        self.facilities.insert(id, facility);
        tracing::info!(id = id.0, x = location.x, y = location.y, "mine facility under construction");
        Ok(id)
    }

    /// Removes a structure; a mine facility's deposit stays in the ground.
    pub fn remove_structure(&mut self, id: StructureId) -> Result<Structure> {
        let structure = self.structures.remove(&mut self.map, id)?;
        self.facilities.remove(&id);
        self.check_connectedness();
        Ok(structure)
    }

    /// Orders the facility `id` to dig one level deeper.
    pub fn extend_mine(&mut self, id: StructureId) -> Result<()> {
        let facility = self
            .facilities
            .get_mut(&id)
            .ok_or_else(|| WorldError::logic(format!("structure {} is not a mine facility", id.0)))?;
        let mine = self
            .map
            .deposit(facility.deposit())
            .ok_or_else(|| WorldError::logic("mine facility has no deposit"))?;
        facility.try_extend(mine)
    }

    pub fn force_idle(&mut self, id: StructureId, idle: bool) -> Result<bool> {
        let facility = self
            .facilities
            .get_mut(&id)
            .ok_or_else(|| WorldError::logic(format!("structure {} is not a mine facility", id.0)))?;
        let applied = facility.force_idle(idle);
        if let Some(structure) = self.structures.get_mut(id) {
            structure.state = facility.structure_state();
        }
        Ok(applied)
    }

    /// Tears down an exhausted, fully dug mine.
    ///
    /// The deposit, its location entry, the facility and its structure go
    /// together; on error nothing changes.
    pub fn remove_exhausted_mine(&mut self, id: StructureId) -> Result<Mine> {
        let facility = self
            .facilities
            .get(&id)
            .ok_or_else(|| WorldError::logic(format!("structure {} is not a mine facility", id.0)))?;
        let mine = self
            .map
            .deposit(facility.deposit())
            .ok_or_else(|| WorldError::logic("mine facility has no deposit"))?;
        if !mine.exhausted() || mine.depth() < facility.max_depth() {
            return Err(WorldError::logic("mine is not exhausted"));
        }
        let location = self
            .structures
            .get(id)
            .map(|structure| structure.position.xy)
            .ok_or_else(|| WorldError::logic(format!("no structure {}", id.0)))?;

        let mine = self.map.remove_deposit_at(location)?;
        self.structures.remove(&mut self.map, id)?;
        self.facilities.remove(&id);
        self.check_connectedness();
        tracing::info!(id = id.0, x = location.x, y = location.y, "removed exhausted mine");
        Ok(mine)
    }

    /// Recomputes which structures the tube network reaches.
    pub fn check_connectedness(&mut self) {
        self.map.clear_connectivity();

        let roots: Vec<MapCoordinate> = self
            .structures
            .iter()
            .filter(|(_, structure)| structure.class == StructureClass::Command)
            .map(|(_, structure)| structure.position)
            .collect();

        let mut reached = 0;
        for root in roots {
            reached += walk_connectivity(root, &mut self.map, &self.structures, &self.config.connectivity);
        }

        for (_, structure) in self.structures.iter_mut() {
            structure.connected = self.map.tile(structure.position).is_ok_and(|tile| tile.connected());
        }
        tracing::debug!(reached, "connectivity updated");
    }

    /// Least-cost route between two tiles.
    pub fn find_path(&self, start: MapCoordinate, end: MapCoordinate) -> Option<Route> {
        let context = PathContext::new(&self.map, &self.structures, &self.config.routing);
        find_path(&context, start, end)
    }

    /// Advances the world one turn.
    pub fn tick(&mut self) -> Vec<ColonyEvent> {
        self.turn += 1;
        let mut events = Vec::new();

        for (&id, facility) in self.facilities.iter_mut() {
            let Some(mine) = self.map.deposit_mut(facility.deposit()) else {
                tracing::warn!(id = id.0, "mine facility lost its deposit");
                continue;
            };

            let was_exhausted = facility.state() == FacilityState::Idle(IdleReason::MineExhausted);
            if let Some(event) = facility.update(mine) {
                tracing::info!(id = id.0, ?event, depth = mine.depth(), "mine facility event");
                events.push(ColonyEvent::Facility { structure: id, event });
            }
            if !was_exhausted && facility.state() == FacilityState::Idle(IdleReason::MineExhausted) {
                tracing::info!(id = id.0, "mine exhausted");
                events.push(ColonyEvent::MineExhausted { structure: id });
            }

            if let Some(structure) = self.structures.get_mut(id) {
                structure.state = facility.structure_state();
            }
        }

        self.check_connectedness();

        for (&id, facility) in self.facilities.iter_mut() {
            if self.structures.get(id).is_some_and(|structure| structure.connected) {
                self.stockpile += facility.take_production();
            }
        }

        tracing::debug!(turn = self.turn, events = events.len(), "turn complete");
        events
    }

    /// One-line summary for logs.
    pub fn status(&self) -> String {
        let connected = self.structures.iter().filter(|(_, s)| s.connected).count();
        let stock = self.stockpile.resources;
        format!(
            "turn {} | structures {} ({} connected) | mines {} | ore {:?}",
            self.turn,
            self.structures.len(),
            connected,
            self.facilities.len(),
            stock
        )
    }

    pub fn snapshot(&self) -> ColonySnapshot {
        let structures = self
            .structures
            .iter()
            .map(|(id, structure)| StructureRecord {
                id,
                structure: structure.clone(),
            })
            .collect();

        let facilities = self
            .facilities
            .iter()
            .filter_map(|(&id, facility)| {
                let location = self.structures.get(id)?.position.xy;
                Some(FacilityRecord {
                    structure: id,
                    x: location.x,
                    y: location.y,
                    state: facility.state(),
                    storage: facility.storage(),
                    forced_idle: facility.forced_idle(),
                })
            })
            .collect();

        ColonySnapshot {
            site: SiteRecord::capture(&self.map, &self.config.map),
            turn: self.turn,
            stockpile: self.stockpile,
            tile_map: TileMapSnapshot::capture(&self.map),
            structures,
            facilities,
        }
    }

    /// Rebuilds a session: terrain from `heights`, everything else from
    /// `snapshot`.
    ///
    /// The saved site replaces the dimensions and seed of `config.map`;
    /// `heights` must cover that site.
    pub fn restore(mut config: Config, heights: &dyn HeightSource, snapshot: &ColonySnapshot) -> Result<Self> {
        snapshot.site.apply(&mut config.map);
        let map_config = &config.map;
        let mut map = TileMap::new(map_config.width, map_config.height, map_config.max_depth);
        map.generate_terrain(heights, map_config.terrain_bucket)?;
        map.set_view_size(map_config.view_edge_length);
        snapshot.tile_map.apply(&mut map)?;

        let mut colony = Self::new(config, map);
        colony.turn = snapshot.turn;
        colony.stockpile = snapshot.stockpile;

        for record in &snapshot.structures {
            let position = record.structure.position;
            let tile = colony.map.tile_mut(position)?;
            tile.set_terrain(TerrainType::Dozed);
            tile.set_excavated(true);
            colony.structures.restore(&mut colony.map, record.id, record.structure.clone())?;
        }

        for record in &snapshot.facilities {
            let location = record.location();
            let deposit = colony
                .map
                .deposit_at(location)
                .ok_or_else(|| WorldError::logic(format!("no deposit at ({}, {})", location.x, location.y)))?;
            if colony.structures.get(record.structure).map(|s| s.class) != Some(StructureClass::MineFacility) {
                return Err(WorldError::logic(format!(
                    "structure {} is not a mine facility",
                    record.structure.0
                )));
            }
            let mut facility = MineFacility::restore(
                deposit,
                record.state,
                record.storage,
                colony.map.max_depth(),
                &colony.config.mining,
            );
            if record.forced_idle {
                facility = facility.with_forced_idle(true);
            }
            colony.facilities.insert(record.structure, facility);
        }

        colony.check_connectedness();
        tracing::info!(turn = colony.turn, structures = colony.structures.len(), "restored colony");
        Ok(colony)
    }
}
