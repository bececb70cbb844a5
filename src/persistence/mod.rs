//! # Snapshot Persistence Module
//!
//! Serializable records of the world state and the JSON file layer that
//! writes them to disk.
//!
//! ## Layout
//!
//! A tile map snapshot stores only what cannot be regenerated from the height
//! source:
//! - the view window (current depth and origin),
//! - every deposit, keyed by its surface location,
//! - bulldozed surface tiles and excavated underground tiles that hold
//!   neither an occupant nor a deposit.
//!
//! `ColonySnapshot` adds the turn counter, the structure registry and the mine
//! facilities on top, so a whole session round-trips. It also records the
//! site parameters (seed and dimensions) the terrain was generated from, so a
//! loader rebuilds the same ground without being told.

use crate::config::MapConfig;
use crate::error::{Result, SaveError};
use crate::map::{Tile, TileMap};
use crate::mine::Mine;
use crate::mine_facility::FacilityState;
use crate::structure::{Structure, StructureId};
use crate::types::{
    DEPTH_SURFACE, MapCoordinate, OreType, Point, ProductionRate, StorableResources, TerrainType,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// View window parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ViewParameters {
    pub current_depth: i32,
    pub view_x: i32,
    pub view_y: i32,
}

/// One deposit, keyed by its surface location.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MineRecord {
    pub x: i32,
    pub y: i32,
    pub depth: i32,
    pub production_rate: ProductionRate,
    pub reserves: StorableResources,
    pub active: bool,
    pub mining_enabled: [bool; OreType::COUNT],
}

impl MineRecord {
    fn capture(location: Point, mine: &Mine) -> Self {
        Self {
            x: location.x,
            y: location.y,
            depth: mine.depth(),
            production_rate: mine.production_rate(),
            reserves: mine.reserves(),
            active: mine.active(),
            mining_enabled: mine.mining_enabled(),
        }
    }

    fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn to_mine(&self) -> Mine {
        Mine::with_state(
            self.depth,
            self.production_rate,
            self.reserves,
            self.active,
            self.mining_enabled,
        )
    }
}

/// A tile whose state differs from freshly generated terrain.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TileRecord {
    pub x: i32,
    pub y: i32,
    pub depth: i32,
    pub terrain: TerrainType,
}

impl TileRecord {
    fn position(&self) -> MapCoordinate {
        MapCoordinate::new(self.x, self.y, self.depth)
    }
}

/// Whether a tile carries state worth saving.
fn is_saved(tile: &Tile) -> bool {
    let modified = if tile.depth() == DEPTH_SURFACE {
        tile.bulldozed()
    } else {
        tile.excavated()
    };
    modified && tile.is_empty() && !tile.has_mine()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TileMapSnapshot {
    pub view: ViewParameters,
    pub mines: Vec<MineRecord>,
    pub tiles: Vec<TileRecord>,
}

impl TileMapSnapshot {
    pub fn capture(map: &TileMap) -> Self {
        let origin = map.view_origin();
        let view = ViewParameters {
            current_depth: origin.z,
            view_x: origin.xy.x,
            view_y: origin.xy.y,
        };

        let mines = map
            .mine_locations()
            .iter()
            .filter_map(|&location| {
                let mine = map.deposit(map.deposit_at(location)?)?;
                Some(MineRecord::capture(location, mine))
            })
            .collect();

        let tiles = map
            .tiles()
            .filter(|tile| is_saved(tile))
            .map(|tile| TileRecord {
                x: tile.xy().x,
                y: tile.xy().y,
                depth: tile.depth(),
                terrain: tile.terrain(),
            })
            .collect();

        Self { view, mines, tiles }
    }

    /// Replays the snapshot onto a map holding freshly generated terrain and
    /// no deposits: view first, then deposits, then tiles.
    pub fn apply(&self, map: &mut TileMap) -> Result<()> {
        map.set_view_origin(MapCoordinate::new(
            self.view.view_x,
            self.view.view_y,
            self.view.current_depth,
        ));

        for record in &self.mines {
            map.add_deposit(record.location(), record.to_mine())?;
        }

        for record in &self.tiles {
            let tile = map.tile_mut(record.position())?;
            tile.set_terrain(record.terrain);
            if record.depth > DEPTH_SURFACE {
                tile.set_excavated(true);
            }
        }

        tracing::debug!(
            mines = self.mines.len(),
            tiles = self.tiles.len(),
            "applied tile map snapshot"
        );
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StructureRecord {
    pub id: StructureId,
    pub structure: Structure,
}

/// A mine facility, tied to its deposit by surface location.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FacilityRecord {
    pub structure: StructureId,
    pub x: i32,
    pub y: i32,
    pub state: FacilityState,
    pub storage: StorableResources,
    #[serde(default)]
    pub forced_idle: bool,
}

impl FacilityRecord {
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// What the terrain was generated from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SiteRecord {
    /// `None` when the heights came from an image.
    pub seed: Option<u64>,
    pub width: i32,
    pub height: i32,
    pub max_depth: i32,
    pub terrain_bucket: u8,
}

impl SiteRecord {
    /// Dimensions come from `map`, the seed and bucket from `config`.
    pub fn capture(map: &TileMap, config: &MapConfig) -> Self {
        Self {
            seed: config.seed,
            width: map.width(),
            height: map.height(),
            max_depth: map.max_depth(),
            terrain_bucket: config.terrain_bucket,
        }
    }

    /// Overrides the site fields of `config`; a missing seed keeps the
    /// configured one.
    pub fn apply(&self, config: &mut MapConfig) {
        config.width = self.width;
        config.height = self.height;
        config.max_depth = self.max_depth;
        config.terrain_bucket = self.terrain_bucket;
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Complete session state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColonySnapshot {
    pub site: SiteRecord,
    pub turn: u64,
    /// Ore already delivered to the colony.
    #[serde(default)]
    pub stockpile: StorableResources,
    pub tile_map: TileMapSnapshot,
    pub structures: Vec<StructureRecord>,
    pub facilities: Vec<FacilityRecord>,
}

pub fn save_snapshot(path: impl AsRef<Path>, snapshot: &ColonySnapshot) -> std::result::Result<(), SaveError> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, snapshot)?;
    tracing::info!(path = %path.display(), turn = snapshot.turn, "saved snapshot");
    Ok(())
}

pub fn load_snapshot(path: impl AsRef<Path>) -> std::result::Result<ColonySnapshot, SaveError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let snapshot: ColonySnapshot = serde_json::from_reader(reader)?;
    tracing::info!(path = %path.display(), turn = snapshot.turn, "loaded snapshot");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorldError;
    use crate::structure::Occupant;

    fn seeded_map() -> TileMap {
        let mut map = TileMap::new(16, 16, 2);
        map.set_view_size(5);
        let mut mine = Mine::new(ProductionRate::High);
        mine.increase_depth(1000);
        mine.set_active(true);
        mine.enable_ore(OreType::RareMinerals, false);
        mine.pull(OreType::CommonMetals, 250);
        map.add_deposit(Point::new(6, 6), mine).unwrap();
        map.add_deposit(Point::new(10, 9), Mine::new(ProductionRate::Low)).unwrap();

        map.tile_mut(MapCoordinate::new(2, 3, 0)).unwrap().set_terrain(TerrainType::Dozed);
        map.tile_mut(MapCoordinate::new(4, 4, 1)).unwrap().set_excavated(true);
        map.tile_mut(MapCoordinate::new(4, 4, 1)).unwrap().set_terrain(TerrainType::Rough);
        map.set_view_origin(MapCoordinate::new(7, 2, 1));
        map
    }

    #[test]
    fn capture_keeps_only_modified_free_tiles() {
        let mut map = seeded_map();
        map.tile_mut(MapCoordinate::new(3, 3, 0)).unwrap().set_terrain(TerrainType::Dozed);
        map.tile_mut(MapCoordinate::new(3, 3, 0))
            .unwrap()
            .set_occupant(Some(Occupant::Structure(StructureId(0))));

        let snapshot = TileMapSnapshot::capture(&map);
        let positions: Vec<_> = snapshot.tiles.iter().map(|t| (t.x, t.y, t.depth)).collect();
        assert_eq!(positions, vec![(2, 3, 0), (4, 4, 1)]);
        assert_eq!(snapshot.mines.len(), 2);
        assert_eq!(snapshot.view, ViewParameters { current_depth: 1, view_x: 7, view_y: 2 });
    }

    #[test]
    fn apply_restores_deposits_tiles_and_view() {
        let original = seeded_map();
        let snapshot = TileMapSnapshot::capture(&original);

        let mut restored = TileMap::new(16, 16, 2);
        restored.set_view_size(5);
        snapshot.apply(&mut restored).unwrap();

        assert_eq!(restored.view_origin(), original.view_origin());
        assert_eq!(restored.mine_locations(), original.mine_locations());
        for &location in original.mine_locations() {
            let before = original.deposit(original.deposit_at(location).unwrap()).unwrap();
            let after = restored.deposit(restored.deposit_at(location).unwrap()).unwrap();
            assert_eq!(before, after);
            let tile = restored.tile(MapCoordinate::at(location, 0)).unwrap();
            assert!(tile.bulldozed());
        }

        let dug = restored.tile(MapCoordinate::new(4, 4, 1)).unwrap();
        assert!(dug.excavated());
        assert_eq!(dug.terrain(), TerrainType::Rough);
        assert!(restored.tile(MapCoordinate::new(2, 3, 0)).unwrap().bulldozed());
        assert_eq!(TileMapSnapshot::capture(&restored), snapshot);
    }

    #[test]
    fn apply_rejects_records_outside_the_map() {
        let snapshot = TileMapSnapshot::capture(&seeded_map());
        let mut small = TileMap::new(8, 8, 2);
        assert!(matches!(snapshot.apply(&mut small), Err(WorldError::OutOfBounds { .. })));
    }

    #[test]
    fn snapshot_file_round_trip() {
        let snapshot = ColonySnapshot {
            site: SiteRecord::capture(
                &seeded_map(),
                &MapConfig {
                    seed: Some(7),
                    ..MapConfig::default()
                },
            ),
            turn: 12,
            stockpile: StorableResources::uniform(40),
            tile_map: TileMapSnapshot::capture(&seeded_map()),
            structures: Vec::new(),
            facilities: vec![FacilityRecord {
                structure: StructureId(4),
                x: 6,
                y: 6,
                state: FacilityState::Extending { turns_remaining: 3 },
                storage: StorableResources::new([1, 2, 3, 4]),
                forced_idle: true,
            }],
        };

        let path = std::env::temp_dir().join(format!("outpost-snapshot-{}.json", std::process::id()));
        save_snapshot(&path, &snapshot).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn site_overrides_the_configured_map() {
        let site = SiteRecord {
            seed: Some(42),
            width: 64,
            height: 48,
            max_depth: 3,
            terrain_bucket: 40,
        };
        let mut config = MapConfig::default();
        site.apply(&mut config);
        assert_eq!((config.width, config.height, config.max_depth), (64, 48, 3));
        assert_eq!(config.terrain_bucket, 40);
        assert_eq!(config.seed, Some(42));
        assert_eq!(SiteRecord::capture(&TileMap::new(64, 48, 3), &config), site);

        config.seed = Some(9);
        SiteRecord { seed: None, ..site }.apply(&mut config);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn older_facility_records_are_not_forced_idle() {
        let json = r#"{"structure":2,"x":6,"y":6,"state":"Operational","storage":{"resources":[0,0,0,0]}}"#;
        let record: FacilityRecord = serde_json::from_str(json).unwrap();
        assert!(!record.forced_idle);
        assert_eq!(record.location(), Point::new(6, 6));
    }

    #[test]
    fn missing_file_is_a_file_system_error() {
        let err = load_snapshot("/nonexistent/outpost/save.json").unwrap_err();
        assert!(matches!(err, SaveError::FileSystem(_)));
    }
}
