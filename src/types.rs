//! # Outpost Types Module
//!
//! This module defines the core value types shared by every part of the colony
//! world model: coordinates, directions, terrain categories, ore types and the
//! resource bundles that mines and facilities exchange.
//!
//! ## Key Components
//!
//! - **Point / MapCoordinate**: integer tile addressing, surface and underground
//! - **Direction**: the eight compass directions plus `Up` and `Down`
//! - **TerrainType**: ordered terrain scale, doubling as traversal-cost multiplier
//! - **OreType / StorableResources**: the four ore kinds and a per-ore quantity vector
//! - **Hostility / ProductionRate**: site hostility and the deposit yield it drives
//!
//! All types are serializable so snapshots can carry them unchanged.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// NOTE - Depth of the planetary surface; underground levels count up from here
pub const DEPTH_SURFACE: i32 = 0;

/// NOTE - Integer position on one level of the tile map
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Straight-line distance between two tile positions.
    pub fn distance(self, other: Point) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// NOTE - Full tile address: surface position plus depth level
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapCoordinate {
    pub xy: Point,
    pub z: i32,
}

impl MapCoordinate {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { xy: Point::new(x, y), z }
    }

    pub const fn at(xy: Point, z: i32) -> Self {
        Self { xy, z }
    }

    /// The neighbouring coordinate one step in `direction`, ignoring bounds.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::at(self.xy.offset(dx, dy), self.z + direction.vertical_offset())
    }
}

/// NOTE - Movement directions used by the view window and the graph walk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Up,
    Down,
}

impl Direction {
    /// Cardinal directions in clockwise order, starting north.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Horizontal offset; y grows southward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::Up | Direction::Down => (0, 0),
        }
    }

    /// Depth offset; `Down` digs deeper.
    pub fn vertical_offset(self) -> i32 {
        match self {
            Direction::Up => -1,
            Direction::Down => 1,
            _ => 0,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// NOTE - Terrain categories, ordered from cheapest to impassable
///
/// The ordinal doubles as the tileset index and as the traversal-cost
/// multiplier (`cost = base * (ordinal + 1)`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    Dozed,      // NOTE - Flattened by a bulldozer or a mine head
    #[default]
    Clear,      // NOTE - Open ground
    Rough,      // NOTE - Broken ground
    Difficult,  // NOTE - Steep or rocky ground
    Impassable, // NOTE - Never traversed, never built on
}

impl TerrainType {
    pub const COUNT: usize = 5;

    /// Category for a raw index; anything past the scale is impassable.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => TerrainType::Dozed,
            1 => TerrainType::Clear,
            2 => TerrainType::Rough,
            3 => TerrainType::Difficult,
            _ => TerrainType::Impassable,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Multiplier applied to the base route cost when crossing this terrain.
    pub fn cost_multiplier(self) -> f32 {
        self.index() as f32 + 1.0
    }
}

/// NOTE - The four ore kinds a deposit holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OreType {
    CommonMetals,
    CommonMinerals,
    RareMetals,
    RareMinerals,
}

impl OreType {
    pub const COUNT: usize = 4;

    pub const ALL: [OreType; OreType::COUNT] = [
        OreType::CommonMetals,
        OreType::CommonMinerals,
        OreType::RareMetals,
        OreType::RareMinerals,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// NOTE - Yield category of a deposit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionRate {
    Low,
    Medium,
    High,
}

/// NOTE - Site hostility, selecting the deposit yield distribution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hostility {
    #[default]
    Low,
    Medium,
    High,
}

impl Hostility {
    /// Relative weights of `{low, medium, high}` yield deposits.
    pub fn mine_yield_weights(self) -> [u32; 3] {
        match self {
            Hostility::Low => [30, 50, 20],
            Hostility::Medium => [45, 35, 20],
            Hostility::High => [35, 20, 45],
        }
    }
}

/// Per-ore quantity vector used for deposit reserves and facility storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorableResources {
    pub resources: [u32; OreType::COUNT],
}

impl StorableResources {
    pub const fn new(resources: [u32; OreType::COUNT]) -> Self {
        Self { resources }
    }

    pub const fn uniform(amount: u32) -> Self {
        Self { resources: [amount; OreType::COUNT] }
    }

    pub fn get(&self, ore: OreType) -> u32 {
        self.resources[ore.index()]
    }

    pub fn set(&mut self, ore: OreType, amount: u32) {
        self.resources[ore.index()] = amount;
    }

    pub fn total(&self) -> u32 {
        self.resources.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.iter().all(|&amount| amount == 0)
    }

    /// Each component limited to `limit`.
    pub fn cap(self, limit: u32) -> Self {
        Self { resources: self.resources.map(|amount| amount.min(limit)) }
    }

    /// True when every component has reached the matching component of `capacity`.
    pub fn fills(&self, capacity: &StorableResources) -> bool {
        self.resources
            .iter()
            .zip(capacity.resources.iter())
            .all(|(amount, limit)| amount >= limit)
    }
}

impl Add for StorableResources {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for StorableResources {
    fn add_assign(&mut self, other: Self) {
        for (amount, extra) in self.resources.iter_mut().zip(other.resources) {
            *amount = amount.saturating_add(extra);
        }
    }
}

/// Component-wise subtraction, floored at zero.
impl Sub for StorableResources {
    type Output = Self;

    fn sub(mut self, other: Self) -> Self {
        for (amount, less) in self.resources.iter_mut().zip(other.resources) {
            *amount = amount.saturating_sub(less);
        }
        self
    }
}

/// NOTE - Why a structure is not producing this turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdleReason {
    PlayerSet,           // NOTE - Forced idle from outside the simulation
    InternalStorageFull, // NOTE - Output storage at capacity
    MineExhausted,       // NOTE - Deposit has nothing left
    MineInactive,        // NOTE - Deposit switched off
}
