//! Connectivity walk over the tube network.
//!
//! Starting from a root tile (a command structure) the walk floods outward
//! through connectors, marking every tile it reaches as connected. Marks are
//! never updated incrementally: callers clear them with
//! `TileMap::clear_connectivity` and rerun the walk after any change to the
//! network.

use crate::map::TileMap;
use crate::structure::{ConnectorDir, Structure, StructureClass, StructureRegistry};
use crate::types::{Direction, MapCoordinate};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How connectors link levels at the same surface position.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerticalRule {
    /// Levels never connect.
    Disabled,
    /// An air shaft connects only to an air shaft directly above or below.
    #[default]
    ShaftToShaft,
    /// An air shaft connects to any structure directly above or below.
    ShaftToAny,
}

/// Which structures conduct and how.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionPolicy {
    /// Roads act as four-way connectors.
    pub roads_conduct: bool,
    pub vertical: VerticalRule,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            roads_conduct: true,
            vertical: VerticalRule::ShaftToShaft,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Link {
    Connector(ConnectorDir),
    Plain,
}

fn admits(connector: ConnectorDir, direction: Direction) -> bool {
    match connector {
        ConnectorDir::Intersection | ConnectorDir::Vertical => true,
        ConnectorDir::EastWest => matches!(direction, Direction::East | Direction::West),
        ConnectorDir::NorthSouth => matches!(direction, Direction::North | Direction::South),
    }
}

impl ConnectionPolicy {
    fn link(&self, structure: &Structure) -> Link {
        match structure.class {
            StructureClass::Tube => Link::Connector(structure.connector.unwrap_or(ConnectorDir::Intersection)),
            StructureClass::Road if self.roads_conduct => Link::Connector(ConnectorDir::Intersection),
            _ => Link::Plain,
        }
    }

    fn is_shaft(&self, structure: &Structure) -> bool {
        self.link(structure) == Link::Connector(ConnectorDir::Vertical)
    }

    /// Whether connectivity flows from `source` into `destination`, one step
    /// in `direction`.
    pub fn valid_connection(&self, source: &Structure, destination: &Structure, direction: Direction) -> bool {
        let destination_link = self.link(destination);
        if matches!(destination_link, Link::Connector(_))
            && !(destination.operational() || destination.is_idle())
        {
            return false;
        }

        if direction.is_vertical() {
            return match self.vertical {
                VerticalRule::Disabled => false,
                VerticalRule::ShaftToShaft => self.is_shaft(source) && self.is_shaft(destination),
                VerticalRule::ShaftToAny => self.is_shaft(source) || self.is_shaft(destination),
            };
        }

        match (self.link(source), destination_link) {
            (Link::Connector(from), Link::Connector(to)) => admits(from, direction) && admits(to, direction),
            (Link::Connector(from), Link::Plain) => admits(from, direction),
            (Link::Plain, Link::Connector(to)) => admits(to, direction),
            (Link::Plain, Link::Plain) => false,
        }
    }
}

const WALK_DIRECTIONS: [Direction; 6] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
    Direction::Up,
    Direction::Down,
];

/// Floods connectivity marks outward from `root`.
///
/// The root tile is marked connected. Returns how many tiles the walk newly
/// marked, the root excluded.
pub fn walk_connectivity(
    root: MapCoordinate,
    map: &mut TileMap,
    structures: &StructureRegistry,
    policy: &ConnectionPolicy,
) -> usize {
    let Ok(root_tile) = map.tile_mut(root) else {
        return 0;
    };
    root_tile.set_connected(true);

    let mut marked = 0;
    let mut queue = VecDeque::from([root]);

    while let Some(position) = queue.pop_front() {
        let Some(source) = structures.at(map, position) else {
            continue;
        };

        for direction in WALK_DIRECTIONS {
            let neighbour = position.step(direction);
            match map.tile(neighbour) {
                Ok(tile) if !tile.connected() => {}
                _ => continue,
            }
            let Some(destination) = structures.at(map, neighbour) else {
                continue;
            };
            if !policy.valid_connection(source, destination, direction) {
                continue;
            }
            if let Ok(tile) = map.tile_mut(neighbour) {
                tile.set_connected(true);
                marked += 1;
                queue.push_back(neighbour);
            }
        }
    }

    marked
}
