//! Route costs over the tile map and the A* search that consumes them.
//!
//! `PathContext` bundles everything a cost query needs: the map, the structure
//! registry, the cost table and the endpoints of the current search. Endpoint
//! tiles may be occupied (a route can start or end at a structure) even though
//! occupied tiles cannot be crossed en route.
//!
//! Costs are never errors: blocked edges cost `f32::INFINITY` and are never
//! expanded by the search.

use crate::config::RouteConfig;
use crate::map::TileMap;
use crate::structure::{Occupant, StructureRegistry};
use crate::types::{Direction, MapCoordinate, TerrainType};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Straight-line distance between two tiles; admissible for 4-neighbour moves.
pub fn heuristic(a: MapCoordinate, b: MapCoordinate) -> f32 {
    a.xy.distance(b.xy)
}

/// Everything a single route search reads.
#[derive(Clone, Copy)]
pub struct PathContext<'a> {
    map: &'a TileMap,
    structures: &'a StructureRegistry,
    costs: &'a RouteConfig,
    start: Option<MapCoordinate>,
    end: Option<MapCoordinate>,
}

impl<'a> PathContext<'a> {
    pub fn new(map: &'a TileMap, structures: &'a StructureRegistry, costs: &'a RouteConfig) -> Self {
        Self {
            map,
            structures,
            costs,
            start: None,
            end: None,
        }
    }

    pub fn with_endpoints(mut self, start: MapCoordinate, end: MapCoordinate) -> Self {
        self.set_endpoints(start, end);
        self
    }

    pub fn set_endpoints(&mut self, start: MapCoordinate, end: MapCoordinate) {
        self.start = Some(start);
        self.end = Some(end);
    }

    pub fn clear_endpoints(&mut self) {
        self.start = None;
        self.end = None;
    }

    fn is_endpoint(&self, position: MapCoordinate) -> bool {
        self.start == Some(position) || self.end == Some(position)
    }

    /// Cost of stepping from `from` onto `to`.
    pub fn edge_cost(&self, from: MapCoordinate, to: MapCoordinate) -> f32 {
        let Ok(tile) = self.map.tile(to) else {
            return f32::INFINITY;
        };
        if to.z != from.z {
            return f32::INFINITY;
        }

        let terrain_cost = self.costs.base_cost * tile.terrain().cost_multiplier();

        if tile.terrain() == TerrainType::Impassable {
            return f32::INFINITY;
        }

        let Some(occupant) = tile.occupant() else {
            return terrain_cost;
        };

        if self.is_endpoint(to) {
            return terrain_cost;
        }

        let road = match occupant {
            Occupant::Structure(id) => self.structures.get(id).filter(|s| s.is_road()),
            Occupant::Robot(_) => None,
        };

        match road {
            Some(road) if !road.operational() => {
                self.costs.base_cost * TerrainType::Difficult.cost_multiplier()
            }
            Some(road) if road.integrity < self.costs.road_repair_threshold => {
                self.costs.damaged_road_cost
            }
            Some(_) => self.costs.road_cost,
            None => f32::INFINITY,
        }
    }

    /// In-bounds cardinal neighbours of `position` with their step costs.
    pub fn adjacent(&self, position: MapCoordinate) -> Vec<(MapCoordinate, f32)> {
        Direction::CARDINAL
            .iter()
            .map(|&direction| position.step(direction))
            .filter(|&neighbour| self.map.is_valid_position(neighbour))
            .map(|neighbour| (neighbour, self.edge_cost(position, neighbour)))
            .collect()
    }
}

/// A found route, `start` and `end` inclusive.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub tiles: Vec<MapCoordinate>,
    pub cost: f32,
}

impl Route {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq)]
struct Node {
    position: MapCoordinate,
    g_cost: f32,
    f_cost: f32,
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_cost is "greatest".
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* search from `start` to `end` over the cost model.
///
/// Registers the endpoints on a copy of `context`; the caller's context is
/// untouched. Returns `None` when no finite-cost route exists.
pub fn find_path(context: &PathContext<'_>, start: MapCoordinate, end: MapCoordinate) -> Option<Route> {
    if !context.map.is_valid_position(start) || !context.map.is_valid_position(end) {
        return None;
    }
    if start == end {
        return Some(Route { tiles: vec![start], cost: 0.0 });
    }

    let context = context.with_endpoints(start, end);
    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<MapCoordinate, MapCoordinate> = HashMap::new();
    let mut g_score: HashMap<MapCoordinate, f32> = HashMap::new();

    g_score.insert(start, 0.0);
    open_set.push(Node {
        position: start,
        g_cost: 0.0,
        f_cost: heuristic(start, end),
    });

    while let Some(current) = open_set.pop() {
        if current.position == end {
            let mut tiles = vec![end];
            let mut step = end;
            while let Some(&previous) = came_from.get(&step) {
                tiles.push(previous);
                step = previous;
            }
            tiles.reverse();
            return Some(Route { tiles, cost: current.g_cost });
        }

        // Stale heap entry; a cheaper route to this tile was already expanded.
        if g_score.get(&current.position).is_some_and(|&best| current.g_cost > best) {
            continue;
        }

        for (neighbour, cost) in context.adjacent(current.position) {
            if !cost.is_finite() {
                continue;
            }
            let tentative = current.g_cost + cost;
            if g_score.get(&neighbour).is_none_or(|&known| tentative < known) {
                came_from.insert(neighbour, current.position);
                g_score.insert(neighbour, tentative);
                open_set.push(Node {
                    position: neighbour,
                    g_cost: tentative,
                    f_cost: tentative + heuristic(neighbour, end),
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{RobotId, Structure, StructureClass, StructureState};
    use crate::types::Point;

    fn surface(x: i32, y: i32) -> MapCoordinate {
        MapCoordinate::at(Point::new(x, y), 0)
    }

    struct Fixture {
        map: TileMap,
        structures: StructureRegistry,
        costs: RouteConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                map: TileMap::new(8, 8, 1),
                structures: StructureRegistry::new(),
                costs: RouteConfig::default(),
            }
        }

        fn build(&mut self, structure: Structure) {
            self.structures.add(&mut self.map, structure).unwrap();
        }

        fn context(&self) -> PathContext<'_> {
            PathContext::new(&self.map, &self.structures, &self.costs)
        }
    }

    #[test]
    fn heuristic_is_euclidean() {
        assert_eq!(heuristic(surface(0, 0), surface(3, 4)), 5.0);
    }

    #[test]
    fn empty_tiles_cost_by_terrain() {
        let mut fixture = Fixture::new();
        fixture.map.tile_mut(surface(1, 0)).unwrap().set_terrain(TerrainType::Rough);
        fixture.map.tile_mut(surface(0, 1)).unwrap().set_terrain(TerrainType::Dozed);
        let context = fixture.context();
        assert_eq!(context.edge_cost(surface(0, 0), surface(1, 0)), 3.0);
        assert_eq!(context.edge_cost(surface(0, 0), surface(0, 1)), 1.0);
    }

    #[test]
    fn impassable_is_infinite_even_as_endpoint() {
        let mut fixture = Fixture::new();
        fixture.map.tile_mut(surface(1, 0)).unwrap().set_terrain(TerrainType::Impassable);
        let context = fixture.context().with_endpoints(surface(0, 0), surface(1, 0));
        assert_eq!(context.edge_cost(surface(0, 0), surface(1, 0)), f32::INFINITY);
    }

    #[test]
    fn road_costs_depend_on_state_and_integrity() {
        let mut fixture = Fixture::new();
        fixture.build(Structure::new(StructureClass::Road, surface(1, 0)).with_state(StructureState::Operational));
        fixture.build(
            Structure::new(StructureClass::Road, surface(2, 0))
                .with_state(StructureState::Operational)
                .with_integrity(20),
        );
        fixture.build(Structure::new(StructureClass::Road, surface(3, 0)));
        let context = fixture.context();
        assert_eq!(context.edge_cost(surface(0, 0), surface(1, 0)), 0.5);
        assert_eq!(context.edge_cost(surface(1, 0), surface(2, 0)), 0.75);
        assert_eq!(context.edge_cost(surface(2, 0), surface(3, 0)), 4.0);
    }

    #[test]
    fn occupied_tiles_block_unless_endpoint() {
        let mut fixture = Fixture::new();
        fixture.build(Structure::new(StructureClass::Factory, surface(1, 0)).with_state(StructureState::Operational));
        fixture.map.tile_mut(surface(0, 1)).unwrap().set_occupant(Some(Occupant::Robot(RobotId(1))));

        let mut context = fixture.context();
        assert_eq!(context.edge_cost(surface(0, 0), surface(1, 0)), f32::INFINITY);
        assert_eq!(context.edge_cost(surface(0, 0), surface(0, 1)), f32::INFINITY);

        context.set_endpoints(surface(5, 5), surface(1, 0));
        assert_eq!(context.edge_cost(surface(0, 0), surface(1, 0)), 2.0);
        context.clear_endpoints();
        assert_eq!(context.edge_cost(surface(0, 0), surface(1, 0)), f32::INFINITY);
    }

    #[test]
    fn adjacent_skips_out_of_bounds_neighbours() {
        let fixture = Fixture::new();
        let corner = fixture.context().adjacent(surface(0, 0));
        let positions: Vec<_> = corner.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![surface(1, 0), surface(0, 1)]);
    }

    #[test]
    fn search_routes_around_walls() {
        let mut fixture = Fixture::new();
        for y in 0..7 {
            fixture.map.tile_mut(surface(3, y)).unwrap().set_terrain(TerrainType::Impassable);
        }
        let route = find_path(&fixture.context(), surface(0, 0), surface(6, 0)).unwrap();
        assert_eq!(route.tiles.first(), Some(&surface(0, 0)));
        assert_eq!(route.tiles.last(), Some(&surface(6, 0)));
        assert!(route.tiles.contains(&surface(3, 7)));
        assert!(route.tiles.windows(2).all(|w| {
            let (a, b) = (w[0].xy, w[1].xy);
            (a.x - b.x).abs() + (a.y - b.y).abs() == 1
        }));
    }

    #[test]
    fn search_reaches_occupied_destination() {
        let mut fixture = Fixture::new();
        fixture.build(Structure::new(StructureClass::Warehouse, surface(4, 4)).with_state(StructureState::Operational));
        let route = find_path(&fixture.context(), surface(0, 4), surface(4, 4)).unwrap();
        assert_eq!(route.tiles.len(), 5);
        assert_eq!(route.cost, 8.0);
    }

    #[test]
    fn search_fails_when_walled_off() {
        let mut fixture = Fixture::new();
        for y in 0..8 {
            fixture.map.tile_mut(surface(3, y)).unwrap().set_terrain(TerrainType::Impassable);
        }
        assert!(find_path(&fixture.context(), surface(0, 0), surface(6, 0)).is_none());
    }
}
