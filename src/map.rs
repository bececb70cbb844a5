use crate::config::MapConfig;
use crate::error::{Result, WorldError};
use crate::mine::{DepositId, Mine};
use crate::structure::Occupant;
use crate::terrain::HeightSource;
use crate::types::{
    DEPTH_SURFACE, Direction, Hostility, MapCoordinate, Point, ProductionRate, TerrainType,
};
use rand::prelude::*;

/// Tiles kept clear of deposits along every map edge.
const MINE_EDGE_MARGIN: i32 = 5;

/// Smallest view window edge.
const MIN_VIEW_SIZE: i32 = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    position: MapCoordinate,
    terrain: TerrainType,
    excavated: bool,
    occupant: Option<Occupant>,
    mine: Option<DepositId>,
    connected: bool,
}

impl Tile {
    fn new(position: MapCoordinate, terrain: TerrainType) -> Self {
        Self {
            position,
            terrain,
            excavated: position.z == DEPTH_SURFACE,
            occupant: None,
            mine: None,
            connected: false,
        }
    }

    pub fn position(&self) -> MapCoordinate {
        self.position
    }

    pub fn xy(&self) -> Point {
        self.position.xy
    }

    pub fn depth(&self) -> i32 {
        self.position.z
    }

    pub fn terrain(&self) -> TerrainType {
        self.terrain
    }

    pub fn set_terrain(&mut self, terrain: TerrainType) {
        self.terrain = terrain;
    }

    pub fn bulldozed(&self) -> bool {
        self.terrain == TerrainType::Dozed
    }

    pub fn excavated(&self) -> bool {
        self.excavated
    }

    pub fn set_excavated(&mut self, excavated: bool) {
        self.excavated = excavated;
    }

    pub fn occupant(&self) -> Option<Occupant> {
        self.occupant
    }

    /// Replaces the occupant without checking terrain; callers validate first.
    pub fn set_occupant(&mut self, occupant: Option<Occupant>) {
        self.occupant = occupant;
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn mine(&self) -> Option<DepositId> {
        self.mine
    }

    pub fn has_mine(&self) -> bool {
        self.mine.is_some()
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

/// Dense three-dimensional tile grid.
///
/// Tiles live in one `Vec` addressed by `((depth * height) + y) * width + x`.
/// Width, height and depth are fixed at construction. Deposits are held in an
/// arena and referenced from their surface tile by `DepositId`.
#[derive(Clone, Debug)]
pub struct TileMap {
    width: i32,
    height: i32,
    max_depth: i32,
    tiles: Vec<Tile>,
    deposits: Vec<Option<Mine>>,
    mine_locations: Vec<Point>,
    view_origin: MapCoordinate,
    edge_length: i32,
}

impl TileMap {
    /// Blank map: clear terrain everywhere, only the surface excavated.
    pub fn new(width: i32, height: i32, max_depth: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let max_depth = max_depth.max(0);

        let mut tiles = Vec::with_capacity((width * height * (max_depth + 1)) as usize);
        for depth in 0..=max_depth {
            for y in 0..height {
                for x in 0..width {
                    tiles.push(Tile::new(MapCoordinate::new(x, y, depth), TerrainType::default()));
                }
            }
        }

        Self {
            width,
            height,
            max_depth,
            tiles,
            deposits: Vec::new(),
            mine_locations: Vec::new(),
            view_origin: MapCoordinate::default(),
            edge_length: MIN_VIEW_SIZE,
        }
    }

    /// Builds a site from a height source and seeds its deposits.
    pub fn generate<R: Rng + ?Sized>(
        config: &MapConfig,
        height_source: &dyn HeightSource,
        rng: &mut R,
    ) -> Result<Self> {
        let mut map = Self::new(config.width, config.height, config.max_depth);
        map.generate_terrain(height_source, config.terrain_bucket)?;
        map.place_deposits(config.mine_count, config.hostility, rng);
        map.set_view_size(config.view_edge_length);
        Ok(map)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    pub fn is_valid_position(&self, position: MapCoordinate) -> bool {
        self.contains(position.xy) && (0..=self.max_depth).contains(&position.z)
    }

    /// True when `point` lies on the map's surface rectangle.
    pub fn contains(&self, point: Point) -> bool {
        (0..self.width).contains(&point.x) && (0..self.height).contains(&point.y)
    }

    fn index(&self, position: MapCoordinate) -> Result<usize> {
        if !self.is_valid_position(position) {
            return Err(WorldError::OutOfBounds {
                x: position.xy.x,
                y: position.xy.y,
                depth: position.z,
            });
        }
        let (x, y, z) = (
            position.xy.x as usize,
            position.xy.y as usize,
            position.z as usize,
        );
        Ok(((z * self.height as usize) + y) * self.width as usize + x)
    }

    pub fn tile(&self, position: MapCoordinate) -> Result<&Tile> {
        let index = self.index(position)?;
        Ok(&self.tiles[index])
    }

    pub fn tile_mut(&mut self, position: MapCoordinate) -> Result<&mut Tile> {
        let index = self.index(position)?;
        Ok(&mut self.tiles[index])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Sets every tile's terrain from `height_source`.
    ///
    /// Intensity divided by `bucket` gives the terrain category. Ground under
    /// a deposit or an occupant stays flattened; excavation, occupants and
    /// deposits are left as they are.
    pub fn generate_terrain(&mut self, height_source: &dyn HeightSource, bucket: u8) -> Result<()> {
        if (height_source.width() as i64) < self.width as i64
            || (height_source.height() as i64) < self.height as i64
        {
            return Err(WorldError::DimensionMismatch {
                width: self.width,
                height: self.height,
                actual_width: height_source.width(),
                actual_height: height_source.height(),
            });
        }

        let bucket = bucket.max(1) as usize;
        let width = self.width;
        for tile in self.tiles.iter_mut() {
            let Point { x, y } = tile.xy();
            let intensity = height_source.intensity(x as u32, y as u32) as usize;
            tile.terrain = if tile.has_mine() || !tile.is_empty() {
                TerrainType::Dozed
            } else {
                TerrainType::from_index(intensity / bucket)
            };
        }

        tracing::debug!(
            width,
            height = self.height,
            levels = self.max_depth + 1,
            "built terrain map"
        );
        Ok(())
    }

    /// Seeds up to `count` well-spaced deposits on the surface.
    ///
    /// Returns how many were placed; dense requests may yield fewer.
    pub fn place_deposits<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        hostility: Hostility,
        rng: &mut R,
    ) -> usize {
        let locations = generate_mine_locations(self.width, self.height, count, rng);
        let weights = hostility.mine_yield_weights();

        let mut placed = 0;
        for location in locations {
            let rate = random_yield(weights, rng);
            match self.add_deposit(location, Mine::new(rate)) {
                Ok(_) => placed += 1,
                Err(err) => tracing::warn!(%err, ?location, "skipped deposit location"),
            }
        }

        if placed < count {
            tracing::warn!(placed, requested = count, "placed fewer deposits than requested");
        } else {
            tracing::info!(placed, "placed mine deposits");
        }
        placed
    }

    /// Attaches `mine` to the surface tile at `location` and flattens it.
    pub fn add_deposit(&mut self, location: Point, mine: Mine) -> Result<DepositId> {
        let id = DepositId(self.deposits.len() as u32);
        let tile = self.tile_mut(MapCoordinate::at(location, DEPTH_SURFACE))?;
        if tile.has_mine() {
            return Err(WorldError::logic("tile already holds a deposit"));
        }
        tile.mine = Some(id);
        tile.set_terrain(TerrainType::Dozed);

        self.deposits.push(Some(mine));
        self.mine_locations.push(location);
        Ok(id)
    }

    /// Detaches and returns the deposit at `location`.
    pub fn remove_deposit_at(&mut self, location: Point) -> Result<Mine> {
        let tile = self.tile_mut(MapCoordinate::at(location, DEPTH_SURFACE))?;
        let id = tile
            .mine
            .take()
            .ok_or_else(|| WorldError::logic("no deposit to remove"))?;

        self.mine_locations.retain(|&point| point != location);
        self.deposits
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or_else(|| WorldError::logic(format!("deposit {} already released", id.0)))
    }

    pub fn mine_locations(&self) -> &[Point] {
        &self.mine_locations
    }

    pub fn deposit(&self, id: DepositId) -> Option<&Mine> {
        self.deposits.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn deposit_mut(&mut self, id: DepositId) -> Option<&mut Mine> {
        self.deposits.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Handle of the deposit under the surface tile at `location`.
    pub fn deposit_at(&self, location: Point) -> Option<DepositId> {
        self.tile(MapCoordinate::at(location, DEPTH_SURFACE)).ok()?.mine()
    }

    pub fn clear_connectivity(&mut self) {
        for tile in self.tiles.iter_mut() {
            tile.connected = false;
        }
    }

    // View window: projection state only, never touched by the simulation.

    pub fn view_origin(&self) -> MapCoordinate {
        self.view_origin
    }

    pub fn current_depth(&self) -> i32 {
        self.view_origin.z
    }

    pub fn view_size(&self) -> i32 {
        self.edge_length
    }

    /// Origin and edge length of the visible square.
    pub fn view_area(&self) -> (Point, i32) {
        (self.view_origin.xy, self.edge_length)
    }

    pub fn set_view_size(&mut self, size_in_tiles: i32) {
        self.edge_length = size_in_tiles.max(MIN_VIEW_SIZE);
        self.set_view_origin(self.view_origin);
    }

    /// Moves the window, clamped so it never hangs past the map edge.
    pub fn set_view_origin(&mut self, position: MapCoordinate) {
        let max_x = (self.width - self.edge_length).max(0);
        let max_y = (self.height - self.edge_length).max(0);
        self.view_origin.xy = Point::new(position.xy.x.clamp(0, max_x), position.xy.y.clamp(0, max_y));
        self.set_current_depth(position.z);
    }

    pub fn set_current_depth(&mut self, depth: i32) {
        self.view_origin.z = depth.clamp(0, self.max_depth);
    }

    /// Centers the window on `point` at the current depth.
    pub fn center_on(&mut self, point: Point) {
        self.center_on_coordinate(MapCoordinate::at(point, self.view_origin.z));
    }

    pub fn center_on_coordinate(&mut self, position: MapCoordinate) {
        let half = self.edge_length / 2;
        self.set_view_origin(MapCoordinate::at(position.xy.offset(-half, -half), position.z));
    }

    pub fn move_view(&mut self, direction: Direction) {
        self.set_view_origin(self.view_origin.step(direction));
    }

    pub fn is_visible(&self, position: MapCoordinate) -> bool {
        let origin = self.view_origin.xy;
        position.z == self.view_origin.z
            && (origin.x..origin.x + self.edge_length).contains(&position.xy.x)
            && (origin.y..origin.y + self.edge_length).contains(&position.xy.y)
    }
}

/// Picks well-spaced deposit locations by rejection sampling.
///
/// A point is rejected when any tile of its 3x3 neighbourhood is already
/// claimed. At most `2 * count` points are drawn.
fn generate_mine_locations<R: Rng + ?Sized>(
    width: i32,
    height: i32,
    count: usize,
    rng: &mut R,
) -> Vec<Point> {
    let mut locations = Vec::with_capacity(count);
    let (max_x, max_y) = (width - MINE_EDGE_MARGIN, height - MINE_EDGE_MARGIN);
    if max_x < MINE_EDGE_MARGIN || max_y < MINE_EDGE_MARGIN {
        return locations;
    }

    let mut claimed = vec![false; (width * height) as usize];
    let neighbourhood = |point: Point| {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| point.offset(dx, dy)))
    };

    for _ in 0..count.saturating_mul(2) {
        if locations.len() >= count {
            break;
        }
        let point = Point::new(
            rng.gen_range(MINE_EDGE_MARGIN..=max_x),
            rng.gen_range(MINE_EDGE_MARGIN..=max_y),
        );
        let index = |p: Point| (p.x + width * p.y) as usize;
        if neighbourhood(point).any(|p| claimed[index(p)]) {
            continue;
        }
        for p in neighbourhood(point) {
            claimed[index(p)] = true;
        }
        locations.push(point);
    }

    locations
}

fn random_yield<R: Rng + ?Sized>(weights: [u32; 3], rng: &mut R) -> ProductionRate {
    let total: u32 = weights.iter().sum();
    let roll = rng.gen_range(1..=total.max(1));
    if roll <= weights[0] {
        ProductionRate::Low
    } else if roll <= weights[0] + weights[1] {
        ProductionRate::Medium
    } else {
        ProductionRate::High
    }
}
