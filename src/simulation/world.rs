//! Main simulation world that ties everything together
//!
//! `SimWorld` owns the whole state of one run: the grid, the road graph, the
//! agents and the step counter. `tick` is the scheduler.

use anyhow::{bail, Context, Result};
use log::{info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::SeedableRng;
use std::collections::HashMap;

use super::destination::DestinationRegistry;
use super::grid::{Cell, Grid, Occupant};
use super::map::{MapLayout, SymbolDictionary, SymbolValue};
use super::road_graph::RoadGraph;
use super::snapshot::{
    DestinationView, LightView, SimStats, StaticKind, StaticView, VehicleView,
};
use super::spawner::{place_vehicle, SpawnController};
use super::traffic_light::{TrafficLight, TrafficLightController};
use super::types::{
    Coordinate, DestinationId, LightId, SimId, VehicleId, DEFAULT_LIGHT_TOGGLE_PERIOD,
    DEFAULT_SPAWN_INTERVAL,
};
use super::vehicle::{Vehicle, VehicleUpdateResult};

/// Map used by the built-in demo world: a one-way ring with two lights and
/// four destinations along its outer edge
pub const TEST_WORLD_MAP: &str = "\
...D....D...
.<<<<S<<<<<.
.v.#....#.^.
.v..####..^.
.v..####..^.
.v.#....#.^.
.>>>>s>>>>^.
...D....D...
";

/// Entry cells of the demo world
pub fn test_world_spawn_points() -> Vec<Coordinate> {
    vec![Coordinate::new(1, 5), Coordinate::new(10, 3)]
}

/// Run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Ticks between global light flips, `None` freezes the lights
    pub light_toggle_period: Option<u32>,
    /// Ticks between spawn attempts, `None` disables periodic spawning
    pub spawn_interval: Option<u32>,
    /// Road cells where vehicles enter the map
    pub spawn_points: Vec<Coordinate>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            light_toggle_period: Some(DEFAULT_LIGHT_TOGGLE_PERIOD),
            spawn_interval: Some(DEFAULT_SPAWN_INTERVAL),
            spawn_points: Vec::new(),
        }
    }
}

/// The main simulation world
pub struct SimWorld {
    /// Cell occupancy
    pub grid: Grid,

    /// Legal moves between drivable cells
    pub road_graph: RoadGraph,

    pub lights: TrafficLightController,

    pub destinations: DestinationRegistry,

    /// Live vehicles
    pub vehicles: HashMap<VehicleId, Vehicle>,

    pub spawners: Vec<SpawnController>,

    config: SimConfig,

    /// Next ID to assign to lights and destinations
    next_id: usize,

    /// Next ID to assign to a vehicle
    next_vehicle_id: usize,

    /// Ticks run so far
    pub current_step: u64,

    total_spawned: u32,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl SimWorld {
    fn new_internal(
        layout: &MapLayout,
        dictionary: &SymbolDictionary,
        config: SimConfig,
        rng: Option<StdRng>,
    ) -> Result<Self> {
        let spawn_points = config.spawn_points.clone();
        let grid = Grid::new(layout.width(), layout.height()).context("Map is too large")?;
        let mut world = Self {
            grid,
            road_graph: RoadGraph::default(),
            lights: TrafficLightController::new(config.light_toggle_period),
            destinations: DestinationRegistry::new(),
            vehicles: HashMap::new(),
            spawners: Vec::new(),
            config,
            next_id: 0,
            next_vehicle_id: 0,
            current_step: 0,
            total_spawned: 0,
            rng,
        };

        for (coord, value) in layout.decode(dictionary)? {
            match value {
                SymbolValue::Road(direction) => {
                    world.grid.place(coord, Occupant::Road(direction))?;
                }
                SymbolValue::Light {
                    open,
                    time_to_change,
                } => {
                    let id = LightId(world.next_sim_id());
                    world
                        .lights
                        .add_light(TrafficLight::new(id, coord, open, time_to_change));
                    world.grid.place(coord, Occupant::Light(id))?;
                }
                SymbolValue::Obstacle => {
                    world.grid.place(coord, Occupant::Obstacle)?;
                }
                SymbolValue::Destination => {
                    let id = DestinationId(world.next_sim_id());
                    world.destinations.add(id, coord);
                    world.grid.place(coord, Occupant::Destination(id))?;
                }
                SymbolValue::Empty => {}
            }
        }

        world.road_graph = RoadGraph::build(&world.grid)?;

        for point in spawn_points {
            if world.grid.cell(point).and_then(Cell::road_direction).is_none() {
                bail!("Spawn point {} is not on a road cell", point);
            }
            world.spawners.push(SpawnController::new(point));
        }

        info!(
            "World ready: {}x{} grid, {} drivable cells, {} lights, {} destinations, {} spawn points",
            world.grid.width(),
            world.grid.height(),
            world.road_graph.key_count(),
            world.lights.len(),
            world.destinations.len(),
            world.spawners.len()
        );

        Ok(world)
    }

    /// Builds a world from a decoded map
    pub fn new(layout: &MapLayout, dictionary: &SymbolDictionary, config: SimConfig) -> Result<Self> {
        Self::new_internal(layout, dictionary, config, None)
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(
        layout: &MapLayout,
        dictionary: &SymbolDictionary,
        config: SimConfig,
        seed: u64,
    ) -> Result<Self> {
        Self::new_internal(layout, dictionary, config, Some(StdRng::seed_from_u64(seed)))
    }

    /// Builds a world from map text using the standard symbol dictionary
    pub fn from_text(map: &str, config: SimConfig) -> Result<Self> {
        Self::new(&MapLayout::from_text(map)?, &SymbolDictionary::standard(), config)
    }

    /// Create the demo world
    pub fn create_test_world() -> Result<Self> {
        Self::new(
            &MapLayout::from_text(TEST_WORLD_MAP)?,
            &SymbolDictionary::standard(),
            Self::test_world_config(),
        )
    }

    /// Create the demo world with a seeded RNG for reproducible simulations
    pub fn create_test_world_with_seed(seed: u64) -> Result<Self> {
        Self::new_with_seed(
            &MapLayout::from_text(TEST_WORLD_MAP)?,
            &SymbolDictionary::standard(),
            Self::test_world_config(),
            seed,
        )
    }

    fn test_world_config() -> SimConfig {
        SimConfig {
            spawn_points: test_world_spawn_points(),
            ..SimConfig::default()
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    fn next_vehicle_id(&self) -> VehicleId {
        VehicleId(SimId(self.next_vehicle_id))
    }

    /// Shuffle a slice, using seeded RNG if available
    fn shuffle<T>(&mut self, items: &mut [T]) {
        match &mut self.rng {
            Some(rng) => items.shuffle(rng),
            None => items.shuffle(&mut rand::rng()),
        }
    }

    /// Choose a random element from a slice, using seeded RNG if available
    fn choose_random<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }

    /// Puts a vehicle on a free road cell, heading for `destination`
    pub fn spawn_vehicle(&mut self, at: Coordinate, destination: DestinationId) -> Result<VehicleId> {
        if self.destinations.get(destination).is_none() {
            bail!("Destination {:?} not found", destination);
        }

        let id = self.next_vehicle_id();
        let vehicle = place_vehicle(&mut self.grid, id, at, destination)?;
        self.register_vehicle(vehicle);
        Ok(id)
    }

    fn register_vehicle(&mut self, vehicle: Vehicle) {
        self.next_vehicle_id += 1;
        self.total_spawned += 1;
        self.vehicles.insert(vehicle.id, vehicle);
    }

    /// Attempts a spawn at every spawn point, each vehicle heading for a
    /// randomly chosen destination. Returns how many vehicles were created.
    pub fn spawn_from_all(&mut self) -> usize {
        let destination_ids = self.destinations.ids();
        if destination_ids.is_empty() {
            if !self.spawners.is_empty() {
                warn!("Step {}: no destinations on the map, nothing spawned", self.current_step);
            }
            return 0;
        }

        let mut spawned = 0;
        for index in 0..self.spawners.len() {
            let Some(&destination) = self.choose_random(&destination_ids) else {
                continue;
            };
            let id = self.next_vehicle_id();
            if let Some(vehicle) = self.spawners[index].try_spawn(&mut self.grid, id, destination) {
                self.register_vehicle(vehicle);
                spawned += 1;
            }
        }
        spawned
    }

    fn run_spawners(&mut self) {
        let Some(interval) = self.config.spawn_interval.filter(|i| *i > 0) else {
            return;
        };
        if self.current_step % u64::from(interval) == 0 {
            self.spawn_from_all();
        }
    }

    /// Update all vehicles once, in a freshly shuffled order
    fn update_vehicles(&mut self) {
        let mut order: Vec<VehicleId> = self.vehicles.keys().copied().collect();
        order.sort();
        self.shuffle(&mut order);

        for vehicle_id in order {
            let Some(mut vehicle) = self.vehicles.remove(&vehicle_id) else {
                continue;
            };

            let Some(goal) = self.destinations.position(vehicle.destination) else {
                warn!(
                    "Vehicle {:?} heads for unknown destination {:?}",
                    vehicle_id, vehicle.destination
                );
                self.vehicles.insert(vehicle_id, vehicle);
                continue;
            };

            match vehicle.update(goal, &mut self.grid, &self.road_graph, &self.lights) {
                Ok(VehicleUpdateResult::Arrived) => self.retire_vehicle(vehicle),
                Ok(result) => {
                    trace!("Vehicle {:?} at {}: {:?}", vehicle_id, vehicle.position, result);
                    self.vehicles.insert(vehicle_id, vehicle);
                }
                Err(err) => {
                    warn!("Vehicle {:?} update failed: {:#}", vehicle_id, err);
                    self.vehicles.insert(vehicle_id, vehicle);
                }
            }
        }
    }

    /// Takes an arrived vehicle off the grid and books its arrival
    fn retire_vehicle(&mut self, vehicle: Vehicle) {
        if let Err(err) = self
            .grid
            .remove(vehicle.position, Occupant::Vehicle(vehicle.id))
        {
            warn!("Retiring vehicle {:?}: {:#}", vehicle.id, err);
        }
        if let Err(err) = self.destinations.arrive(vehicle, self.current_step) {
            warn!("Arrival not recorded: {:#}", err);
        }
    }

    /// Main simulation tick: vehicles, then lights, then spawners
    pub fn tick(&mut self) {
        self.current_step += 1;
        self.update_vehicles();
        self.lights.update(self.current_step);
        self.run_spawners();
    }

    /// Same as [`SimWorld::tick`]
    pub fn step(&mut self) {
        self.tick();
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Live vehicles ordered by ID
    pub fn vehicle_views(&self) -> Vec<VehicleView> {
        let mut views: Vec<VehicleView> = self
            .vehicles
            .values()
            .map(|v| VehicleView {
                id: v.id,
                position: v.position,
                destination: v.destination,
                blocked: v.blocked,
            })
            .collect();
        views.sort_by_key(|v| v.id);
        views
    }

    pub fn destination_views(&self) -> Vec<DestinationView> {
        self.destinations
            .iter()
            .map(|d| DestinationView {
                id: d.id,
                position: d.position,
                arrivals: d.arrivals,
            })
            .collect()
    }

    pub fn light_views(&self) -> Vec<LightView> {
        self.lights
            .iter()
            .map(|l| LightView {
                id: l.id,
                position: l.position,
                open: l.open,
                time_to_change: l.time_to_change,
            })
            .collect()
    }

    /// Roads and obstacles, in row-major order
    pub fn static_views(&self) -> Vec<StaticView> {
        self.grid
            .iter()
            .filter_map(|(position, cell)| {
                let kind = match cell.static_occupant()? {
                    Occupant::Road(direction) => StaticKind::Road(direction),
                    Occupant::Obstacle => StaticKind::Obstacle,
                    _ => return None,
                };
                Some(StaticView { position, kind })
            })
            .collect()
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            step: self.current_step,
            total_spawned: self.total_spawned,
            total_arrived: self.destinations.total_arrivals(),
            active_vehicles: self.vehicles.len(),
            blocked_vehicles: self.vehicles.values().filter(|v| v.blocked).count(),
        }
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        let stats = self.stats();
        println!("=== Traffic Simulation Summary ===");
        println!("Step: {}", stats.step);
        println!(
            "Drivable cells: {}, Links: {}",
            self.road_graph.key_count(),
            self.road_graph.link_count()
        );
        println!(
            "Vehicles: {} active ({} blocked), {} spawned, {} arrived",
            stats.active_vehicles, stats.blocked_vehicles, stats.total_spawned, stats.total_arrived
        );
        println!();

        println!("--- Destinations ---");
        for destination in self.destination_views() {
            println!(
                "  Destination {:?} at {}: arrivals={}",
                destination.id.0 .0, destination.position, destination.arrivals
            );
        }

        println!("--- Traffic Lights ---");
        for light in self.light_views() {
            println!(
                "  Light {:?} at {}: {}",
                light.id.0 .0,
                light.position,
                if light.open { "green" } else { "red" }
            );
        }

        if !self.vehicles.is_empty() {
            println!("--- Active Vehicles ---");
            for vehicle in self.vehicle_views() {
                let remaining = self
                    .vehicle(vehicle.id)
                    .map_or(0, |v| v.path.len().saturating_sub(1));
                println!(
                    "  Vehicle {:?}: position={}, destination={:?}, hops_left={}{}",
                    vehicle.id.0 .0,
                    vehicle.position,
                    vehicle.destination.0 .0,
                    remaining,
                    if vehicle.blocked { ", blocked" } else { "" }
                );
            }
        }
    }

    /// Character shown for a cell in the terminal map
    fn map_symbol(&self, cell: &Cell) -> char {
        if cell.has_vehicle() {
            let blocked = cell
                .vehicles()
                .filter_map(|id| self.vehicles.get(&id))
                .any(|v| v.blocked);
            return if blocked { 'B' } else { 'C' };
        }

        match cell.static_occupant() {
            Some(Occupant::Road(direction)) => direction.arrow(),
            Some(Occupant::Light(id)) => {
                if self.lights.is_open(id) {
                    'G'
                } else {
                    'R'
                }
            }
            Some(Occupant::Obstacle) => '#',
            Some(Occupant::Destination(_)) => 'D',
            _ => '.',
        }
    }

    /// The map as text, northernmost row first
    pub fn render_map(&self) -> Vec<String> {
        (0..self.grid.height())
            .rev()
            .map(|y| {
                (0..self.grid.width())
                    .map(|x| {
                        self.grid
                            .cell(Coordinate::new(x, y))
                            .map_or(' ', |cell| self.map_symbol(cell))
                    })
                    .collect()
            })
            .collect()
    }

    /// Draw a visual map of the world in the terminal
    pub fn draw_map(&self) {
        println!("\n=== World Map ===");
        println!("Legend: C=Vehicle, B=Blocked vehicle, G/R=Green/Red light, D=Destination, #=Obstacle");
        println!();
        for line in self.render_map() {
            println!("{}", line);
        }
        println!();
    }
}
