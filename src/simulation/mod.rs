//! Grid traffic simulation
//!
//! Vehicles drive over a tiled map of one-way road cells, queueing behind
//! each other and stopping at red lights until they reach their destination.
//! Everything here runs headless and can be driven tick by tick.

mod destination;
mod grid;
mod map;
mod path_planner;
mod road_graph;
mod snapshot;
mod spawner;
mod traffic_light;
mod types;
mod vehicle;
mod world;

pub use destination::{ArrivalRecord, Destination, DestinationRegistry};
pub use grid::{Cell, Grid, Occupant};
pub use map::{MapLayout, SymbolDictionary, SymbolValue};
pub use path_planner::bfs_shortest_path;
pub use road_graph::RoadGraph;
pub use snapshot::{DestinationView, LightView, SimStats, StaticKind, StaticView, VehicleView};
pub use spawner::{place_vehicle, SpawnController};
pub use traffic_light::{TrafficLight, TrafficLightController};
pub use types::{
    Coordinate, DestinationId, Direction, LightId, SimId, VehicleId, DEFAULT_LIGHT_TIME_TO_CHANGE,
    DEFAULT_LIGHT_TOGGLE_PERIOD, DEFAULT_SPAWN_INTERVAL,
};
pub use vehicle::{classify, CellClass, Vehicle, VehicleUpdateResult};
pub use world::{test_world_spawn_points, SimConfig, SimWorld, TEST_WORLD_MAP};
