//! Vehicle movement logic for the traffic simulation
//!
//! Each tick a vehicle either plans a route, advances along it, swerves to a
//! free neighbouring cell, or waits.

use anyhow::Result;
use log::trace;

use super::grid::{Cell, Grid, Occupant};
use super::path_planner::bfs_shortest_path;
use super::road_graph::RoadGraph;
use super::traffic_light::TrafficLightController;
use super::types::{Coordinate, DestinationId, VehicleId};

/// How a vehicle may treat a cell it wants to enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    /// Free to enter
    Go,
    /// Drivable but taken, look for another way
    Switch,
    /// Closed, stay put
    Wait,
}

/// Classifies the cell at `coord` for an approaching vehicle.
///
/// Destinations are always enterable. Roads and green lights are enterable
/// while they hold nothing but their own marker; a red light or anything
/// undrivable means waiting.
pub fn classify(grid: &Grid, lights: &TrafficLightController, coord: Coordinate) -> CellClass {
    let Some(cell) = grid.cell(coord) else {
        return CellClass::Wait;
    };
    let taken = cell.len() >= 2;

    match cell.static_occupant() {
        Some(Occupant::Destination(_)) => CellClass::Go,
        Some(Occupant::Road(_)) if taken => CellClass::Switch,
        Some(Occupant::Road(_)) => CellClass::Go,
        Some(Occupant::Light(id)) if lights.is_open(id) => {
            if taken {
                CellClass::Switch
            } else {
                CellClass::Go
            }
        }
        _ => CellClass::Wait,
    }
}

/// Result of a vehicle update indicating what happened this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    /// Stepped onto the next cell of its route
    Moved,
    /// Left its route for a free neighbouring cell and replanned
    Swerved,
    /// Computed a new route, no movement
    Replanned,
    /// No route exists right now, will retry next tick
    Unroutable,
    /// Stayed in place
    Waiting,
    /// Standing on its destination, should be retired
    Arrived,
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub position: Coordinate,
    pub destination: DestinationId,
    /// Remaining route, head is the current position
    pub path: Vec<Coordinate>,
    /// Could not advance on its last attempt
    pub blocked: bool,
}

impl Vehicle {
    pub fn new(id: VehicleId, position: Coordinate, destination: DestinationId) -> Self {
        Self {
            id,
            position,
            destination,
            path: Vec::new(),
            blocked: false,
        }
    }

    /// Runs one tick of the vehicle.
    ///
    /// `goal` is the position of the vehicle's destination. Grid changes are
    /// applied immediately, so vehicles updated later in the same tick see
    /// them.
    pub fn update(
        &mut self,
        goal: Coordinate,
        grid: &mut Grid,
        graph: &RoadGraph,
        lights: &TrafficLightController,
    ) -> Result<VehicleUpdateResult> {
        if self.position == goal {
            return Ok(VehicleUpdateResult::Arrived);
        }

        if self.path.is_empty() {
            self.path = bfs_shortest_path(graph, self.position, goal).unwrap_or_default();
            if self.path.is_empty() {
                trace!("Vehicle {:?} has no route from {} to {}", self.id, self.position, goal);
                return Ok(VehicleUpdateResult::Unroutable);
            }
            trace!("Vehicle {:?} planned {} hops", self.id, self.path.len() - 1);
            return Ok(VehicleUpdateResult::Replanned);
        }

        let Some(&next) = self.path.get(1) else {
            // A lone head means the route ran out short of the goal.
            self.path.clear();
            return Ok(VehicleUpdateResult::Waiting);
        };

        match classify(grid, lights, next) {
            CellClass::Go => {
                self.advance_to(next, grid)?;
                self.path.remove(0);
                self.blocked = false;
                if self.position == goal {
                    return Ok(VehicleUpdateResult::Arrived);
                }
                Ok(VehicleUpdateResult::Moved)
            }
            CellClass::Switch => self.swerve(next, goal, grid, graph, lights),
            CellClass::Wait => {
                self.blocked = true;
                Ok(VehicleUpdateResult::Waiting)
            }
        }
    }

    /// Tries the other successors of the current cell after `planned` turned
    /// out to be taken
    fn swerve(
        &mut self,
        planned: Coordinate,
        goal: Coordinate,
        grid: &mut Grid,
        graph: &RoadGraph,
        lights: &TrafficLightController,
    ) -> Result<VehicleUpdateResult> {
        let mut target = None;
        for candidate in graph.successors(self.position) {
            if candidate == planned {
                continue;
            }
            match swerve_class(grid, lights, candidate, goal) {
                CellClass::Go => {
                    target = Some(candidate);
                    break;
                }
                CellClass::Switch => continue,
                CellClass::Wait => break,
            }
        }

        let Some(target) = target else {
            self.blocked = true;
            return Ok(VehicleUpdateResult::Waiting);
        };

        self.advance_to(target, grid)?;
        self.blocked = false;
        if self.position == goal {
            self.path.clear();
            return Ok(VehicleUpdateResult::Arrived);
        }

        self.path = bfs_shortest_path(graph, self.position, goal).unwrap_or_default();
        trace!(
            "Vehicle {:?} swerved to {}, {} hops left",
            self.id,
            self.position,
            self.path.len().saturating_sub(1)
        );
        Ok(VehicleUpdateResult::Swerved)
    }

    fn advance_to(&mut self, target: Coordinate, grid: &mut Grid) -> Result<()> {
        grid.move_vehicle(self.id, self.position, target)?;
        self.position = target;
        Ok(())
    }
}

/// `classify` for a cell reached off-route. Someone else's destination is a
/// dead end, so it counts as taken.
fn swerve_class(
    grid: &Grid,
    lights: &TrafficLightController,
    candidate: Coordinate,
    goal: Coordinate,
) -> CellClass {
    match grid.cell(candidate).and_then(Cell::static_occupant) {
        Some(Occupant::Destination(_)) if candidate != goal => CellClass::Switch,
        _ => classify(grid, lights, candidate),
    }
}
