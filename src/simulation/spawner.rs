//! Vehicle spawning at entry cells

use anyhow::{bail, Result};
use log::debug;

use super::grid::{Grid, Occupant};
use super::types::{Coordinate, DestinationId, VehicleId};
use super::vehicle::Vehicle;

/// Puts vehicles on the map at a fixed entry cell
#[derive(Debug, Clone)]
pub struct SpawnController {
    pub home: Coordinate,
    /// Vehicles created here so far
    pub spawned: u32,
}

impl SpawnController {
    pub fn new(home: Coordinate) -> Self {
        Self { home, spawned: 0 }
    }

    /// Whether the home cell is free of vehicles
    pub fn is_clear(&self, grid: &Grid) -> bool {
        grid.cell(self.home).is_some_and(|cell| !cell.has_vehicle())
    }

    /// Creates vehicle `id` heading for `destination` if the home cell is
    /// clear. Returns `None` without touching the grid otherwise.
    pub fn try_spawn(
        &mut self,
        grid: &mut Grid,
        id: VehicleId,
        destination: DestinationId,
    ) -> Option<Vehicle> {
        if !self.is_clear(grid) {
            return None;
        }

        let vehicle = place_vehicle(grid, id, self.home, destination).ok()?;
        self.spawned += 1;
        debug!(
            "Spawned vehicle {:?} at {} heading for {:?}",
            id, self.home, destination
        );
        Some(vehicle)
    }
}

/// Places a new vehicle on an empty road cell
pub fn place_vehicle(
    grid: &mut Grid,
    id: VehicleId,
    at: Coordinate,
    destination: DestinationId,
) -> Result<Vehicle> {
    let Some(cell) = grid.cell(at) else {
        bail!("Cannot spawn at {}: outside the grid", at);
    };
    if cell.road_direction().is_none() {
        bail!("Cannot spawn at {}: not a road cell", at);
    }
    if cell.has_vehicle() {
        bail!("Cannot spawn at {}: cell already holds a vehicle", at);
    }

    grid.place(at, Occupant::Vehicle(id))?;
    Ok(Vehicle::new(id, at, destination))
}
