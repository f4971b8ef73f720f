//! Cell storage for the simulation
//!
//! The grid is the only shared mutable state of a run: every agent changes
//! occupancy through `place`, `remove` and `move_vehicle`.

use anyhow::{bail, Context, Result};

use super::types::{Coordinate, DestinationId, Direction, LightId, VehicleId};

/// Something that occupies a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Road(Direction),
    Light(LightId),
    Obstacle,
    Destination(DestinationId),
    Vehicle(VehicleId),
}

impl Occupant {
    pub fn is_vehicle(&self) -> bool {
        matches!(self, Occupant::Vehicle(_))
    }
}

/// A single grid cell: at most one static occupant plus stacked vehicles
#[derive(Debug, Clone, Default)]
pub struct Cell {
    occupants: Vec<Occupant>,
}

impl Cell {
    pub fn occupants(&self) -> &[Occupant] {
        &self.occupants
    }

    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// The road, light, obstacle or destination in this cell (if any)
    pub fn static_occupant(&self) -> Option<Occupant> {
        self.occupants.iter().copied().find(|o| !o.is_vehicle())
    }

    pub fn road_direction(&self) -> Option<Direction> {
        match self.static_occupant() {
            Some(Occupant::Road(direction)) => Some(direction),
            _ => None,
        }
    }

    pub fn vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.occupants.iter().filter_map(|o| match o {
            Occupant::Vehicle(id) => Some(*id),
            _ => None,
        })
    }

    pub fn has_vehicle(&self) -> bool {
        self.occupants.iter().any(Occupant::is_vehicle)
    }
}

/// Rectangular grid of cells
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Empty grid of `width` x `height` cells.
    ///
    /// Fails when a side does not fit an `i32` coordinate.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let w = i32::try_from(width)
            .with_context(|| format!("Grid width {} does not fit a coordinate", width))?;
        let h = i32::try_from(height)
            .with_context(|| format!("Grid height {} does not fit a coordinate", height))?;
        let size = width
            .checked_mul(height)
            .with_context(|| format!("Grid of {}x{} cells is too large", width, height))?;

        Ok(Self {
            width: w,
            height: h,
            cells: vec![Cell::default(); size],
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, coord: Coordinate) -> bool {
        (0..self.width).contains(&coord.x) && (0..self.height).contains(&coord.y)
    }

    fn index(&self, coord: Coordinate) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| coord.y as usize * self.width as usize + coord.x as usize)
    }

    /// Cell at `coord`, `None` outside the grid
    pub fn cell(&self, coord: Coordinate) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub fn occupant_count(&self, coord: Coordinate) -> usize {
        self.cell(coord).map_or(0, Cell::len)
    }

    /// Adds an occupant to a cell.
    ///
    /// Fails outside the grid, or when a second static occupant is placed
    /// on a cell that already has one.
    pub fn place(&mut self, coord: Coordinate, occupant: Occupant) -> Result<()> {
        let index = self
            .index(coord)
            .with_context(|| format!("Cell {} is outside the grid", coord))?;
        let cell = &mut self.cells[index];

        if !occupant.is_vehicle() {
            if let Some(existing) = cell.static_occupant() {
                bail!(
                    "Cell {} already holds {:?}, cannot also hold {:?}",
                    coord,
                    existing,
                    occupant
                );
            }
        }

        cell.occupants.push(occupant);
        Ok(())
    }

    /// Removes one occupant from a cell
    pub fn remove(&mut self, coord: Coordinate, occupant: Occupant) -> Result<()> {
        let index = self
            .index(coord)
            .with_context(|| format!("Cell {} is outside the grid", coord))?;
        let cell = &mut self.cells[index];

        let slot = cell
            .occupants
            .iter()
            .position(|o| *o == occupant)
            .with_context(|| format!("{:?} not found at {}", occupant, coord))?;
        cell.occupants.remove(slot);
        Ok(())
    }

    /// Moves a vehicle between two cells
    pub fn move_vehicle(&mut self, vehicle: VehicleId, from: Coordinate, to: Coordinate) -> Result<()> {
        if !self.in_bounds(to) {
            bail!("Cannot move {:?} to {}: outside the grid", vehicle, to);
        }
        self.remove(from, Occupant::Vehicle(vehicle))?;
        self.place(to, Occupant::Vehicle(vehicle))
    }

    /// All cells in row-major order, starting at `(0, 0)`
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &Cell)> + '_ {
        let width = self.width as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            (Coordinate::new((i % width) as i32, (i / width) as i32), cell)
        })
    }
}
