//! Directed road graph for pathfinding
//!
//! Built once from a populated grid. Every road or light cell gets an ordered
//! list of the cells a vehicle may legally drive to next.

use anyhow::{Context, Result};
use log::debug;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction::Outgoing;
use std::collections::BTreeSet;

use super::grid::{Cell, Grid, Occupant};
use super::types::{Coordinate, Direction};

/// Adjacency between drivable cells
#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    /// Successor lists, kept in insertion order by the graph map
    graph: DiGraphMap<Coordinate, ()>,

    /// Road and light cells, the nodes that own a successor list
    sources: BTreeSet<Coordinate>,
}

impl RoadGraph {
    /// Builds the graph from every road marker and traffic light in the grid
    pub fn build(grid: &Grid) -> Result<Self> {
        let mut road_graph = Self::default();

        for (coord, cell) in grid.iter() {
            let forward = match cell.static_occupant() {
                Some(Occupant::Road(direction)) => direction,
                Some(Occupant::Light(id)) => feeding_direction(grid, coord).with_context(|| {
                    format!("Traffic light {:?} at {} has no road leading into it", id, coord)
                })?,
                _ => continue,
            };

            road_graph.sources.insert(coord);
            road_graph.graph.add_node(coord);

            let successors: Vec<Coordinate> = candidate_offsets(forward)
                .into_iter()
                .filter(|offset| accepts(grid.cell(coord.shifted(*offset)), forward, *offset))
                .map(|offset| coord.shifted(offset))
                .collect();

            for successor in successors {
                road_graph.graph.add_edge(coord, successor, ());
            }
        }

        debug!(
            "Road graph built: {} drivable cells, {} links",
            road_graph.sources.len(),
            road_graph.graph.edge_count()
        );

        Ok(road_graph)
    }

    /// Legal next cells from `coord`, in priority order
    pub fn successors(&self, coord: Coordinate) -> impl Iterator<Item = Coordinate> + '_ {
        self.graph.neighbors_directed(coord, Outgoing)
    }

    /// Whether `coord` is a road or light cell with a successor list
    pub fn contains(&self, coord: Coordinate) -> bool {
        self.sources.contains(&coord)
    }

    pub fn keys(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.sources.iter().copied()
    }

    pub fn key_count(&self) -> usize {
        self.sources.len()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// The five cells ahead of a marker facing `forward`: left lateral,
/// forward-left, forward, forward-right, right lateral
fn candidate_offsets(forward: Direction) -> [(i32, i32); 5] {
    let (fx, fy) = forward.vector();
    let (lx, ly) = forward.left().vector();
    [
        (lx, ly),
        (fx + lx, fy + ly),
        (fx, fy),
        (fx - lx, fy - ly),
        (-lx, -ly),
    ]
}

/// Whether `target`, sitting at `offset` from a cell facing `forward`, can be
/// entered from that cell. Markers pointing back at the source never can.
fn accepts(target: Option<&Cell>, forward: Direction, (ox, oy): (i32, i32)) -> bool {
    match target.and_then(Cell::static_occupant) {
        Some(Occupant::Light(_)) | Some(Occupant::Destination(_)) => true,
        Some(Occupant::Road(facing)) => {
            let (vx, vy) = facing.vector();
            vx * ox + vy * oy >= 0 && facing != forward.opposite()
        }
        _ => false,
    }
}

/// Direction a light takes from the road marker that drives into it
fn feeding_direction(grid: &Grid, light: Coordinate) -> Option<Direction> {
    Direction::ALL.into_iter().find(|direction| {
        let (dx, dy) = direction.vector();
        let feeder = light.shifted((-dx, -dy));
        grid.cell(feeder).and_then(Cell::road_direction) == Some(*direction)
    })
}
