//! Read-only views handed to renderers and API layers

use super::types::{Coordinate, DestinationId, Direction, LightId, VehicleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleView {
    pub id: VehicleId,
    pub position: Coordinate,
    pub destination: DestinationId,
    /// Stuck in traffic on its last attempt to move
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationView {
    pub id: DestinationId,
    pub position: Coordinate,
    pub arrivals: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightView {
    pub id: LightId,
    pub position: Coordinate,
    pub open: bool,
    pub time_to_change: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    Road(Direction),
    Obstacle,
}

/// A road or obstacle cell, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticView {
    pub position: Coordinate,
    pub kind: StaticKind,
}

/// Aggregate counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimStats {
    pub step: u64,
    pub total_spawned: u32,
    pub total_arrived: u32,
    pub active_vehicles: usize,
    pub blocked_vehicles: usize,
}

impl SimStats {
    /// Share of spawned vehicles that reached their destination, in percent
    pub fn success_rate(&self) -> f32 {
        if self.total_spawned == 0 {
            return 0.0;
        }
        self.total_arrived as f32 / self.total_spawned as f32 * 100.0
    }
}
