//! Destinations and arrival bookkeeping

use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;

use super::types::{Coordinate, DestinationId, VehicleId};
use super::vehicle::Vehicle;

/// A cell vehicles are sent to
#[derive(Debug, Clone)]
pub struct Destination {
    pub id: DestinationId,
    pub position: Coordinate,
    pub arrivals: u32,
}

/// One vehicle reaching its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalRecord {
    pub vehicle: VehicleId,
    pub destination: DestinationId,
    pub step: u64,
}

/// Every destination of the map and the arrivals they have received
#[derive(Debug, Clone, Default)]
pub struct DestinationRegistry {
    destinations: BTreeMap<DestinationId, Destination>,
    arrivals: Vec<ArrivalRecord>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: DestinationId, position: Coordinate) {
        self.destinations.insert(
            id,
            Destination {
                id,
                position,
                arrivals: 0,
            },
        );
    }

    pub fn get(&self, id: DestinationId) -> Option<&Destination> {
        self.destinations.get(&id)
    }

    pub fn position(&self, id: DestinationId) -> Option<Coordinate> {
        self.destinations.get(&id).map(|d| d.position)
    }

    /// Destination standing at `position`, if any
    pub fn destination_at(&self, position: Coordinate) -> Option<DestinationId> {
        self.destinations
            .values()
            .find(|d| d.position == position)
            .map(|d| d.id)
    }

    pub fn ids(&self) -> Vec<DestinationId> {
        self.destinations.keys().copied().collect()
    }

    /// Records the arrival of `vehicle` at its destination.
    ///
    /// Takes the vehicle by value: once it has arrived it no longer exists,
    /// so it cannot be counted twice.
    pub fn arrive(&mut self, vehicle: Vehicle, step: u64) -> Result<DestinationId> {
        let destination = self
            .destinations
            .get_mut(&vehicle.destination)
            .with_context(|| format!("Destination {:?} not found", vehicle.destination))?;

        destination.arrivals += 1;
        self.arrivals.push(ArrivalRecord {
            vehicle: vehicle.id,
            destination: destination.id,
            step,
        });

        debug!(
            "Vehicle {:?} arrived at {:?} {} (arrivals: {})",
            vehicle.id, destination.id, destination.position, destination.arrivals
        );
        Ok(destination.id)
    }

    pub fn total_arrivals(&self) -> u32 {
        self.destinations.values().map(|d| d.arrivals).sum()
    }

    pub fn arrival_log(&self) -> &[ArrivalRecord] {
        &self.arrivals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> + '_ {
        self.destinations.values()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}
