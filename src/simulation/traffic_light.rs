//! Traffic lights and their global toggle

use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;

use super::types::{Coordinate, LightId};

/// A traffic light sitting on a road cell
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub id: LightId,
    pub position: Coordinate,
    /// Green when true
    pub open: bool,
    /// Period read from the map. Kept for reporting; lights flip together on
    /// the controller period instead.
    pub time_to_change: u32,
}

impl TrafficLight {
    pub fn new(id: LightId, position: Coordinate, open: bool, time_to_change: u32) -> Self {
        Self {
            id,
            position,
            open,
            time_to_change,
        }
    }
}

/// Owns every light and flips them all in lockstep
#[derive(Debug, Clone, Default)]
pub struct TrafficLightController {
    lights: BTreeMap<LightId, TrafficLight>,
    /// Ticks between flips, `None` keeps the lights as they are
    period: Option<u32>,
}

impl TrafficLightController {
    pub fn new(period: Option<u32>) -> Self {
        Self {
            lights: BTreeMap::new(),
            period: period.filter(|p| *p > 0),
        }
    }

    pub fn period(&self) -> Option<u32> {
        self.period
    }

    pub fn add_light(&mut self, light: TrafficLight) {
        self.lights.insert(light.id, light);
    }

    pub fn get(&self, id: LightId) -> Option<&TrafficLight> {
        self.lights.get(&id)
    }

    /// Whether a light is green. Unknown lights read as red.
    pub fn is_open(&self, id: LightId) -> bool {
        self.lights.get(&id).is_some_and(|light| light.open)
    }

    /// Forces one light green or red
    pub fn set_open(&mut self, id: LightId, open: bool) -> Result<()> {
        let light = self
            .lights
            .get_mut(&id)
            .with_context(|| format!("Traffic light {:?} not found", id))?;
        light.open = open;
        Ok(())
    }

    /// Light standing at `position`, if any
    pub fn light_at(&self, position: Coordinate) -> Option<LightId> {
        self.lights
            .values()
            .find(|light| light.position == position)
            .map(|light| light.id)
    }

    pub fn toggle_all(&mut self) {
        for light in self.lights.values_mut() {
            light.open = !light.open;
        }
    }

    /// Flips every light when `step` lands on a period boundary.
    /// Returns whether a flip happened.
    pub fn update(&mut self, step: u64) -> bool {
        let Some(period) = self.period else {
            return false;
        };
        if step == 0 || step % u64::from(period) != 0 {
            return false;
        }

        self.toggle_all();
        debug!("Step {}: toggled {} traffic lights", step, self.lights.len());
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficLight> + '_ {
        self.lights.values()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}
