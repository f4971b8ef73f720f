//! Grid Traffic Simulation Library
//!
//! A discrete-tick traffic simulation on a tiled road map that runs headless.

pub mod simulation;
