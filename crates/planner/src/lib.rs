//! FrameBatch Planner
//!
//! Partitions a frame range into ordered export chunks, optionally widening
//! every chunk by a few frames on both sides for motion-blur continuity.
//!
//! This crate is pure computation: no I/O, no platform dependencies.

pub mod planner;

pub use planner::{plan, prepare_batch};
