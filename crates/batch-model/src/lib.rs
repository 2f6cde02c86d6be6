//! FrameBatch Model
//!
//! Defines the core data contracts for chunked exports:
//! - **Frames:** Frame ranges, chunks, chunk plans, and the manual cursor
//! - **Settings:** Batch parameters and the per-scene export settings record
//! - **Naming:** Deterministic output file names per export or per chunk
//!
//! Everything here is plain data and pure functions; no filesystem access.

pub mod frame;
pub mod naming;
pub mod settings;

pub use frame::*;
pub use naming::*;
pub use settings::*;
