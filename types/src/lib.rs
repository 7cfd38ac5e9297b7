//! Core domain types for marble.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the
//! application.

mod params;

pub use params::{SharedParams, VizParams, VizParamsError};
